//! eapi 参数签名：md5 摘要 + AES-128-ECB(PKCS7)，输出大写十六进制。

use aes::Aes128;
use ecb::cipher::block_padding::Pkcs7;
use ecb::cipher::{BlockEncryptMut, KeyInit};
use serde_json::Value;

type Aes128EcbEnc = ecb::Encryptor<Aes128>;

const EAPI_KEY: &[u8; 16] = b"e82ckenh8dichen8";
const SEPARATOR: &str = "-36cd479b6b5-";

/// 取 URL 的 path 部分，并把 `/eapi/` 换成 `/api/`（签名按 api 路径计算）。
pub fn signing_path(url: &str) -> String {
    let without_scheme = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
    let path = without_scheme
        .find('/')
        .map(|idx| &without_scheme[idx..])
        .unwrap_or("/");
    let path = path.split(['?', '#']).next().unwrap_or(path);
    path.replace("/eapi/", "/api/")
}

/// 拼接待加密明文：`{path}-36cd479b6b5-{json}-36cd479b6b5-{md5}`。
pub fn plain_params(path: &str, json: &str) -> String {
    let digest = md5::compute(format!("nobody{path}use{json}md5forencrypt"));
    format!("{path}{SEPARATOR}{json}{SEPARATOR}{digest:x}")
}

pub fn encrypt_params(url: &str, payload: &Value) -> Result<String, serde_json::Error> {
    let json = serde_json::to_string(payload)?;
    let plain = plain_params(&signing_path(url), &json);
    Ok(hex::encode_upper(aes_ecb_encrypt(plain.as_bytes())))
}

fn aes_ecb_encrypt(plain: &[u8]) -> Vec<u8> {
    Aes128EcbEnc::new(EAPI_KEY.into()).encrypt_padded_vec_mut::<Pkcs7>(plain)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signing_path_rewrites_eapi_prefix() {
        assert_eq!(
            signing_path("https://interface3.music.163.com/eapi/song/enhance/player/url/v1"),
            "/api/song/enhance/player/url/v1"
        );
        assert_eq!(signing_path("https://host/eapi/x?a=1"), "/api/x");
        assert_eq!(signing_path("https://host"), "/");
    }

    #[test]
    fn plain_params_has_three_parts() {
        let plain = plain_params("/api/x", "{\"a\":1}");
        let parts: Vec<&str> = plain.split(SEPARATOR).collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "/api/x");
        assert_eq!(parts[1], "{\"a\":1}");
        assert_eq!(parts[2].len(), 32);
        assert!(parts[2].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn short_plaintext_fills_one_block() {
        let out = aes_ecb_encrypt(b"a");
        assert_eq!(out.len(), 16);
        assert_ne!(out, aes_ecb_encrypt(b"b"));
    }

    #[test]
    fn pkcs7_always_adds_a_block_when_aligned() {
        assert_eq!(aes_ecb_encrypt(&[0u8; 16]).len(), 32);
        assert_eq!(aes_ecb_encrypt(&[0u8; 5]).len(), 16);
    }

    #[test]
    fn encrypted_params_are_upper_hex_and_deterministic() {
        let payload = serde_json::json!({"ids": [1], "level": "lossless"});
        let a = encrypt_params("https://h/eapi/song/enhance/player/url/v1", &payload).unwrap();
        let b = encrypt_params("https://h/eapi/song/enhance/player/url/v1", &payload).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len() % 32, 0);
        assert!(a.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }
}

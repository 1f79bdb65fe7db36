//! Cookie 文件读取（`k=v; k2=v2` 单行格式）。

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

/// 客户端伪装所需的固定 Cookie，总会覆盖文件中的同名项。
pub const CLIENT_IDENTITY: [(&str, &str); 4] = [
    ("os", "pc"),
    ("appver", "8.10.90"),
    ("osver", "Microsoft-Windows-10-Professional-build-19043-64bit"),
    ("deviceId", "pyncm-user"),
];

pub fn parse_cookie_text(text: &str) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    for item in text.trim().split(';') {
        let Some((k, v)) = item.trim().split_once('=') else {
            continue;
        };
        let k = k.trim();
        if k.is_empty() {
            continue;
        }
        out.insert(k.to_string(), v.trim().to_string());
    }
    out
}

/// 读取 Cookie 文件并叠加客户端身份；文件不存在时视为空。
pub fn load_cookies(path: &Path) -> io::Result<BTreeMap<String, String>> {
    let mut cookies = match fs::read_to_string(path) {
        Ok(text) => parse_cookie_text(&text),
        Err(err) if err.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
        Err(err) => return Err(err),
    };
    for (k, v) in CLIENT_IDENTITY {
        cookies.insert(k.to_string(), v.to_string());
    }
    Ok(cookies)
}

pub fn cookie_header(cookies: &BTreeMap<String, String>) -> String {
    cookies
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("; ")
}

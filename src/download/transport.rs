//! 字节传输：把解析好的地址流式写入本地文件。

use std::fs::OpenOptions;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, ACCEPT_ENCODING, CONNECTION, HeaderMap, HeaderValue};
use thiserror::Error;

const BUFFER_SIZE: usize = 64 * 1024;
const USER_AGENT: &str = "Mozilla/5.0";

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("http: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("目标文件已存在: {0}")]
    Exists(PathBuf),
}

pub trait Transport: Send + Sync {
    /// 把 `url` 写入 `dest`，每写入一块就回调累计字节数。返回写入的总字节数。
    ///
    /// 失败时已写入的部分保留在磁盘上。
    fn stream_download(
        &self,
        url: &str,
        dest: &Path,
        on_progress: &mut dyn FnMut(u64),
    ) -> Result<u64, TransportError>;
}

pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// 整体不设超时（大文件可能下载很久），只限制建立连接。
    pub fn new(connect_timeout: Duration) -> Result<Self, TransportError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        // 未启用 gzip 解码，要求原样返回。
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));
        headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));

        let client = Client::builder()
            .default_headers(headers)
            .user_agent(USER_AGENT)
            .connect_timeout(connect_timeout)
            .timeout(None::<Duration>)
            .build()?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn stream_download(
        &self,
        url: &str,
        dest: &Path,
        on_progress: &mut dyn FnMut(u64),
    ) -> Result<u64, TransportError> {
        let mut resp = self.client.get(url).send()?.error_for_status()?;

        let io_err = |source: io::Error| TransportError::Io {
            path: dest.to_path_buf(),
            source,
        };
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(dest)
            .map_err(|e| {
                if e.kind() == io::ErrorKind::AlreadyExists {
                    TransportError::Exists(dest.to_path_buf())
                } else {
                    io_err(e)
                }
            })?;

        let mut buf = vec![0u8; BUFFER_SIZE];
        let mut written = 0u64;
        loop {
            let n = match resp.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(io_err(e)),
            };
            file.write_all(&buf[..n]).map_err(io_err)?;
            written += n as u64;
            on_progress(written);
        }
        file.flush().map_err(io_err)?;
        Ok(written)
    }
}

/// 小文件（封面）一次性下载；任何失败都返回 `None`。
pub(crate) fn fetch_bytes(url: &str, timeout: Duration) -> Option<Vec<u8>> {
    if url.trim().is_empty() {
        return None;
    }

    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
    headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));

    let client = Client::builder()
        .default_headers(headers)
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .ok()?;

    let resp = client.get(url).send().ok()?.error_for_status().ok()?;
    let bytes = resp.bytes().ok()?;
    Some(bytes.to_vec())
}

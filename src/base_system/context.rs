//! 全局配置结构（Config）与默认值。
//!
//! 该模块同时提供生成 `config.yml` 的字段元信息，以及文件名清洗工具。

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::config::{ConfigSpec, FieldMeta};
use crate::catalog::AccountLevel;
use crate::catalog::netease::NeteaseConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // 网络配置
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
    #[serde(default = "default_min_connect_timeout")]
    pub min_connect_timeout: f64,

    // 路径配置
    #[serde(default = "default_save_path")]
    pub save_path: String,
    #[serde(default = "default_cookie_path")]
    pub cookie_path: String,

    // 音质配置
    #[serde(default = "default_account_level")]
    pub account_level: String,

    // 标签配置
    #[serde(default = "default_true")]
    pub embed_cover: bool,
    #[serde(default = "default_true")]
    pub embed_lyrics: bool,

    // 歌单配置
    #[serde(default = "default_detail_batch_size")]
    pub detail_batch_size: usize,

    #[serde(skip)]
    data_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            request_timeout: default_request_timeout(),
            min_connect_timeout: default_min_connect_timeout(),
            save_path: default_save_path(),
            cookie_path: default_cookie_path(),
            account_level: default_account_level(),
            embed_cover: default_true(),
            embed_lyrics: default_true(),
            detail_batch_size: default_detail_batch_size(),
            data_dir: None,
        }
    }
}

impl ConfigSpec for Config {
    const FILE_NAME: &'static str = "config.yml";

    fn fields() -> &'static [FieldMeta] {
        static FIELDS: [FieldMeta; 9] = [
            FieldMeta {
                name: "max_workers",
                description: "歌单批量下载的并发线程数",
            },
            FieldMeta {
                name: "request_timeout",
                description: "接口请求超时时间（秒）",
            },
            FieldMeta {
                name: "min_connect_timeout",
                description: "最小连接超时时间（秒）",
            },
            FieldMeta {
                name: "save_path",
                description: "保存路径（按歌手分子目录）",
            },
            FieldMeta {
                name: "cookie_path",
                description: "Cookie 文件路径（内容为浏览器复制的 Cookie 字符串）",
            },
            FieldMeta {
                name: "account_level",
                description: "账号身份，决定尝试的音质上限, 可选: [ask, svip, vip, free]",
            },
            FieldMeta {
                name: "embed_cover",
                description: "是否写入专辑封面",
            },
            FieldMeta {
                name: "embed_lyrics",
                description: "是否写入歌词",
            },
            FieldMeta {
                name: "detail_batch_size",
                description: "自选歌单歌曲时每次请求的歌曲详情数量",
            },
        ];
        &FIELDS
    }

    fn validate(&self) -> Result<(), String> {
        if self.max_workers == 0 {
            return Err("max_workers 必须大于 0".to_string());
        }
        if self.detail_batch_size == 0 {
            return Err("detail_batch_size 必须大于 0".to_string());
        }
        self.account_level()?;
        Ok(())
    }
}

impl Config {
    pub fn set_data_dir(&mut self, dir: Option<&Path>) {
        self.data_dir = dir.map(Path::to_path_buf);
    }

    pub fn default_save_dir(&self) -> PathBuf {
        if self.save_path.trim().is_empty() {
            PathBuf::from(default_save_path())
        } else {
            PathBuf::from(self.save_path.trim())
        }
    }

    /// 相对路径按数据目录解析（未指定数据目录时按当前目录）。
    pub fn cookie_file(&self) -> PathBuf {
        let path = PathBuf::from(self.cookie_path.trim());
        match &self.data_dir {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path,
        }
    }

    /// `ask` 返回 `None`，交由交互层询问。
    pub fn account_level(&self) -> Result<Option<AccountLevel>, String> {
        let raw = self.account_level.trim();
        if raw.is_empty() || raw.eq_ignore_ascii_case("ask") {
            return Ok(None);
        }
        raw.parse().map(Some)
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        if self.min_connect_timeout <= 0.0 {
            return None;
        }
        let ms = (self.min_connect_timeout * 1000.0).round() as u64;
        (ms > 0).then(|| Duration::from_millis(ms))
    }

    pub fn netease_config(&self) -> NeteaseConfig {
        NeteaseConfig {
            request_timeout: Duration::from_secs(self.request_timeout.max(1)),
            connect_timeout: self.connect_timeout(),
            cookie_path: self.cookie_file(),
        }
    }
}

/// 清洗文件/目录名：替换 Windows 非法字符与控制字符，去掉首尾空白与末尾的点。
pub fn safe_fs_name(name: &str, replacement: &str, max_len: usize) -> String {
    let rep = replacement.chars().next().unwrap_or('_');
    let mut cleaned: String = name
        .chars()
        .map(|ch| match ch {
            '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => rep,
            c if (c as u32) < 32 => rep,
            _ => ch,
        })
        .collect::<String>()
        .trim()
        .to_string();

    while cleaned.ends_with(' ') || cleaned.ends_with('.') {
        cleaned.pop();
    }

    if cleaned.is_empty() {
        cleaned.push_str("unnamed");
    }

    const RESERVED: [&str; 22] = [
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    if RESERVED.contains(&cleaned.to_uppercase().as_str()) {
        cleaned = format!("_{}", cleaned);
    }

    if cleaned.len() > max_len {
        // 避免在多字节 UTF-8 字符中间截断
        let mut end = max_len;
        while end > 0 && !cleaned.is_char_boundary(end) {
            end -= 1;
        }
        cleaned.truncate(end);
        while cleaned.ends_with(' ') || cleaned.ends_with('.') {
            cleaned.pop();
        }
        if cleaned.is_empty() {
            cleaned.push_str("unnamed");
        }
    }

    cleaned
}

fn default_true() -> bool {
    true
}

fn default_max_workers() -> usize {
    4
}

fn default_request_timeout() -> u64 {
    15
}

fn default_min_connect_timeout() -> f64 {
    3.05
}

fn default_save_path() -> String {
    "MyMusic".to_string()
}

fn default_cookie_path() -> String {
    "cookie.txt".to_string()
}

fn default_account_level() -> String {
    "ask".to_string()
}

fn default_detail_batch_size() -> usize {
    50
}

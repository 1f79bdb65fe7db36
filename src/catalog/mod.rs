//! 曲库（Catalog）协作方。
//!
//! 子模块：
//! - `models`  — 档位 / Offer / 元数据 / 歌单
//! - `eapi`    — eapi 请求参数签名与加密
//! - `netease` — 基于 reqwest 的具体客户端

pub mod eapi;
pub mod models;
pub mod netease;

use std::path::PathBuf;

use thiserror::Error;

pub use models::{
    AccountLevel, Offer, PlaylistId, PlaylistInfo, Strategy, Tier, TrackId, TrackMetadata,
};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid json: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("api returned code {code}: {message}")]
    Api { code: i64, message: String },
    #[error("cookie file {path}: {source}")]
    Cookie {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid header value: {0}")]
    Header(String),
}

/// 与远端曲库交互的能力面。所有调用都可能因网络失败而返回错误。
pub trait Catalog: Send + Sync {
    /// 返回能找到的歌曲记录；找不到的 ID 直接缺席，不报错。
    fn fetch_track_metadata(&self, ids: &[TrackId]) -> Result<Vec<TrackMetadata>, CatalogError>;

    /// `Ok(None)` 表示接口没有返回该档位的数据。
    fn fetch_quality_offer(&self, id: TrackId, tier: Tier)
    -> Result<Option<Offer>, CatalogError>;

    fn fetch_lyrics(&self, id: TrackId) -> Result<Option<String>, CatalogError>;

    fn fetch_playlist(&self, id: PlaylistId) -> Result<Option<PlaylistInfo>, CatalogError>;
}

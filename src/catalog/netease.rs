//! 网易云音乐接口客户端。
//!
//! 歌曲详情、歌词、歌单走明文 form 接口；音质探测走 eapi（见 [`super::eapi`]）。

use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, COOKIE, HeaderMap, HeaderValue, REFERER, USER_AGENT};
use serde_json::{Value, json};
use tracing::{debug, warn};

use super::models::{Offer, PlaylistId, PlaylistInfo, Tier, TrackId, TrackMetadata};
use super::{Catalog, CatalogError, eapi};
use crate::base_system::cookie;

const DETAIL_URL: &str = "https://interface3.music.163.com/api/v3/song/detail";
const PLAYER_URL: &str = "https://interface3.music.163.com/eapi/song/enhance/player/url/v1";
const LYRIC_URL: &str = "https://interface3.music.163.com/api/song/lyric";
const PLAYLIST_URL: &str = "https://music.163.com/api/v6/playlist/detail";

const DESKTOP_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 NeteaseMusicDesktop/3.0.1.888";

#[derive(Debug, Clone)]
pub struct NeteaseConfig {
    pub request_timeout: Duration,
    pub connect_timeout: Option<Duration>,
    pub cookie_path: PathBuf,
}

impl Default for NeteaseConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(15),
            connect_timeout: None,
            cookie_path: PathBuf::from("cookie.txt"),
        }
    }
}

pub struct NeteaseClient {
    client: Client,
}

impl NeteaseClient {
    pub fn new(config: NeteaseConfig) -> Result<Self, CatalogError> {
        let cookies =
            cookie::load_cookies(&config.cookie_path).map_err(|source| CatalogError::Cookie {
                path: config.cookie_path.clone(),
                source,
            })?;
        let logged_in = cookies.contains_key("MUSIC_U");
        debug!(target: "catalog", logged_in, "cookie 已加载");

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(DESKTOP_UA));
        headers.insert(REFERER, HeaderValue::from_static("https://music.163.com/"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json, */*"));
        let cookie_value = HeaderValue::from_str(&cookie::cookie_header(&cookies))
            .map_err(|e| CatalogError::Header(e.to_string()))?;
        headers.insert(COOKIE, cookie_value);

        let mut builder = Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout);
        if let Some(connect) = config.connect_timeout {
            builder = builder.connect_timeout(connect);
        }

        Ok(Self {
            client: builder.build()?,
        })
    }

    fn post_form(&self, url: &str, form: &[(&str, String)]) -> Result<Value, CatalogError> {
        let resp = self.client.post(url).form(form).send()?.error_for_status()?;
        let value: Value = resp.json()?;
        check_code(&value)?;
        Ok(value)
    }

    fn post_eapi(&self, url: &str, payload: &Value) -> Result<Value, CatalogError> {
        let params = eapi::encrypt_params(url, payload)?;
        self.post_form(url, &[("params", params)])
    }
}

impl Catalog for NeteaseClient {
    fn fetch_track_metadata(&self, ids: &[TrackId]) -> Result<Vec<TrackMetadata>, CatalogError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let c: Vec<Value> = ids.iter().map(|id| json!({"id": id.0, "v": 0})).collect();
        let value = self.post_form(DETAIL_URL, &[("c", serde_json::to_string(&c)?)])?;
        Ok(parse_track_detail(&value))
    }

    fn fetch_quality_offer(
        &self,
        id: TrackId,
        tier: Tier,
    ) -> Result<Option<Offer>, CatalogError> {
        let value = self.post_eapi(PLAYER_URL, &player_payload(id, tier))?;
        Ok(parse_offer(tier, &value))
    }

    fn fetch_lyrics(&self, id: TrackId) -> Result<Option<String>, CatalogError> {
        let form = [
            ("id", id.to_string()),
            ("cp", "false".to_string()),
            ("tv", "0".to_string()),
            ("lv", "0".to_string()),
            ("rv", "0".to_string()),
            ("kv", "0".to_string()),
            ("yv", "0".to_string()),
            ("ytv", "0".to_string()),
            ("yrv", "0".to_string()),
        ];
        let value = self.post_form(LYRIC_URL, &form)?;
        Ok(parse_lyrics(&value))
    }

    fn fetch_playlist(&self, id: PlaylistId) -> Result<Option<PlaylistInfo>, CatalogError> {
        let form = [
            ("id", id.to_string()),
            ("n", "0".to_string()),
            ("s", "8".to_string()),
        ];
        let value = self.post_form(PLAYLIST_URL, &form)?;
        Ok(parse_playlist(id, &value))
    }
}

fn check_code(value: &Value) -> Result<(), CatalogError> {
    let Some(code) = value.get("code").and_then(Value::as_i64) else {
        return Ok(());
    };
    if code == 200 {
        return Ok(());
    }
    let message = value
        .get("message")
        .or_else(|| value.get("msg"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    Err(CatalogError::Api { code, message })
}

fn player_payload(id: TrackId, tier: Tier) -> Value {
    let header = json!({
        "os": "pc",
        "appver": "8.10.90",
        "osver": "Microsoft-Windows-10-Professional-build-19043-64bit",
        "deviceId": "pyncm-user",
        "requestId": request_id().to_string(),
    });
    let mut payload = json!({
        "ids": [id.0],
        "level": tier.level(),
        "encodeType": "flac",
        "header": header.to_string(),
    });
    if tier == Tier::Immersive {
        payload["immerseType"] = Value::String("c51".to_string());
    }
    payload
}

fn request_id() -> u64 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos() as u64)
        .unwrap_or(0);
    20_000_000 + nanos % 10_000_000
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub(crate) fn parse_track_detail(value: &Value) -> Vec<TrackMetadata> {
    let Some(songs) = value.get("songs").and_then(Value::as_array) else {
        return Vec::new();
    };
    songs
        .iter()
        .filter_map(|song| {
            let id = song.get("id").and_then(Value::as_u64)?;
            let artists = song
                .get("ar")
                .and_then(Value::as_array)
                .map(|list| {
                    list.iter()
                        .filter_map(|a| str_field(a, "name"))
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default();
            let album = song.get("al").cloned().unwrap_or(Value::Null);
            Some(TrackMetadata {
                id: TrackId(id),
                title: str_field(song, "name").unwrap_or_else(|| id.to_string()),
                artists,
                album: str_field(&album, "name").unwrap_or_default(),
                cover_url: str_field(&album, "picUrl"),
                lyrics: None,
            })
        })
        .collect()
}

pub(crate) fn parse_offer(requested: Tier, value: &Value) -> Option<Offer> {
    let data = value.get("data")?.as_array()?.first()?;
    let url = str_field(data, "url").unwrap_or_default();
    let size = data.get("size").and_then(Value::as_u64).unwrap_or(0);
    let delivered = match str_field(data, "level") {
        Some(level) => Tier::from_level(&level).unwrap_or_else(|| {
            warn!(target: "catalog", level = %level, requested = %requested, "未知音质等级，按请求等级处理");
            requested
        }),
        None => requested,
    };
    let extension = str_field(data, "type")
        .map(|t| t.to_ascii_lowercase())
        .or_else(|| extension_from_url(&url))
        .unwrap_or_else(|| {
            if delivered.is_lossless() {
                "flac".to_string()
            } else {
                "mp3".to_string()
            }
        });
    Some(Offer {
        requested,
        delivered,
        size,
        extension,
        url,
    })
}

fn extension_from_url(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next()?;
    let file = path.rsplit('/').next()?;
    let (_, ext) = file.rsplit_once('.')?;
    (!ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .then(|| ext.to_ascii_lowercase())
}

pub(crate) fn parse_lyrics(value: &Value) -> Option<String> {
    value
        .get("lrc")
        .and_then(|lrc| lrc.get("lyric"))
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}

pub(crate) fn parse_playlist(id: PlaylistId, value: &Value) -> Option<PlaylistInfo> {
    let playlist = value.get("playlist").filter(|p| p.is_object())?;
    let track_ids = playlist
        .get("trackIds")
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter_map(|t| t.get("id").and_then(Value::as_u64))
                .map(TrackId)
                .collect()
        })
        .unwrap_or_default();
    Some(PlaylistInfo {
        id,
        name: str_field(playlist, "name").unwrap_or_else(|| id.to_string()),
        cover_url: str_field(playlist, "coverImgUrl"),
        track_ids,
    })
}

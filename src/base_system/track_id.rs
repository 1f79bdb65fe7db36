//! 歌曲 / 歌单 ID 与分享链接解析。

use regex::Regex;
use std::sync::OnceLock;

use crate::catalog::{PlaylistId, TrackId};

static RE_URL: OnceLock<Regex> = OnceLock::new();
static RE_QS: OnceLock<Regex> = OnceLock::new();
static RE_PATH: OnceLock<Regex> = OnceLock::new();

fn re_url() -> &'static Regex {
    RE_URL.get_or_init(|| Regex::new(r"https?://\S+").expect("compile RE_URL"))
}

fn re_qs() -> &'static Regex {
    RE_QS.get_or_init(|| Regex::new(r"[?&#]?\bid=(\d+)").expect("compile RE_QS"))
}

fn re_path() -> &'static Regex {
    RE_PATH.get_or_init(|| Regex::new(r"/(song|playlist)/(\d+)").expect("compile RE_PATH"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputTarget {
    Track(TrackId),
    Playlist(PlaylistId),
    /// 纯数字或无法判断类型的 `id=`，需要向曲库确认。
    Unknown(u64),
}

pub fn parse_input(input: &str) -> Option<InputTarget> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    if trimmed.chars().all(|c| c.is_ascii_digit()) {
        return trimmed.parse().ok().map(InputTarget::Unknown);
    }

    // If the user pasted share text around the URL, look at the URL only.
    let target = re_url()
        .find(trimmed)
        .map(|m| m.as_str())
        .unwrap_or(trimmed);

    if let Some(caps) = re_path().captures(target) {
        let id: u64 = caps.get(2)?.as_str().parse().ok()?;
        return Some(match caps.get(1)?.as_str() {
            "playlist" => InputTarget::Playlist(PlaylistId(id)),
            _ => InputTarget::Track(TrackId(id)),
        });
    }

    let id: u64 = re_qs().captures(target)?.get(1)?.as_str().parse().ok()?;
    if target.contains("playlist") {
        Some(InputTarget::Playlist(PlaylistId(id)))
    } else if target.contains("song") {
        Some(InputTarget::Track(TrackId(id)))
    } else {
        Some(InputTarget::Unknown(id))
    }
}

//! 曲库侧的数据模型：音质档位、探测结果（Offer）、歌曲元数据与歌单。

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// 歌曲 ID。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TrackId(pub u64);

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TrackId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(TrackId)
    }
}

/// 歌单 ID。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlaylistId(pub u64);

impl fmt::Display for PlaylistId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 可请求的音质档位。
///
/// 声明顺序即全序：越靠前越好（`Tier::Master < Tier::Standard`）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Tier {
    Master,
    Immersive,
    Supreme,
    HiRes,
    Lossless,
    High,
    Standard,
}

impl Tier {
    pub const ALL: [Tier; 7] = [
        Tier::Master,
        Tier::Immersive,
        Tier::Supreme,
        Tier::HiRes,
        Tier::Lossless,
        Tier::High,
        Tier::Standard,
    ];

    /// 接口使用的 level 字符串。
    pub fn level(self) -> &'static str {
        match self {
            Tier::Master => "jymaster",
            Tier::Immersive => "sky",
            Tier::Supreme => "jyeffect",
            Tier::HiRes => "hires",
            Tier::Lossless => "lossless",
            Tier::High => "exhigh",
            Tier::Standard => "standard",
        }
    }

    pub fn from_level(level: &str) -> Option<Tier> {
        let level = level.trim();
        Tier::ALL
            .into_iter()
            .find(|t| t.level().eq_ignore_ascii_case(level))
    }

    pub fn label(self) -> &'static str {
        match self {
            Tier::Master => "超清母带 (Master)",
            Tier::Immersive => "沉浸环绕 (Sky)",
            Tier::Supreme => "高清臻音 (Supreme)",
            Tier::HiRes => "Hi-Res",
            Tier::Lossless => "无损品质 (FLAC)",
            Tier::High => "极高音质 (MP3)",
            Tier::Standard => "标准音质 (MP3)",
        }
    }

    pub fn is_lossless(self) -> bool {
        self <= Tier::Lossless
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.level())
    }
}

/// 账号身份，决定一次运行尝试的档位上限。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountLevel {
    Svip,
    Vip,
    Free,
}

impl AccountLevel {
    /// 配置文件中的写法。
    pub fn name(self) -> &'static str {
        match self {
            AccountLevel::Svip => "svip",
            AccountLevel::Vip => "vip",
            AccountLevel::Free => "free",
        }
    }

    pub fn strategy(self) -> Strategy {
        let from = match self {
            AccountLevel::Svip => 0,
            AccountLevel::Vip => 2,
            AccountLevel::Free => 5,
        };
        Strategy::new(Tier::ALL[from..].to_vec())
    }
}

impl FromStr for AccountLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "svip" | "1" => Ok(AccountLevel::Svip),
            "vip" | "2" => Ok(AccountLevel::Vip),
            "free" | "3" => Ok(AccountLevel::Free),
            other => Err(format!("unknown account level: {other}")),
        }
    }
}

/// 一次运行尝试的档位序列（已按从好到差排列）。运行期间只读。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Strategy {
    tiers: Vec<Tier>,
}

impl Strategy {
    /// 保留给定顺序；重复档位只保留第一次出现，保证每个档位只探测一次。
    pub fn new(tiers: Vec<Tier>) -> Self {
        let mut out: Vec<Tier> = Vec::with_capacity(tiers.len());
        for tier in tiers {
            if !out.contains(&tier) {
                out.push(tier);
            }
        }
        Self { tiers: out }
    }

    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }
}

/// 对某首歌探测某个档位得到的可下载资源描述。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Offer {
    pub requested: Tier,
    pub delivered: Tier,
    pub size: u64,
    /// 小写扩展名，不带点，例如 `flac`。
    pub extension: String,
    /// 空字符串表示接口没有给出地址。
    pub url: String,
}

impl Offer {
    /// `size == 0` 是服务端"无权获取"的信号，不是错误。
    pub fn is_deliverable(&self) -> bool {
        self.size > 0 && !self.url.trim().is_empty()
    }

    pub fn quality_label(&self) -> &'static str {
        self.delivered.label()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackMetadata {
    pub id: TrackId,
    pub title: String,
    pub artists: Vec<String>,
    pub album: String,
    pub cover_url: Option<String>,
    pub lyrics: Option<String>,
}

impl TrackMetadata {
    pub fn artist_line(&self) -> String {
        if self.artists.is_empty() {
            return UNKNOWN_ARTIST.to_string();
        }
        self.artists.join(" & ")
    }

    pub fn primary_artist(&self) -> &str {
        self.artists
            .first()
            .map(String::as_str)
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(UNKNOWN_ARTIST)
    }
}

pub const UNKNOWN_ARTIST: &str = "未知歌手";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistInfo {
    pub id: PlaylistId,
    pub name: String,
    pub cover_url: Option<String>,
    pub track_ids: Vec<TrackId>,
}

//! 测试用的内存协作方。

use std::collections::{HashMap, HashSet};
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use super::job::OfferChooser;
use super::progress::{JobEvent, ProgressSink};
use super::tagging::{TagError, TagMetadata, TagWriter};
use super::transport::{Transport, TransportError};
use crate::catalog::{
    Catalog, CatalogError, Offer, PlaylistId, PlaylistInfo, Tier, TrackId, TrackMetadata,
};

pub fn track(id: u64, title: &str, artists: &[&str]) -> TrackMetadata {
    TrackMetadata {
        id: TrackId(id),
        title: title.to_string(),
        artists: artists.iter().map(|s| s.to_string()).collect(),
        album: format!("album {id}"),
        cover_url: Some(format!("http://img.test/{id}.jpg")),
        lyrics: None,
    }
}

#[derive(Debug, Clone)]
pub enum Probe {
    Absent,
    Error,
    Offer(Offer),
}

impl Probe {
    /// 地址在探测时按歌曲 ID 生成：`http://cdn.test/<id>/<size>.<ext>`。
    pub fn offer(delivered: Tier, size: u64, extension: &str) -> Probe {
        Probe::Offer(Offer {
            requested: delivered,
            delivered,
            size,
            extension: extension.to_string(),
            url: "pending".to_string(),
        })
    }
}

#[derive(Default)]
pub struct FakeCatalog {
    tracks: HashMap<TrackId, TrackMetadata>,
    probes: HashMap<(TrackId, Tier), Probe>,
    lyrics: HashMap<TrackId, String>,
    playlists: HashMap<PlaylistId, PlaylistInfo>,
    calls: Mutex<HashMap<(TrackId, Tier), usize>>,
    detail_requests: Mutex<Vec<Vec<TrackId>>>,
    lyric_requests: AtomicUsize,
    reversed_details: bool,
    failing_details: bool,
}

impl FakeCatalog {
    pub fn with_track(mut self, meta: TrackMetadata) -> Self {
        self.tracks.insert(meta.id, meta);
        self
    }

    pub fn with_probe(mut self, id: u64, tier: Tier, probe: Probe) -> Self {
        self.probes.insert((TrackId(id), tier), probe);
        self
    }

    pub fn with_lyrics(mut self, id: u64, text: &str) -> Self {
        self.lyrics.insert(TrackId(id), text.to_string());
        self
    }

    pub fn with_playlist(mut self, info: PlaylistInfo) -> Self {
        self.playlists.insert(info.id, info);
        self
    }

    /// 详情接口按与请求相反的顺序返回。
    pub fn with_reversed_details(mut self) -> Self {
        self.reversed_details = true;
        self
    }

    /// 详情接口总是报错。
    pub fn with_failing_details(mut self) -> Self {
        self.failing_details = true;
        self
    }

    pub fn lyric_requests(&self) -> usize {
        self.lyric_requests.load(Ordering::SeqCst)
    }

    pub fn detail_requests(&self) -> Vec<Vec<TrackId>> {
        self.detail_requests.lock().unwrap().clone()
    }

    /// 一首可下载的歌：元数据 + 单个 Lossless 档位。
    pub fn with_downloadable(self, id: u64, title: &str, size: u64) -> Self {
        self.with_track(track(id, title, &["Artist"]))
            .with_probe(id, Tier::Lossless, Probe::offer(Tier::Lossless, size, "flac"))
    }

    pub fn probe_count(&self, id: TrackId, tier: Tier) -> usize {
        self.calls
            .lock()
            .unwrap()
            .get(&(id, tier))
            .copied()
            .unwrap_or(0)
    }

    pub fn total_probes(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }
}

impl Catalog for FakeCatalog {
    fn fetch_track_metadata(&self, ids: &[TrackId]) -> Result<Vec<TrackMetadata>, CatalogError> {
        self.detail_requests.lock().unwrap().push(ids.to_vec());
        if self.failing_details {
            return Err(CatalogError::Api {
                code: 500,
                message: "detail failed".into(),
            });
        }
        let mut found: Vec<TrackMetadata> =
            ids.iter().filter_map(|id| self.tracks.get(id)).cloned().collect();
        if self.reversed_details {
            found.reverse();
        }
        Ok(found)
    }

    fn fetch_quality_offer(
        &self,
        id: TrackId,
        tier: Tier,
    ) -> Result<Option<Offer>, CatalogError> {
        *self.calls.lock().unwrap().entry((id, tier)).or_default() += 1;
        match self.probes.get(&(id, tier)) {
            None | Some(Probe::Absent) => Ok(None),
            Some(Probe::Error) => Err(CatalogError::Api {
                code: -460,
                message: "probe failed".into(),
            }),
            Some(Probe::Offer(offer)) => {
                let mut offer = offer.clone();
                offer.requested = tier;
                if !offer.url.is_empty() {
                    offer.url = format!("http://cdn.test/{id}/{}.{}", offer.size, offer.extension);
                }
                Ok(Some(offer))
            }
        }
    }

    fn fetch_lyrics(&self, id: TrackId) -> Result<Option<String>, CatalogError> {
        self.lyric_requests.fetch_add(1, Ordering::SeqCst);
        Ok(self.lyrics.get(&id).cloned())
    }

    fn fetch_playlist(&self, id: PlaylistId) -> Result<Option<PlaylistInfo>, CatalogError> {
        Ok(self.playlists.get(&id).cloned())
    }
}

/// 按地址里的字节数写入文件；指定歌曲写到一半后失败。
#[derive(Default)]
pub struct FakeTransport {
    failing: HashSet<TrackId>,
    pub written: AtomicU64,
    pub calls: AtomicUsize,
}

impl FakeTransport {
    pub fn failing_for(ids: &[u64]) -> Self {
        Self {
            failing: ids.iter().map(|&id| TrackId(id)).collect(),
            ..Self::default()
        }
    }

    fn size_from_url(url: &str) -> u64 {
        url.rsplit('/')
            .next()
            .and_then(|last| last.split('.').next())
            .and_then(|n| n.parse().ok())
            .unwrap_or(8)
    }

    fn fails(&self, url: &str) -> bool {
        self.failing
            .iter()
            .any(|id| url.contains(&format!("/{id}/")))
    }
}

impl Transport for FakeTransport {
    fn stream_download(
        &self,
        url: &str,
        dest: &Path,
        on_progress: &mut dyn FnMut(u64),
    ) -> Result<u64, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let io_err = |source: io::Error| TransportError::Io {
            path: dest.to_path_buf(),
            source,
        };
        let size = Self::size_from_url(url);
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(dest)
            .map_err(io_err)?;

        let half = size / 2;
        file.write_all(&vec![0u8; half as usize]).map_err(io_err)?;
        self.written.fetch_add(half, Ordering::SeqCst);
        on_progress(half);

        if self.fails(url) {
            return Err(io_err(io::Error::other("connection reset")));
        }

        let rest = size - half;
        file.write_all(&vec![1u8; rest as usize]).map_err(io_err)?;
        self.written.fetch_add(rest, Ordering::SeqCst);
        on_progress(size);
        Ok(size)
    }
}

#[derive(Default)]
pub struct RecordingTagWriter {
    pub fail: bool,
    pub skip_lyrics: bool,
    pub calls: AtomicUsize,
    pub last: Mutex<Option<TagMetadata>>,
}

impl RecordingTagWriter {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

impl TagWriter for RecordingTagWriter {
    fn embed_tags(&self, _path: &Path, meta: &TagMetadata) -> Result<(), TagError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last.lock().unwrap() = Some(meta.clone());
        if self.fail {
            Err(TagError::NoTag)
        } else {
            Ok(())
        }
    }

    fn wants_lyrics(&self) -> bool {
        !self.skip_lyrics
    }
}

/// 记录所有事件；可选地在第一次 `Started` 时拉起取消标志。
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<(TrackId, JobEvent)>>,
    cancel_on_start: Option<Arc<AtomicBool>>,
}

impl RecordingSink {
    pub fn cancelling(flag: Arc<AtomicBool>) -> Self {
        Self {
            cancel_on_start: Some(flag),
            ..Self::default()
        }
    }

    pub fn events_for(&self, id: TrackId) -> Vec<JobEvent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(t, _)| *t == id)
            .map(|(_, e)| e.clone())
            .collect()
    }
}

impl ProgressSink for RecordingSink {
    fn on_event(&self, track: TrackId, event: &JobEvent) {
        if matches!(event, JobEvent::Started)
            && let Some(flag) = &self.cancel_on_start
        {
            flag.store(true, Ordering::SeqCst);
        }
        self.events.lock().unwrap().push((track, event.clone()));
    }
}

pub struct ScriptedChooser(pub Option<i64>);

impl OfferChooser for ScriptedChooser {
    fn choose(&self, _track: &TrackMetadata, _offers: &[Offer]) -> Option<i64> {
        self.0
    }
}

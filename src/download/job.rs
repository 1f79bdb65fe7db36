//! 单曲任务：元数据 → 音质探测 → 选择 → 下载 → 写标签。
//!
//! 每首歌一个 [`TrackJob`]，状态只前进，不重试；任何错误都只终止本首歌。
//! 下载中途失败时不清理已写入的部分文件，下次运行会因文件已存在而跳过，
//! 需要时由使用者手动删除后重新下载。

use std::fs;
use std::path::Path;

use tracing::{debug, info, warn};

use super::models::{JobError, JobOutcome, JobState, SelectionMode, TagWarning};
use super::progress::{JobEvent, ProgressSink};
use super::resolver::QualityResolver;
use super::selection::select;
use super::tagging::{TagMetadata, TagWriter};
use super::transport::Transport;
use crate::base_system::track_paths::track_file_path;
use crate::catalog::{Catalog, Offer, Strategy, TrackId, TrackMetadata};

/// 交互模式下向用户展示音质列表并取回 1 起的序号。`None` 表示直接回车。
pub trait OfferChooser: Send + Sync {
    fn choose(&self, track: &TrackMetadata, offers: &[Offer]) -> Option<i64>;
}

/// 一批任务共享的只读上下文。
#[derive(Clone, Copy)]
pub struct JobContext<'a> {
    pub catalog: &'a dyn Catalog,
    pub transport: &'a dyn Transport,
    pub tagger: &'a dyn TagWriter,
    pub sink: &'a dyn ProgressSink,
    pub strategy: &'a Strategy,
    pub base_dir: &'a Path,
    pub mode: SelectionMode,
    pub chooser: Option<&'a dyn OfferChooser>,
}

pub struct TrackJob {
    id: TrackId,
    state: JobState,
}

impl TrackJob {
    pub fn new(id: TrackId) -> Self {
        Self {
            id,
            state: JobState::Pending,
        }
    }

    fn advance(&mut self, next: JobState) {
        debug_assert!(
            !self.state.is_terminal() && next.rank() > self.state.rank(),
            "illegal transition {} -> {}",
            self.state.name(),
            next.name()
        );
        debug!(target: "job", track_id = %self.id, from = self.state.name(), to = next.name(), "状态变更");
        self.state = next;
    }

    /// 跑到终态为止。事件按状态顺序发给 `ctx.sink`。
    pub fn run(mut self, ctx: &JobContext<'_>) -> JobOutcome {
        let mut outcome = JobOutcome::new(self.id);
        ctx.sink.on_event(self.id, &JobEvent::Started);

        match self.drive(ctx, &mut outcome) {
            Ok(()) => match &self.state {
                JobState::Skipped => {
                    let path = outcome.path.clone().unwrap_or_default();
                    info!(target: "job", track_id = %self.id, path = %path.display(), "文件已存在，跳过");
                    ctx.sink.on_event(self.id, &JobEvent::Skipped { path });
                }
                _ => {
                    info!(
                        target: "job",
                        track_id = %self.id,
                        bytes = outcome.bytes_written,
                        warned = outcome.warning.is_some(),
                        "下载完成"
                    );
                    ctx.sink.on_event(
                        self.id,
                        &JobEvent::Succeeded {
                            warning: outcome.warning.clone(),
                        },
                    );
                }
            },
            Err(err) => {
                warn!(target: "job", track_id = %self.id, error = %err, "任务失败");
                self.advance(JobState::Failed(err.clone()));
                ctx.sink.on_event(self.id, &JobEvent::Failed(err));
            }
        }

        outcome.state = self.state;
        outcome
    }

    fn drive(&mut self, ctx: &JobContext<'_>, outcome: &mut JobOutcome) -> Result<(), JobError> {
        let id = self.id;

        let meta = self.fetch_metadata(ctx)?;
        self.advance(JobState::MetadataFetched);
        outcome.title = Some(meta.title.clone());
        outcome.artist = Some(meta.artist_line());
        ctx.sink.on_event(
            id,
            &JobEvent::Identified {
                title: meta.title.clone(),
                artist: meta.artist_line(),
            },
        );

        let offers = QualityResolver::new(ctx.catalog).resolve(id, ctx.strategy);
        self.advance(JobState::Resolved);

        let choice = match (ctx.mode, ctx.chooser) {
            (SelectionMode::Interactive, Some(chooser)) if !offers.is_empty() => {
                chooser.choose(&meta, &offers)
            }
            _ => None,
        };
        let offer = select(&offers, ctx.mode, choice)?.clone();
        self.advance(JobState::Selected);
        debug!(
            target: "job",
            track_id = %id,
            tier = %offer.delivered,
            bytes = offer.size,
            "已选择音质"
        );
        ctx.sink.on_event(id, &JobEvent::Selected(offer.clone()));
        outcome.offer = Some(offer.clone());

        let dest = track_file_path(ctx.base_dir, &meta, &offer.extension);
        outcome.path = Some(dest.clone());
        if dest.exists() {
            self.advance(JobState::Skipped);
            return Ok(());
        }
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| JobError::Transport(format!("{}: {e}", parent.display())))?;
        }

        self.advance(JobState::Downloading);
        let total = offer.size;
        let mut on_progress = |done: u64| {
            ctx.sink
                .on_event(id, &JobEvent::BytesProgressed { done, total });
        };
        let written = ctx
            .transport
            .stream_download(&offer.url, &dest, &mut on_progress)
            .map_err(|e| JobError::Transport(e.to_string()))?;
        outcome.bytes_written = written;

        self.advance(JobState::Tagging);
        let tags = TagMetadata {
            title: meta.title.clone(),
            artist: meta.artist_line(),
            album: meta.album.clone(),
            cover_url: meta.cover_url.clone(),
            lyrics: self.lyrics(ctx, &meta),
        };
        if let Err(err) = ctx.tagger.embed_tags(&dest, &tags) {
            warn!(target: "job", track_id = %id, error = %err, "标签写入失败，保留音频文件");
            outcome.warning = Some(TagWarning(err.to_string()));
        }

        self.advance(JobState::Succeeded);
        Ok(())
    }

    fn fetch_metadata(&self, ctx: &JobContext<'_>) -> Result<TrackMetadata, JobError> {
        let records = ctx
            .catalog
            .fetch_track_metadata(&[self.id])
            .map_err(|e| {
                warn!(target: "job", track_id = %self.id, error = %e, "获取歌曲详情失败");
                JobError::MetadataUnavailable
            })?;
        records
            .into_iter()
            .find(|m| m.id == self.id)
            .ok_or(JobError::MetadataUnavailable)
    }

    /// 歌词缺失不是错误。
    fn lyrics(&self, ctx: &JobContext<'_>, meta: &TrackMetadata) -> Option<String> {
        if !ctx.tagger.wants_lyrics() {
            return None;
        }
        if meta.lyrics.is_some() {
            return meta.lyrics.clone();
        }
        match ctx.catalog.fetch_lyrics(self.id) {
            Ok(lyrics) => lyrics,
            Err(err) => {
                debug!(target: "job", track_id = %self.id, error = %err, "获取歌词失败");
                None
            }
        }
    }
}

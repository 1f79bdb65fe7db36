use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use super::picker::{StdinChooser, parse_indexes};
use crate::base_system::context::Config;
use crate::base_system::track_id::{InputTarget, parse_input};
use crate::catalog::netease::NeteaseClient;
use crate::catalog::{Catalog, PlaylistId, PlaylistInfo, Strategy, TrackId, TrackMetadata};
use crate::download::tagging::LoftyTagWriter;
use crate::download::transport::HttpTransport;
use crate::download::{
    BatchResult, ConsoleReporter, JobContext, OfferChooser, Orchestrator, ReportMode,
    SelectionMode,
};
use crate::interrupt_state;

const SECTION: &str = "----------------------------------------";

/// 一次运行共享的协作方与配置。
pub(crate) struct Session<'c> {
    config: &'c Config,
    strategy: Strategy,
    catalog: NeteaseClient,
    transport: HttpTransport,
    tagger: LoftyTagWriter,
}

pub(crate) enum Resolved {
    Track(TrackId),
    Playlist(PlaylistInfo),
}

impl<'c> Session<'c> {
    pub(crate) fn new(config: &'c Config, strategy: Strategy) -> Result<Self> {
        let catalog = NeteaseClient::new(config.netease_config()).context("初始化网易云客户端失败")?;
        let connect_timeout = config
            .connect_timeout()
            .unwrap_or(Duration::from_secs(10));
        let transport = HttpTransport::new(connect_timeout).context("初始化下载客户端失败")?;
        let tagger = LoftyTagWriter {
            cover_timeout: Duration::from_secs(config.request_timeout.max(1)),
            embed_cover: config.embed_cover,
            embed_lyrics: config.embed_lyrics,
        };
        Ok(Self {
            config,
            strategy,
            catalog,
            transport,
            tagger,
        })
    }

    pub(crate) fn identify(&self, text: &str) -> Result<Option<Resolved>> {
        identify(&self.catalog, text)
    }

    /// 跑一批；批量期间第一次 Ctrl+C 只停止领取新歌曲。
    pub(crate) fn run_batch(
        &self,
        ids: &[TrackId],
        mode: SelectionMode,
        report: ReportMode,
        workers: usize,
    ) -> Result<BatchResult> {
        let reporter = ConsoleReporter::new(report);
        let chooser: &dyn OfferChooser = &StdinChooser;
        let save_dir = self.config.default_save_dir();
        let ctx = JobContext {
            catalog: &self.catalog,
            transport: &self.transport,
            tagger: &self.tagger,
            sink: &reporter,
            strategy: &self.strategy,
            base_dir: &save_dir,
            mode,
            chooser: match mode {
                SelectionMode::Interactive => Some(chooser),
                SelectionMode::AutoBest => None,
            },
        };

        let guard = interrupt_state::begin_batch();
        let result = Orchestrator::new(ctx, workers)
            .with_cancel(guard.cancel_flag())
            .run_batch(ids)?;
        Ok(result)
    }

    pub(crate) fn download_song(&self, id: TrackId) -> Result<()> {
        let result = self.run_batch(&[id], SelectionMode::Interactive, ReportMode::Interactive, 1)?;
        let state = result.get(id).map_or("not-started", |r| r.state.name());
        info!(target: "ui", track_id = %id, state, "单曲处理结束");
        Ok(())
    }

    pub(crate) fn download_playlist(&self, playlist: &PlaylistInfo) -> Result<()> {
        let ids = &playlist.track_ids;
        info!(target: "ui", playlist_id = %playlist.id, cover = ?playlist.cover_url, tracks = ids.len(), "歌单已加载");
        println!("[歌单] {} (共 {} 首)", playlist.name, ids.len());
        if ids.is_empty() {
            println!("[提示] 歌单为空");
            return Ok(());
        }
        println!("1. 下载全部 (自动最高音质)");
        println!("2. 自选歌曲");

        let sel = super::read_line("> 请选择: ")?;
        let chosen: Vec<TrackId> = match sel.trim() {
            "1" => ids.clone(),
            "2" => {
                let Some(picked) = self.pick_tracks(ids)? else {
                    return Ok(());
                };
                picked
            }
            _ => return Ok(()),
        };

        self.run_auto_batch(&chosen)?;
        Ok(())
    }

    pub(crate) fn run_auto_batch(&self, ids: &[TrackId]) -> Result<BatchResult> {
        let workers = self.config.max_workers.max(1);
        println!(
            "\n[线程池] 启动 {} 线程下载 {} 首歌曲...",
            workers.min(ids.len()),
            ids.len()
        );
        println!("{SECTION}");
        let result = self.run_batch(ids, SelectionMode::AutoBest, ReportMode::Batch, workers)?;
        println!("{SECTION}");
        print_summary(&result);
        Ok(result)
    }

    fn pick_tracks(&self, ids: &[TrackId]) -> Result<Option<Vec<TrackId>>> {
        println!("\n[列表] 正在获取 {} 首歌曲详情...", ids.len());
        let songs = fetch_details(&self.catalog, ids, self.config.detail_batch_size);

        println!("{}", "-".repeat(60));
        for (idx, song) in songs.iter().enumerate() {
            let title: String = song.title.chars().take(30).collect();
            println!("{:03}. {:<30} - {}", idx + 1, title, song.primary_artist());
        }
        println!("{}", "-".repeat(60));

        println!("[输入] 支持序号: 1, 3-5, 10 或 'all' (回车取消)");
        let input = super::read_line("> 请输入: ")?;
        if input.trim().is_empty() {
            return Ok(None);
        }
        let indexes = parse_indexes(&input, songs.len());
        if indexes.is_empty() {
            println!("[提示] 未选择有效歌曲");
            return Ok(None);
        }
        Ok(Some(indexes.into_iter().map(|i| songs[i].id).collect()))
    }
}

/// 把用户输入落到具体的歌曲或歌单；纯数字先按歌曲查询，查不到（或查询失败）再按歌单查询。
pub(crate) fn identify(catalog: &dyn Catalog, text: &str) -> Result<Option<Resolved>> {
    let Some(target) = parse_input(text) else {
        return Ok(None);
    };
    match target {
        InputTarget::Track(id) => Ok(Some(Resolved::Track(id))),
        InputTarget::Playlist(id) => Ok(playlist(catalog, id)?.map(Resolved::Playlist)),
        InputTarget::Unknown(raw) => {
            match catalog.fetch_track_metadata(&[TrackId(raw)]) {
                Ok(found) if found.iter().any(|m| m.id == TrackId(raw)) => {
                    return Ok(Some(Resolved::Track(TrackId(raw))));
                }
                Ok(_) => {}
                Err(err) => {
                    warn!(target: "ui", id = raw, error = %err, "按歌曲查询失败，改按歌单查询");
                }
            }
            Ok(playlist(catalog, PlaylistId(raw))?.map(Resolved::Playlist))
        }
    }
}

fn playlist(catalog: &dyn Catalog, id: PlaylistId) -> Result<Option<PlaylistInfo>> {
    catalog
        .fetch_playlist(id)
        .with_context(|| format!("获取歌单失败: {id}"))
}

/// 分块请求详情；某一块失败只少显示这一块。
pub(crate) fn fetch_details(
    catalog: &dyn Catalog,
    ids: &[TrackId],
    chunk: usize,
) -> Vec<TrackMetadata> {
    let mut songs = Vec::with_capacity(ids.len());
    for part in ids.chunks(chunk.max(1)) {
        match catalog.fetch_track_metadata(part) {
            Ok(mut found) => {
                // 保持歌单顺序
                found.sort_by_key(|m| part.iter().position(|id| *id == m.id));
                songs.extend(found);
            }
            Err(err) => warn!(target: "ui", error = %err, "获取歌曲详情失败"),
        }
    }
    songs
}

pub(crate) fn print_summary(result: &BatchResult) {
    let s = result.summary();
    println!(
        "[完成] 任务结束：成功 {} | 已存在 {} | 失败 {} | 未开始 {}",
        s.succeeded, s.skipped, s.failed, s.not_started
    );
    if s.tag_warnings > 0 {
        println!("[提示] {} 首歌曲标签写入失败（音频已保存）", s.tag_warnings);
    }
    for report in &result.reports {
        if let Some(err) = report.error() {
            println!("  - {}: {err}", report.display_name());
        }
    }
}

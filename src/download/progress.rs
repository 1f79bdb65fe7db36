//! 进度上报与 CLI 进度条管理。
//!
//! 上报器只是事件的接收端：不阻塞任务，也不影响任务状态。

use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Mutex;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use super::models::{JobError, TagWarning};
use crate::catalog::{Offer, TrackId};

const RULE: &str = "------------------------------------------------------------";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobEvent {
    Started,
    Identified { title: String, artist: String },
    Selected(Offer),
    BytesProgressed { done: u64, total: u64 },
    Succeeded { warning: Option<TagWarning> },
    Skipped { path: PathBuf },
    Failed(JobError),
}

pub trait ProgressSink: Send + Sync {
    fn on_event(&self, track: TrackId, event: &JobEvent);
}

/// 每批选一次：交互（单曲 + 字节进度条）或批量（每首一行）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportMode {
    Interactive,
    Batch,
}

pub struct ConsoleReporter {
    mode: ReportMode,
    names: Mutex<HashMap<TrackId, String>>,
    bar: Mutex<Option<ProgressBar>>,
}

impl ConsoleReporter {
    pub fn new(mode: ReportMode) -> Self {
        Self {
            mode,
            names: Mutex::new(HashMap::new()),
            bar: Mutex::new(None),
        }
    }

    fn name_of(&self, track: TrackId) -> String {
        self.names
            .lock()
            .ok()
            .and_then(|m| m.get(&track).cloned())
            .unwrap_or_else(|| format!("ID {track}"))
    }

    fn forget(&self, track: TrackId) {
        if let Ok(mut names) = self.names.lock() {
            names.remove(&track);
        }
    }

    fn start_bar(&self, total: u64) {
        let bar = ProgressBar::with_draw_target(Some(total), ProgressDrawTarget::stderr());
        let style = ProgressStyle::with_template(
            "下载中 [{elapsed_precise}] {wide_bar} {bytes}/{total_bytes} ({bytes_per_sec}, {eta})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█░");
        bar.set_style(style);
        if let Ok(mut slot) = self.bar.lock() {
            *slot = Some(bar);
        }
    }

    fn clear_bar(&self) {
        if let Ok(mut slot) = self.bar.lock()
            && let Some(bar) = slot.take()
        {
            bar.finish_and_clear();
        }
    }

    fn interactive(&self, track: TrackId, event: &JobEvent) {
        match event {
            JobEvent::Started => {}
            JobEvent::Identified { title, artist } => {
                println!("{RULE}");
                println!("歌名 : {title} | 歌手 : {artist}");
                println!("{RULE}");
            }
            JobEvent::Selected(offer) => {
                println!("[选中] {}", offer.quality_label());
                self.start_bar(offer.size);
            }
            JobEvent::BytesProgressed { done, total } => {
                if let Ok(slot) = self.bar.lock()
                    && let Some(bar) = slot.as_ref()
                {
                    if bar.length() != Some(*total) {
                        bar.set_length(*total);
                    }
                    bar.set_position(*done);
                }
            }
            JobEvent::Succeeded { warning } => {
                self.clear_bar();
                match warning {
                    None => println!("✅ 处理完成"),
                    Some(w) => println!("✅ 下载完成（{w}）"),
                }
            }
            JobEvent::Skipped { path } => {
                self.clear_bar();
                let file = path
                    .file_name()
                    .map(|s| s.to_string_lossy().to_string())
                    .unwrap_or_else(|| path.display().to_string());
                println!("[提示] 文件已存在: {file}");
            }
            JobEvent::Failed(err) => {
                self.clear_bar();
                println!("[错误] {} - {err}", self.name_of(track));
            }
        }
    }

    fn batch(&self, track: TrackId, event: &JobEvent) {
        match event {
            JobEvent::Started | JobEvent::Identified { .. } | JobEvent::BytesProgressed { .. } => {}
            JobEvent::Selected(offer) => {
                println!("[开始] {} [{}]", self.name_of(track), offer.quality_label());
            }
            JobEvent::Succeeded { warning } => {
                match warning {
                    None => println!("[完成] {}", self.name_of(track)),
                    Some(w) => println!("[完成] {} ({w})", self.name_of(track)),
                }
                self.forget(track);
            }
            JobEvent::Skipped { .. } => {
                println!("[跳过] {} (文件已存在)", self.name_of(track));
                self.forget(track);
            }
            JobEvent::Failed(err) => {
                println!("[失败] {} - {err}", self.name_of(track));
                self.forget(track);
            }
        }
    }
}

impl ProgressSink for ConsoleReporter {
    fn on_event(&self, track: TrackId, event: &JobEvent) {
        if let JobEvent::Identified { title, artist } = event
            && let Ok(mut names) = self.names.lock()
        {
            names.insert(track, format!("{artist} - {title}"));
        }
        match self.mode {
            ReportMode::Interactive => self.interactive(track, event),
            ReportMode::Batch => self.batch(track, event),
        }
    }
}

pub fn format_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_string();
    }
    let mut size = bytes as f64;
    for unit in ["B", "KB", "MB", "GB"] {
        if size < 1024.0 {
            return format!("{size:.1} {unit}");
        }
        size /= 1024.0;
    }
    format!("{size:.1} TB")
}

/// 交互选择时展示的音质菜单（序号从 1 开始）。
pub fn render_offer_table(offers: &[Offer]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<6} {:<8} {:<12} 音质", "序号", "格式", "大小");
    let _ = writeln!(out, "{RULE}");
    for (idx, offer) in offers.iter().enumerate() {
        let _ = writeln!(
            out,
            "{:<6} {:<8} {:<12} {}",
            idx + 1,
            offer.extension,
            format_size(offer.size),
            offer.quality_label()
        );
    }
    let _ = write!(out, "{RULE}");
    out
}

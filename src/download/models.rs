//! 下载流程的数据模型。
//!
//! 包含单曲任务状态、失败原因、单曲结果与批量结果汇总。

use std::path::PathBuf;

use thiserror::Error;

use crate::catalog::{Offer, TrackId};

/// 自动取最佳，或逐首询问。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    AutoBest,
    Interactive,
}

/// 单曲失败原因。文案直接展示给用户。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    #[error("获取歌曲信息失败")]
    MetadataUnavailable,
    #[error("没有可下载的音质")]
    NoOffers,
    #[error("无效的选择 {index}（可选 1-{available}）")]
    InvalidChoice { index: i64, available: usize },
    #[error("下载失败: {0}")]
    Transport(String),
    /// 协作方在处理中 panic，已被工作线程拦截。
    #[error("处理异常中止: {0}")]
    Aborted(String),
}

/// 标签写入失败不影响已下载的音频，只作为提示附带在结果里。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("写入标签失败: {0}")]
pub struct TagWarning(pub String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Pending,
    MetadataFetched,
    Resolved,
    Selected,
    Downloading,
    Tagging,
    Succeeded,
    Skipped,
    Failed(JobError),
}

impl JobState {
    /// 状态只能前进；终态之间不比较。
    pub fn rank(&self) -> u8 {
        match self {
            JobState::Pending => 0,
            JobState::MetadataFetched => 1,
            JobState::Resolved => 2,
            JobState::Selected => 3,
            JobState::Downloading => 4,
            JobState::Tagging => 5,
            JobState::Succeeded | JobState::Skipped | JobState::Failed(_) => 6,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Succeeded | JobState::Skipped | JobState::Failed(_)
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::MetadataFetched => "metadata-fetched",
            JobState::Resolved => "resolved",
            JobState::Selected => "selected",
            JobState::Downloading => "downloading",
            JobState::Tagging => "tagging",
            JobState::Succeeded => "succeeded",
            JobState::Skipped => "skipped",
            JobState::Failed(_) => "failed",
        }
    }
}

/// 一首歌的最终结果。
#[derive(Debug, Clone)]
pub struct JobOutcome {
    pub track_id: TrackId,
    pub state: JobState,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub offer: Option<Offer>,
    pub path: Option<PathBuf>,
    pub bytes_written: u64,
    pub warning: Option<TagWarning>,
}

impl JobOutcome {
    pub fn new(track_id: TrackId) -> Self {
        Self {
            track_id,
            state: JobState::Pending,
            title: None,
            artist: None,
            offer: None,
            path: None,
            bytes_written: 0,
            warning: None,
        }
    }

    pub fn display_name(&self) -> String {
        match (&self.artist, &self.title) {
            (Some(artist), Some(title)) => format!("{artist} - {title}"),
            (None, Some(title)) => title.clone(),
            _ => format!("ID {}", self.track_id),
        }
    }

    pub fn error(&self) -> Option<&JobError> {
        match &self.state {
            JobState::Failed(err) => Some(err),
            _ => None,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub succeeded: u32,
    pub skipped: u32,
    pub failed: u32,
    pub not_started: u32,
    pub tag_warnings: u32,
}

/// 一次批量的结果。`reports` 按提交顺序排列，只包含已经开始的歌曲；
/// 中断后没来得及开始的歌曲列在 `not_started`。
#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    pub reports: Vec<JobOutcome>,
    pub not_started: Vec<TrackId>,
}

impl BatchResult {
    pub fn get(&self, id: TrackId) -> Option<&JobOutcome> {
        self.reports.iter().find(|r| r.track_id == id)
    }

    pub fn summary(&self) -> BatchSummary {
        let mut summary = BatchSummary {
            not_started: self.not_started.len() as u32,
            ..BatchSummary::default()
        };
        for report in &self.reports {
            match report.state {
                JobState::Succeeded => summary.succeeded += 1,
                JobState::Skipped => summary.skipped += 1,
                JobState::Failed(_) => summary.failed += 1,
                _ => {}
            }
            if report.warning.is_some() {
                summary.tag_warnings += 1;
            }
        }
        summary
    }

    pub fn has_failures(&self) -> bool {
        self.reports
            .iter()
            .any(|r| matches!(r.state, JobState::Failed(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(id: u64, state: JobState) -> JobOutcome {
        JobOutcome {
            state,
            ..JobOutcome::new(TrackId(id))
        }
    }

    #[test]
    fn terminal_states_share_top_rank() {
        assert!(JobState::Succeeded.is_terminal());
        assert!(JobState::Failed(JobError::NoOffers).is_terminal());
        assert!(!JobState::Tagging.is_terminal());
        assert!(JobState::Tagging.rank() < JobState::Skipped.rank());
        assert!(JobState::Pending.rank() < JobState::MetadataFetched.rank());
    }

    #[test]
    fn summary_counts_each_terminal_kind() {
        let mut ok = outcome(1, JobState::Succeeded);
        ok.warning = Some(TagWarning("cover".into()));
        let result = BatchResult {
            reports: vec![
                ok,
                outcome(2, JobState::Skipped),
                outcome(3, JobState::Failed(JobError::MetadataUnavailable)),
            ],
            not_started: vec![TrackId(4)],
        };
        let summary = result.summary();
        assert_eq!(
            summary,
            BatchSummary {
                succeeded: 1,
                skipped: 1,
                failed: 1,
                not_started: 1,
                tag_warnings: 1,
            }
        );
        assert!(result.has_failures());
        assert_eq!(result.get(TrackId(2)).map(|r| r.state.name()), Some("skipped"));
    }

    #[test]
    fn invalid_choice_message_names_the_range() {
        let err = JobError::InvalidChoice {
            index: 9,
            available: 3,
        };
        assert_eq!(err.to_string(), "无效的选择 9（可选 1-3）");
    }

    #[test]
    fn display_name_falls_back_to_id() {
        assert_eq!(outcome(7, JobState::Pending).display_name(), "ID 7");
    }
}

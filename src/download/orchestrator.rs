//! 批量下载：固定宽度的工作线程池，每个线程一次跑完一首歌再取下一首。

use std::any::Any;
use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use crossbeam_channel as channel;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::job::{JobContext, TrackJob};
use super::models::{BatchResult, JobError, JobOutcome, JobState};
use super::progress::JobEvent;
use crate::catalog::TrackId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BatchError {
    #[error("没有要下载的歌曲")]
    EmptyInput,
    #[error("重复的歌曲 ID: {0}")]
    DuplicateTrack(TrackId),
    #[error("工作线程数必须大于 0")]
    ZeroWorkers,
}

pub struct Orchestrator<'a> {
    ctx: JobContext<'a>,
    workers: usize,
    cancel: Option<Arc<AtomicBool>>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(ctx: JobContext<'a>, workers: usize) -> Self {
        Self {
            ctx,
            workers,
            cancel: None,
        }
    }

    /// 标志被拉起后不再开始新歌曲；已经开始的照常跑完。
    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    fn validate(&self, ids: &[TrackId]) -> Result<(), BatchError> {
        if ids.is_empty() {
            return Err(BatchError::EmptyInput);
        }
        if self.workers == 0 {
            return Err(BatchError::ZeroWorkers);
        }
        let mut seen = HashSet::with_capacity(ids.len());
        for id in ids {
            if !seen.insert(*id) {
                return Err(BatchError::DuplicateTrack(*id));
            }
        }
        Ok(())
    }

    /// 阻塞到所有已开始的歌曲都进入终态。单曲失败不影响其它歌曲。
    pub fn run_batch(&self, ids: &[TrackId]) -> Result<BatchResult, BatchError> {
        self.validate(ids)?;

        let width = self.workers.min(ids.len());
        info!(target: "batch", total = ids.len(), workers = width, "开始批量下载");

        let (job_tx, job_rx) = channel::unbounded::<(usize, TrackId)>();
        for (idx, id) in ids.iter().enumerate() {
            let _ = job_tx.send((idx, *id));
        }
        drop(job_tx);

        let (res_tx, res_rx) = channel::unbounded::<(usize, JobOutcome)>();
        let cancel = self.cancel.as_deref();

        thread::scope(|s| {
            for n in 0..width {
                let job_rx = job_rx.clone();
                let res_tx = res_tx.clone();
                let ctx = self.ctx;
                let spawned = thread::Builder::new()
                    .name(format!("track-worker-{n}"))
                    .spawn_scoped(s, move || {
                        loop {
                            if cancel.is_some_and(|c| c.load(Ordering::SeqCst)) {
                                debug!(target: "batch", worker = n, "收到停止信号，不再领取任务");
                                break;
                            }
                            let Ok((idx, id)) = job_rx.recv() else {
                                break;
                            };
                            let outcome = run_contained(&ctx, id);
                            if res_tx.send((idx, outcome)).is_err() {
                                break;
                            }
                        }
                    });
                if let Err(err) = spawned {
                    warn!(target: "batch", worker = n, error = %err, "无法启动工作线程");
                }
            }
        });
        drop(res_tx);

        let mut slots: Vec<Option<JobOutcome>> = vec![None; ids.len()];
        for (idx, outcome) in res_rx.try_iter() {
            slots[idx] = Some(outcome);
        }

        let mut result = BatchResult::default();
        for (slot, id) in slots.into_iter().zip(ids) {
            match slot {
                Some(outcome) => result.reports.push(outcome),
                None => result.not_started.push(*id),
            }
        }

        let summary = result.summary();
        info!(
            target: "batch",
            succeeded = summary.succeeded,
            skipped = summary.skipped,
            failed = summary.failed,
            not_started = summary.not_started,
            "批量下载结束"
        );
        Ok(result)
    }
}

/// 单曲里的 panic 只让这一首失败，不会经由 `thread::scope` 带走整批结果。
fn run_contained(ctx: &JobContext<'_>, id: TrackId) -> JobOutcome {
    match panic::catch_unwind(AssertUnwindSafe(|| TrackJob::new(id).run(ctx))) {
        Ok(outcome) => outcome,
        Err(payload) => {
            let detail = panic_payload_to_string(payload);
            error!(target: "batch", track_id = %id, "捕获到单曲 panic：{detail}；已拦截，其它歌曲继续");
            let err = JobError::Aborted(detail);
            ctx.sink.on_event(id, &JobEvent::Failed(err.clone()));
            JobOutcome {
                state: JobState::Failed(err),
                ..JobOutcome::new(id)
            }
        }
    }
}

fn panic_payload_to_string(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        return (*s).to_string();
    }
    if let Some(s) = payload.downcast_ref::<String>() {
        return s.clone();
    }
    "unknown panic payload".to_string()
}

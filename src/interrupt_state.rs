//! Ctrl+C 与批量任务之间的协作状态。
//!
//! 批量进行中第一次中断只请求"排空"：不再启动新歌曲，进行中的下载照常结束；
//! 其余情况由信号处理器直接退出进程。

use std::sync::Arc;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

static BATCH_ACTIVE: AtomicBool = AtomicBool::new(false);
static CANCEL: OnceLock<Arc<AtomicBool>> = OnceLock::new();

fn cancel_flag() -> &'static Arc<AtomicBool> {
    CANCEL.get_or_init(|| Arc::new(AtomicBool::new(false)))
}

/// 批量期间持有；drop 时结束批量状态。
pub struct BatchGuard {
    cancel: Arc<AtomicBool>,
}

impl BatchGuard {
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }
}

impl Drop for BatchGuard {
    fn drop(&mut self) {
        BATCH_ACTIVE.store(false, Ordering::SeqCst);
    }
}

pub fn begin_batch() -> BatchGuard {
    let cancel = Arc::clone(cancel_flag());
    cancel.store(false, Ordering::SeqCst);
    BATCH_ACTIVE.store(true, Ordering::SeqCst);
    BatchGuard { cancel }
}

/// 信号处理器调用。返回 `true` 表示已转为排空请求，进程应继续运行。
pub fn request_drain() -> bool {
    if !BATCH_ACTIVE.load(Ordering::SeqCst) {
        return false;
    }
    !cancel_flag().swap(true, Ordering::SeqCst)
}

//! 下载流程模块入口。
//!
//! 子模块：
//! - `models`        — 数据模型（任务状态 / 失败原因 / 批量结果）
//! - `resolver`      — 音质档位探测与去重
//! - `selection`     — 从音质列表中选择一项
//! - `transport`     — 字节流下载
//! - `tagging`       — 标签写入
//! - `progress`      — 进度上报与 CLI 进度条
//! - `job`           — 单曲状态机
//! - `orchestrator`  — 批量工作池

pub mod job;
pub mod models;
pub mod orchestrator;
pub mod progress;
pub mod resolver;
pub mod selection;
pub mod tagging;
pub mod transport;

#[cfg(test)]
pub(crate) mod test_support;

pub use job::{JobContext, OfferChooser};
pub use models::{BatchResult, SelectionMode};
pub use orchestrator::Orchestrator;
pub use progress::{ConsoleReporter, ReportMode};

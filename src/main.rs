//! 网易云音乐下载器 Rust 实现。
//!
//! 本 crate 负责：配置加载、输入识别、音质探测与选择、并发下载、标签写入。
//!
//! 代码结构（读代码入口）：
//! - `base_system`：配置/日志/Cookie/路径等基础设施
//! - `catalog`：曲库接口（元数据、音质探测、歌词、歌单）
//! - `download`：单曲状态机与批量工作池
//! - `ui`：无 UI 的命令行交互
//! - `interrupt_state`：Ctrl+C 与批量下载的协作状态

use std::path::Path;

use anyhow::{Result, anyhow};
use clap::Parser;

mod base_system;
mod catalog;
mod download;
mod interrupt_state;
mod ui;

use base_system::config::{ConfigSpec, load_or_create};
use base_system::context::Config;
use base_system::logging::{LogOptions, LogSystem};
use catalog::AccountLevel;
use tracing::info;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Parser)]
#[command(name = "netease-music-downloader")]
#[command(about = "NetEase Cloud Music downloader")]
struct Cli {
    /// 启用调试日志输出
    #[arg(long, default_value_t = false)]
    debug: bool,

    /// 显示版本信息后退出
    #[arg(long, default_value_t = false)]
    version: bool,

    /// 数据目录路径（用于存放 config.yml、cookie 和 logs 等文件）
    #[arg(long)]
    data_dir: Option<String>,

    /// 账号身份（svip / vip / free），覆盖配置文件
    #[arg(long)]
    level: Option<AccountLevel>,

    /// 并发下载线程数，覆盖配置文件
    #[arg(long)]
    workers: Option<usize>,

    /// 保存路径，覆盖配置文件
    #[arg(long)]
    save_path: Option<String>,

    /// 歌曲/歌单 ID 或链接；给出时直接批量下载（自动最高音质）后退出
    inputs: Vec<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.version {
        println!("NetEase Music Downloader v{}", VERSION);
        return Ok(());
    }

    let data_dir = cli.data_dir.as_deref().map(Path::new);
    let _log = init_logging(cli.debug, data_dir)?;
    info!(target: "startup", "当前版本: v{}", VERSION);

    let mut config =
        load_or_create::<Config>(None, data_dir).map_err(|e| anyhow!(e.to_string()))?;
    config.set_data_dir(data_dir);
    apply_overrides(&mut config, &cli)?;

    if cli.inputs.is_empty() {
        ui::noui::run(&config)
    } else {
        ui::noui::run_unattended(&config, &cli.inputs)
    }
}

fn apply_overrides(config: &mut Config, cli: &Cli) -> Result<()> {
    if let Some(level) = cli.level {
        config.account_level = level.name().to_string();
    }
    if let Some(workers) = cli.workers {
        config.max_workers = workers;
    }
    if let Some(path) = cli.save_path.as_deref() {
        config.save_path = path.to_string();
    }
    config.validate().map_err(|e| anyhow!(e))
}

fn init_logging(debug: bool, base_dir: Option<&Path>) -> Result<LogSystem> {
    let opts = LogOptions {
        debug,
        use_color: true,
        archive_on_exit: true,
        // 终端留给进度输出；调试时才同时打印日志
        console: debug,
    };
    LogSystem::init_with_base(opts, base_dir).map_err(|e| anyhow!(e))
}

//! 无 UI 交互入口。
//!
//! 使用标准输入输出：交互式逐条输入，或命令行一次性批量下载。

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result, bail};
use tracing::info;

use crate::base_system::context::Config;
use crate::catalog::{AccountLevel, TrackId};

mod download;
mod picker;

use download::{Resolved, Session};

const BANNER_RULE: &str = "============================================================";

fn strategy_level(config: &Config, interactive: bool) -> Result<AccountLevel> {
    let configured = config
        .account_level()
        .map_err(anyhow::Error::msg)
        .context("account_level 配置无效")?;
    match configured {
        Some(level) => Ok(level),
        None if interactive => picker::prompt_account_level(),
        None => Ok(AccountLevel::Svip),
    }
}

pub fn run(config: &Config) -> Result<()> {
    println!("{BANNER_RULE}");
    println!("网易云音乐下载助手 v{}", env!("CARGO_PKG_VERSION"));
    println!("特性: 音质自动探测 | 歌单自选多线程");
    println!("{BANNER_RULE}");

    let level = strategy_level(config, true)?;
    info!(target: "ui", ?level, "账号身份");
    println!("{}", "-".repeat(60));
    let session = Session::new(config, level.strategy())?;

    loop {
        let raw = read_line("\n> 请输入 歌曲ID / 歌单链接 (q退出): ")?;
        let text = raw.trim();
        if text.is_empty() {
            continue;
        }
        if text.eq_ignore_ascii_case("q") {
            println!("已退出。");
            break;
        }

        let outcome = session.identify(text).and_then(|target| match target {
            Some(Resolved::Track(id)) => session.download_song(id),
            Some(Resolved::Playlist(playlist)) => session.download_playlist(&playlist),
            None => {
                println!("[警告] 无法识别");
                Ok(())
            }
        });
        if let Err(err) = outcome {
            println!("[错误] {err:#}");
        }
    }

    Ok(())
}

/// 命令行批量：解析全部输入（歌单按顺序展开、重复歌曲只保留一次），自动最高音质。
/// 有歌曲失败时返回错误，进程以非零状态退出。
pub fn run_unattended(config: &Config, inputs: &[String]) -> Result<()> {
    let level = strategy_level(config, false)?;
    let session = Session::new(config, level.strategy())?;

    let mut ids: Vec<TrackId> = Vec::new();
    for input in inputs {
        match session.identify(input)? {
            Some(Resolved::Track(id)) => ids.push(id),
            Some(Resolved::Playlist(playlist)) => {
                println!("[歌单] {} (共 {} 首)", playlist.name, playlist.track_ids.len());
                ids.extend(playlist.track_ids);
            }
            None => bail!("无法识别的输入: {input}"),
        }
    }
    let mut seen = std::collections::HashSet::new();
    ids.retain(|id| seen.insert(*id));
    if ids.is_empty() {
        bail!("没有可下载的歌曲");
    }

    let result = session.run_auto_batch(&ids)?;
    if result.has_failures() {
        bail!("{} 首歌曲下载失败", result.summary().failed);
    }
    Ok(())
}

fn read_line(prompt: &str) -> Result<String> {
    print!("{}", prompt);
    io::stdout().flush().ok();
    let stdin = io::stdin();
    let mut line = String::new();
    let n = stdin.lock().read_line(&mut line)?;
    if n == 0 {
        bail!("输入已结束");
    }
    Ok(line)
}

//! 交互选择：账号身份、音质、歌单序号。

use std::collections::BTreeSet;

use anyhow::Result;

use crate::catalog::{AccountLevel, Offer, TrackMetadata};
use crate::download::OfferChooser;
use crate::download::progress::render_offer_table;

const CHOICE_ATTEMPTS: usize = 3;

pub(super) fn prompt_account_level() -> Result<AccountLevel> {
    println!("{}", "-".repeat(60));
    println!("请选择你的账号身份 (决定下载音质上限):");
    println!("1. 黑胶 SVIP  [尝试: 母带 -> 臻音 -> 无损...]");
    println!("2. 黑胶 VIP   [尝试: 臻音 -> HiRes -> 无损...]");
    println!("3. 普通用户   [尝试: 极高(MP3) -> 标准...]");
    println!("{}", "-".repeat(60));
    loop {
        let choice = super::read_line("> 请输入序号 (1/2/3): ")?;
        let choice = choice.trim();
        if matches!(choice, "1" | "2" | "3")
            && let Ok(level) = choice.parse()
        {
            return Ok(level);
        }
    }
}

/// 解析 `1, 3-5, 10` 或 `all`，返回 0 起的序号。越界部分截断，无法解析的片段忽略。
pub(super) fn parse_indexes(input: &str, max: usize) -> BTreeSet<usize> {
    let input = input.trim();
    if input.eq_ignore_ascii_case("all") {
        return (0..max).collect();
    }

    let mut out = BTreeSet::new();
    for part in input.replace('，', ",").split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        if let Some((a, b)) = part.split_once('-') {
            let (Ok(start), Ok(end)) = (a.trim().parse::<usize>(), b.trim().parse::<usize>())
            else {
                continue;
            };
            let start = start.max(1);
            let end = end.min(max);
            if start <= end {
                out.extend((start - 1)..end);
            }
        } else if let Ok(idx) = part.parse::<usize>()
            && (1..=max).contains(&idx)
        {
            out.insert(idx - 1);
        }
    }
    out
}

/// 在终端展示音质菜单并读取序号。
///
/// 非法输入会重新询问；连续多次非法时把最后一次输入交给选择逻辑判定。
pub(super) struct StdinChooser;

impl OfferChooser for StdinChooser {
    fn choose(&self, _track: &TrackMetadata, offers: &[Offer]) -> Option<i64> {
        println!("{}", render_offer_table(offers));
        let mut last = None;
        for _ in 0..CHOICE_ATTEMPTS {
            let Ok(line) = super::read_line("序号 (默认1): ") else {
                return None;
            };
            match parse_choice(&line) {
                None => return None,
                Some(idx) if idx >= 1 && idx as u64 <= offers.len() as u64 => return Some(idx),
                Some(idx) => {
                    println!("请输入 1 到 {} 之间的数字", offers.len());
                    last = Some(idx);
                }
            }
        }
        last
    }
}

/// 空行为 `None`；无法解析的输入记为 0（必然越界）。
fn parse_choice(line: &str) -> Option<i64> {
    let text = line.trim();
    if text.is_empty() {
        return None;
    }
    Some(text.parse().unwrap_or(0))
}

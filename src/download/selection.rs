//! 从解析出的音质列表里选出一个。纯函数，不做任何 I/O。

use thiserror::Error;

use super::models::{JobError, SelectionMode};
use crate::catalog::Offer;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectError {
    #[error("no offers")]
    NoOffers,
    #[error("choice {index} out of range 1..={available}")]
    InvalidChoice { index: i64, available: usize },
}

impl From<SelectError> for JobError {
    fn from(value: SelectError) -> Self {
        match value {
            SelectError::NoOffers => JobError::NoOffers,
            SelectError::InvalidChoice { index, available } => {
                JobError::InvalidChoice { index, available }
            }
        }
    }
}

/// `choice` 是 1 起的序号；交互模式下 `None` 等同于 1（直接回车）。自动模式忽略它。
pub fn select(
    offers: &[Offer],
    mode: SelectionMode,
    choice: Option<i64>,
) -> Result<&Offer, SelectError> {
    if offers.is_empty() {
        return Err(SelectError::NoOffers);
    }
    match mode {
        SelectionMode::AutoBest => Ok(&offers[0]),
        SelectionMode::Interactive => {
            let index = choice.unwrap_or(1);
            if index < 1 || index as u64 > offers.len() as u64 {
                return Err(SelectError::InvalidChoice {
                    index,
                    available: offers.len(),
                });
            }
            Ok(&offers[(index - 1) as usize])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Tier;

    fn offer(tier: Tier, size: u64) -> Offer {
        Offer {
            requested: tier,
            delivered: tier,
            size,
            extension: "flac".into(),
            url: format!("http://cdn/{size}"),
        }
    }

    #[test]
    fn empty_list_is_no_offers_in_both_modes() {
        assert_eq!(
            select(&[], SelectionMode::AutoBest, None),
            Err(SelectError::NoOffers)
        );
        assert_eq!(
            select(&[], SelectionMode::Interactive, Some(1)),
            Err(SelectError::NoOffers)
        );
    }

    #[test]
    fn auto_takes_first_and_ignores_choice() {
        let offers = vec![offer(Tier::HiRes, 3), offer(Tier::High, 2)];
        let chosen = select(&offers, SelectionMode::AutoBest, Some(2)).unwrap();
        assert_eq!(chosen.size, 3);
    }

    #[test]
    fn interactive_default_is_first() {
        let offers = vec![offer(Tier::HiRes, 3), offer(Tier::High, 2)];
        assert_eq!(
            select(&offers, SelectionMode::Interactive, None).unwrap().size,
            3
        );
        assert_eq!(
            select(&offers, SelectionMode::Interactive, Some(2)).unwrap().size,
            2
        );
    }

    #[test]
    fn interactive_rejects_out_of_range() {
        let offers = vec![offer(Tier::HiRes, 3), offer(Tier::High, 2)];
        for bad in [0, -1, 3, i64::MAX] {
            assert_eq!(
                select(&offers, SelectionMode::Interactive, Some(bad)),
                Err(SelectError::InvalidChoice {
                    index: bad,
                    available: 2
                })
            );
        }
    }

    #[test]
    fn converts_into_job_error() {
        let err: JobError = SelectError::InvalidChoice {
            index: 0,
            available: 1,
        }
        .into();
        assert_eq!(
            err,
            JobError::InvalidChoice {
                index: 0,
                available: 1
            }
        );
    }
}

//! 音质探测：按策略逐档请求，去掉无效与重复的结果。

use std::collections::HashSet;

use tracing::debug;

use crate::catalog::{Catalog, Offer, Strategy, Tier, TrackId};

/// 同一首歌里已经出现过的物理资源。
///
/// 服务端降级时会把同一个文件挂在不同档位下，有时连 level 也改写；
/// 因此除了 `(delivered, size)` 之外，字节数相同也视为同一资源。
#[derive(Default)]
struct SeenOffers {
    pairs: HashSet<(Tier, u64)>,
    sizes: HashSet<u64>,
}

impl SeenOffers {
    /// 首次出现返回 `true` 并记录。
    fn insert(&mut self, offer: &Offer) -> bool {
        if self.pairs.contains(&(offer.delivered, offer.size)) || self.sizes.contains(&offer.size)
        {
            return false;
        }
        self.pairs.insert((offer.delivered, offer.size));
        self.sizes.insert(offer.size);
        true
    }
}

pub struct QualityResolver<'a> {
    catalog: &'a dyn Catalog,
}

impl<'a> QualityResolver<'a> {
    pub fn new(catalog: &'a dyn Catalog) -> Self {
        Self { catalog }
    }

    /// 结果按首次发现顺序排列（即策略顺序），可能为空。每个档位只探测一次，
    /// 单档失败不影响后续档位。
    pub fn resolve(&self, id: TrackId, strategy: &Strategy) -> Vec<Offer> {
        let mut seen = SeenOffers::default();
        let mut offers = Vec::new();

        for &tier in strategy.tiers() {
            let offer = match self.catalog.fetch_quality_offer(id, tier) {
                Ok(Some(offer)) => offer,
                Ok(None) => {
                    debug!(target: "resolver", track_id = %id, %tier, "档位无数据");
                    continue;
                }
                Err(err) => {
                    debug!(target: "resolver", track_id = %id, %tier, error = %err, "档位探测失败");
                    continue;
                }
            };

            if !offer.is_deliverable() {
                debug!(target: "resolver", track_id = %id, %tier, "档位不可获取");
                continue;
            }
            if !seen.insert(&offer) {
                debug!(
                    target: "resolver",
                    track_id = %id,
                    %tier,
                    delivered = %offer.delivered,
                    bytes = offer.size,
                    "重复资源，已忽略"
                );
                continue;
            }
            offers.push(offer);
        }

        debug!(target: "resolver", track_id = %id, count = offers.len(), "探测完成");
        offers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::test_support::{FakeCatalog, Probe};

    fn strategy(tiers: &[Tier]) -> Strategy {
        Strategy::new(tiers.to_vec())
    }

    #[test]
    fn relabelled_asset_collapses_to_first_discovery() {
        let catalog = FakeCatalog::default()
            .with_probe(1, Tier::HiRes, Probe::Absent)
            .with_probe(1, Tier::Lossless, Probe::offer(Tier::Lossless, 30_000_000, "flac"))
            .with_probe(1, Tier::Standard, Probe::offer(Tier::Standard, 30_000_000, "flac"));

        let offers = QualityResolver::new(&catalog).resolve(
            TrackId(1),
            &strategy(&[Tier::HiRes, Tier::Lossless, Tier::Standard]),
        );

        assert_eq!(offers.len(), 1);
        assert_eq!(offers[0].requested, Tier::Lossless);
        assert_eq!(offers[0].delivered, Tier::Lossless);
        assert_eq!(offers[0].size, 30_000_000);
    }

    #[test]
    fn all_absent_is_empty_not_error() {
        let catalog = FakeCatalog::default();
        let offers = QualityResolver::new(&catalog)
            .resolve(TrackId(9), &strategy(&[Tier::Master, Tier::High]));
        assert!(offers.is_empty());
    }

    #[test]
    fn failures_and_zero_size_do_not_stop_the_scan() {
        let catalog = FakeCatalog::default()
            .with_probe(2, Tier::Master, Probe::Error)
            .with_probe(2, Tier::HiRes, Probe::offer(Tier::HiRes, 0, "flac"))
            .with_probe(2, Tier::Lossless, Probe::offer(Tier::Lossless, 20, "flac"))
            .with_probe(2, Tier::High, Probe::offer(Tier::High, 10, "mp3"));

        let offers = QualityResolver::new(&catalog).resolve(
            TrackId(2),
            &strategy(&[Tier::Master, Tier::HiRes, Tier::Lossless, Tier::High]),
        );

        let sizes: Vec<u64> = offers.iter().map(|o| o.size).collect();
        assert_eq!(sizes, vec![20, 10]);
        assert!(offers.iter().all(|o| o.size > 0));
    }

    #[test]
    fn order_follows_requests_not_delivered_rank() {
        // 请求 HiRes 却给了 High；随后请求 Lossless 给了真正的 Lossless。
        let catalog = FakeCatalog::default()
            .with_probe(3, Tier::HiRes, Probe::offer(Tier::High, 5, "mp3"))
            .with_probe(3, Tier::Lossless, Probe::offer(Tier::Lossless, 50, "flac"));

        let offers = QualityResolver::new(&catalog)
            .resolve(TrackId(3), &strategy(&[Tier::HiRes, Tier::Lossless]));

        assert_eq!(offers[0].delivered, Tier::High);
        assert_eq!(offers[1].delivered, Tier::Lossless);
    }

    #[test]
    fn each_tier_is_probed_once() {
        let catalog = FakeCatalog::default()
            .with_probe(4, Tier::High, Probe::offer(Tier::High, 7, "mp3"));
        let _ = QualityResolver::new(&catalog).resolve(
            TrackId(4),
            &strategy(&[Tier::High, Tier::Standard, Tier::High]),
        );
        assert_eq!(catalog.probe_count(TrackId(4), Tier::High), 1);
        assert_eq!(catalog.probe_count(TrackId(4), Tier::Standard), 1);
    }

    #[test]
    fn no_two_offers_share_delivered_and_size() {
        let catalog = FakeCatalog::default()
            .with_probe(5, Tier::Master, Probe::offer(Tier::Lossless, 40, "flac"))
            .with_probe(5, Tier::Supreme, Probe::offer(Tier::Lossless, 40, "flac"))
            .with_probe(5, Tier::HiRes, Probe::offer(Tier::HiRes, 41, "flac"));

        let offers = QualityResolver::new(&catalog).resolve(
            TrackId(5),
            &strategy(&[Tier::Master, Tier::Supreme, Tier::HiRes]),
        );
        assert_eq!(offers.len(), 2);
        assert_eq!(offers[0].requested, Tier::Master);
    }
}

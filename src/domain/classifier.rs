//! Priority Classifier
//!
//! Maps a pair's sale history to an update-frequency tier. Items that sell
//! often land in low-numbered tiers and get polled frequently; items with too
//! few recorded sales are parked in the never-sold tier.

use serde::{Deserialize, Serialize};

use super::market::MarketHistory;
use super::pair::{PairState, Tier};

/// One row of the interval-to-tier table: sale intervals strictly below
/// `max_interval_secs` map to `tier`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierBound {
    pub max_interval_secs: u64,
    pub tier: Tier,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Histories shorter than this are classified never-sold.
    pub minimum_sales: usize,
    /// Cap on consecutive-sale deltas considered per pair; bounds the cost on
    /// high-volume items and ignores out-of-date sales.
    pub max_deltas: usize,
    /// Evaluated in ascending interval order; the first bound exceeding the
    /// average interval wins.
    pub tier_bounds: Vec<TierBound>,
    /// Fallback when no bound matches.
    pub default_tier: Tier,
    /// Tier assigned alongside the never-sold state.
    pub never_sold_tier: Tier,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            minimum_sales: 5,
            max_deltas: 100,
            tier_bounds: vec![
                TierBound { max_interval_secs: 3_600, tier: 1 },
                TierBound { max_interval_secs: 10_800, tier: 2 },
                TierBound { max_interval_secs: 21_600, tier: 3 },
                TierBound { max_interval_secs: 43_200, tier: 4 },
                TierBound { max_interval_secs: 86_400, tier: 5 },
                TierBound { max_interval_secs: 259_200, tier: 6 },
                TierBound { max_interval_secs: 604_800, tier: 7 },
            ],
            default_tier: 8,
            never_sold_tier: 10,
        }
    }
}

/// Outcome of classifying one pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub state: PairState,
    pub tier: Tier,
    /// Average seconds between consecutive sales, when computed.
    pub average_interval: Option<u64>,
}

/// Classify a pair from its sale history, newest-first.
///
/// The most recent entry is only an anchor for the first delta and is never
/// measured itself. Deltas are taken between consecutive purchases walking
/// into the past, capped at `max_deltas`.
pub fn classify(history: &[MarketHistory], cfg: &ClassifierConfig) -> Classification {
    if history.len() < cfg.minimum_sales {
        return Classification {
            state: PairState::NeverSold,
            tier: cfg.never_sold_tier,
            average_interval: None,
        };
    }

    let mut last_date = history[0].purchase_date;
    let mut sum: u64 = 0;
    let mut count: u64 = 0;

    for entry in history.iter().skip(1).take(cfg.max_deltas) {
        sum += last_date.saturating_sub(entry.purchase_date);
        last_date = entry.purchase_date;
        count += 1;
    }

    // minimum_sales >= 2 is enforced by config validation, so count > 0 here
    let average = sum / count.max(1);

    let tier = cfg
        .tier_bounds
        .iter()
        .find(|bound| average < bound.max_interval_secs)
        .map(|bound| bound.tier)
        .unwrap_or(cfg.default_tier);

    Classification {
        state: PairState::Updating,
        tier,
        average_interval: Some(average),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market::{MarketHistory, SaleObservation};

    fn cfg() -> ClassifierConfig {
        ClassifierConfig {
            minimum_sales: 5,
            max_deltas: 100,
            tier_bounds: vec![
                TierBound { max_interval_secs: 3_600, tier: 1 },
                TierBound { max_interval_secs: 86_400, tier: 2 },
                TierBound { max_interval_secs: 259_200, tier: 3 },
            ],
            default_tier: 8,
            never_sold_tier: 10,
        }
    }

    /// Newest-first history with a fixed gap between consecutive sales.
    fn history_with_interval(len: usize, interval: u64) -> Vec<MarketHistory> {
        (0..len)
            .map(|i| {
                let obs = SaleObservation {
                    sell_price: 100,
                    stack_size: 1,
                    hq: false,
                    purchase_date: 1_000_000u64.wrapping_sub(i as u64 * interval),
                    buyer_name: String::new(),
                };
                MarketHistory::from_observation(44, &obs, None)
            })
            .collect()
    }

    #[test]
    fn average_interval_5000_maps_to_tier_2() {
        let result = classify(&history_with_interval(10, 5_000), &cfg());
        assert_eq!(result.state, PairState::Updating);
        assert_eq!(result.tier, 2);
        assert_eq!(result.average_interval, Some(5_000));
    }

    #[test]
    fn average_interval_1000_maps_to_tier_1() {
        let result = classify(&history_with_interval(10, 1_000), &cfg());
        assert_eq!(result.tier, 1);
    }

    #[test]
    fn interval_above_every_bound_falls_back_to_default() {
        let result = classify(&history_with_interval(10, 400_000), &cfg());
        assert_eq!(result.state, PairState::Updating);
        assert_eq!(result.tier, 8);
    }

    #[test]
    fn short_history_is_never_sold_regardless_of_interval() {
        let result = classify(&history_with_interval(2, 100), &cfg());
        assert_eq!(result.state, PairState::NeverSold);
        assert_eq!(result.tier, 10);
        assert_eq!(result.average_interval, None);
    }

    #[test]
    fn empty_history_is_never_sold() {
        let result = classify(&[], &cfg());
        assert_eq!(result.state, PairState::NeverSold);
    }

    #[test]
    fn anchor_entry_is_not_measured() {
        // First entry sits far away from the rest; it only anchors the first
        // delta, so the huge gap counts once and the average stays bounded.
        let mut history = history_with_interval(5, 1_000);
        history.insert(
            0,
            MarketHistory::from_observation(
                44,
                &SaleObservation {
                    sell_price: 100,
                    stack_size: 1,
                    hq: false,
                    purchase_date: 2_000_000,
                    buyer_name: String::new(),
                },
                None,
            ),
        );

        let result = classify(&history, &cfg());
        // deltas: 1_000_000 (anchor gap) + 4 * 1_000, averaged over 5
        assert_eq!(result.average_interval, Some(200_800));
        assert_eq!(result.tier, 3);
    }

    #[test]
    fn delta_count_is_capped() {
        let mut small = cfg();
        small.max_deltas = 3;

        // Three recent fast sales, then a long tail of slow ones that the cap
        // must keep out of the average.
        let mut history = history_with_interval(4, 100);
        let oldest = history.last().unwrap().purchase_date;
        for i in 0..50 {
            let obs = SaleObservation {
                sell_price: 100,
                stack_size: 1,
                hq: false,
                purchase_date: oldest.wrapping_sub((i + 1) * 500_000),
                buyer_name: String::new(),
            };
            history.push(MarketHistory::from_observation(44, &obs, None));
        }

        let result = classify(&history, &small);
        assert_eq!(result.average_interval, Some(100));
        assert_eq!(result.tier, 1);
    }

    #[test]
    fn boundary_interval_is_exclusive() {
        // An average exactly on a bound belongs to the next tier up.
        let result = classify(&history_with_interval(10, 3_600), &cfg());
        assert_eq!(result.tier, 2);
    }
}

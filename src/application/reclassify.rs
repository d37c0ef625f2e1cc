//! Reclassification Job
//!
//! Periodic pass that rewrites every tracked pair's tier from its observed
//! sale cadence and mirrors the result into the fast-lookup cache. Reads
//! history only; never races the runner's listing writes.

use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use thiserror::Error;

use crate::domain::classifier::{classify, ClassifierConfig};
use crate::domain::pair::PairState;
use crate::ports::repository::{PairRepositoryPort, RepositoryError};
use crate::ports::store::{MarketStorePort, PriorityCachePort, StoreError};

#[derive(Debug, Error)]
pub enum ReclassifyError {
    #[error("pair repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Outcome counts of one reclassification pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReclassifySummary {
    pub examined: usize,
    pub updating: usize,
    pub never_sold: usize,
    pub sourced_skipped: usize,
}

pub struct ReclassifyJob {
    pairs: Arc<dyn PairRepositoryPort>,
    store: Arc<dyn MarketStorePort>,
    cache: Arc<dyn PriorityCachePort>,
    config: ClassifierConfig,
}

impl ReclassifyJob {
    pub fn new(
        pairs: Arc<dyn PairRepositoryPort>,
        store: Arc<dyn MarketStorePort>,
        cache: Arc<dyn PriorityCachePort>,
        config: ClassifierConfig,
    ) -> Self {
        Self {
            pairs,
            store,
            cache,
            config,
        }
    }

    /// Reclassify every non-sourced pair. Idempotent; safe against a stale
    /// snapshot because it only reads history and rewrites state/tier.
    pub async fn run(&self) -> Result<ReclassifySummary, ReclassifyError> {
        let started = Instant::now();
        let now = unix_now();
        let all = self.pairs.all_pairs().await?;

        tracing::info!(pairs = all.len(), "starting reclassification pass");

        let mut summary = ReclassifySummary {
            examined: all.len(),
            ..Default::default()
        };

        for pair in &all {
            if pair.state == PairState::Sourced {
                summary.sourced_skipped += 1;
                continue;
            }

            let document = self.store.get(pair.server, pair.item).await?;
            let result = classify(&document.history, &self.config);

            match result.state {
                PairState::NeverSold => summary.never_sold += 1,
                _ => summary.updating += 1,
            }

            self.pairs
                .save_classification(pair.id, result.state, result.tier, now)
                .await?;
            self.cache.put(pair.server, pair.item, result.tier).await?;

            tracing::debug!(
                item = pair.item,
                server = pair.server,
                tier = result.tier,
                state = ?result.state,
                average_interval = ?result.average_interval,
                "pair reclassified"
            );
        }

        tracing::info!(
            examined = summary.examined,
            updating = summary.updating,
            never_sold = summary.never_sold,
            sourced = summary.sourced_skipped,
            duration_ms = started.elapsed().as_millis() as u64,
            "reclassification pass complete"
        );

        Ok(summary)
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

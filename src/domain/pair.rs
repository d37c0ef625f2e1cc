//! Tracked Pairs
//!
//! A tracked pair is one (server, item) identity polled for market data. Its
//! state decides whether it is polled at all, its tier decides how often.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::market::{ItemId, ServerId};

/// Update-frequency bucket. Lower numbers poll more often.
pub type Tier = u8;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PairError {
    #[error("pair {server}/{item} is vendor-sourced and cannot carry an override tier")]
    SourcedPair { server: ServerId, item: ItemId },
}

/// Polling state of a tracked pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PairState {
    /// Obtainable from an in-game vendor; permanently excluded from polling.
    Sourced,
    /// Actively polled on its tier schedule.
    Updating,
    /// Fewer recorded sales than the classifier minimum; polled at the
    /// never-sold cadence until sales appear.
    NeverSold,
}

impl PairState {
    pub fn is_polled(&self) -> bool {
        !matches!(self, PairState::Sourced)
    }
}

/// One (server, item) pair tracked for market polling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedPair {
    pub id: u64,
    pub server: ServerId,
    pub item: ItemId,
    pub state: PairState,
    pub tier: Tier,
    /// One-shot override; takes precedence over `tier` for exactly one run,
    /// cleared by the runner's batched timestamp write.
    pub patreon_override_tier: Option<Tier>,
    /// Unix time of the last successful poll.
    pub updated_at: u64,
}

impl TrackedPair {
    /// Create a pair for a newly market-eligible item. Vendor-sourced items
    /// are recorded but never polled; everything else starts on the reserved
    /// new-item tier.
    pub fn new(
        id: u64,
        server: ServerId,
        item: ItemId,
        vendor_sourced: bool,
        new_item_tier: Tier,
    ) -> Self {
        let (state, tier) = if vendor_sourced {
            (PairState::Sourced, 0)
        } else {
            (PairState::Updating, new_item_tier)
        };

        Self {
            id,
            server,
            item,
            state,
            tier,
            patreon_override_tier: None,
            updated_at: 0,
        }
    }

    /// Tier the scheduler should use for the next run.
    pub fn effective_tier(&self) -> Tier {
        self.patreon_override_tier.unwrap_or(self.tier)
    }

    /// Apply a reclassification result. Sourced pairs never transition out.
    pub fn reclassify(&mut self, state: PairState, tier: Tier, now: u64) {
        if self.state == PairState::Sourced {
            return;
        }
        self.state = state;
        self.tier = tier;
        self.updated_at = now;
    }

    /// Attach a one-shot override tier without touching the steady-state tier.
    pub fn attach_override(&mut self, tier: Tier) -> Result<(), PairError> {
        if self.state == PairState::Sourced {
            return Err(PairError::SourcedPair {
                server: self.server,
                item: self.item,
            });
        }
        self.patreon_override_tier = Some(tier);
        Ok(())
    }

    /// Record a successful poll: advance the timestamp and burn the override.
    pub fn mark_updated(&mut self, now: u64) {
        self.updated_at = now;
        self.patreon_override_tier = None;
    }
}

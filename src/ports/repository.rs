//! Repository Ports
//!
//! Boundary traits backed by the relational side: the tracked-pair table
//! (due-pair query, batched timestamp writes, tier rewrites), the token
//! table, and the lazily-populated name-identity table.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::market::{ItemId, ServerId};
use crate::domain::pair::{PairState, Tier, TrackedPair};
use crate::domain::token_pool::AuthToken;

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("query failed: {0}")]
    QueryFailed(String),

    #[error("pair not found: {server}/{item}")]
    PairNotFound { server: ServerId, item: ItemId },
}

/// One row of the due-pair query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DuePair {
    pub id: u64,
    pub server: ServerId,
    pub item: ItemId,
}

/// The tracked-pair table.
#[async_trait]
pub trait PairRepositoryPort: Send + Sync {
    /// Up to `limit` pairs whose steady-state tier or one-shot override
    /// matches `tier`, ordered by staleness (oldest `updated_at` first).
    async fn due_pairs(&self, tier: Tier, limit: usize) -> Result<Vec<DuePair>, RepositoryError>;

    /// Batched post-run write: set `updated_at = now` and clear any override
    /// for every listed pair id.
    async fn mark_updated(&self, ids: &[u64], now: u64) -> Result<(), RepositoryError>;

    /// Classifier write: rewrite state and tier, stamp `updated_at`.
    async fn save_classification(
        &self,
        id: u64,
        state: PairState,
        tier: Tier,
        now: u64,
    ) -> Result<(), RepositoryError>;

    /// Attach a one-shot override tier to every pair carrying `item` on any
    /// of the listed servers. Vendor-sourced pairs are left untouched.
    async fn attach_override(
        &self,
        item: ItemId,
        servers: &[ServerId],
        tier: Tier,
    ) -> Result<usize, RepositoryError>;

    /// Full snapshot for the reclassification pass.
    async fn all_pairs(&self) -> Result<Vec<TrackedPair>, RepositoryError>;

    async fn insert(&self, pair: TrackedPair) -> Result<(), RepositoryError>;
}

/// The authentication token table. Refreshed by an external token-management
/// process; the scheduler only reads.
#[async_trait]
pub trait TokenSourcePort: Send + Sync {
    async fn online_tokens(&self) -> Result<Vec<AuthToken>, RepositoryError>;
}

/// Lazily-populated (name, server) to internal-id mapping for retainers and
/// characters. `resolve` is a single lookup-or-create, cheap enough to call
/// per listing row inside the merge step.
#[async_trait]
pub trait NameRegistryPort: Send + Sync {
    /// Returns `None` for empty names; otherwise the existing or freshly
    /// created internal id.
    async fn resolve(
        &self,
        server: ServerId,
        name: &str,
    ) -> Result<Option<String>, RepositoryError>;
}

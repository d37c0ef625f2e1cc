//! Storage Ports
//!
//! Boundary traits for the market document store and the fast tier-lookup
//! cache. Both are external collaborators; the scheduler only sees these
//! contracts.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::market::{ItemId, MarketDocument, ServerId};
use crate::domain::pair::Tier;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("document store unavailable: {0}")]
    Unavailable(String),

    #[error("write failed for {server}/{item}: {reason}")]
    WriteFailed {
        server: ServerId,
        item: ItemId,
        reason: String,
    },
}

/// Keyed store mapping (server, item) to a market document.
#[async_trait]
pub trait MarketStorePort: Send + Sync {
    /// Fetch the document, creating an empty one if absent.
    async fn get(&self, server: ServerId, item: ItemId) -> Result<MarketDocument, StoreError>;

    /// Full replace.
    async fn set(&self, document: MarketDocument) -> Result<(), StoreError>;
}

/// Fast-lookup mirror of each pair's current tier. Consumers must treat an
/// absent entry as the configured default tier rather than blocking on the
/// classifier.
#[async_trait]
pub trait PriorityCachePort: Send + Sync {
    async fn put(&self, server: ServerId, item: ItemId, tier: Tier) -> Result<(), StoreError>;

    async fn get(&self, server: ServerId, item: ItemId) -> Result<Option<Tier>, StoreError>;
}

//! In-memory market document store and tier cache.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::market::{ItemId, MarketDocument, ServerId};
use crate::domain::pair::Tier;
use crate::ports::store::{MarketStorePort, PriorityCachePort, StoreError};

/// Keyed document store over a mutex-guarded map. Locks are held only for
/// the copy in/out, never across an await.
#[derive(Debug, Default)]
pub struct MemoryMarketStore {
    documents: Mutex<HashMap<(ServerId, ItemId), MarketDocument>>,
}

impl MemoryMarketStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn document_count(&self) -> usize {
        self.documents.lock().unwrap().len()
    }
}

#[async_trait]
impl MarketStorePort for MemoryMarketStore {
    async fn get(&self, server: ServerId, item: ItemId) -> Result<MarketDocument, StoreError> {
        let mut docs = self.documents.lock().unwrap();
        Ok(docs
            .entry((server, item))
            .or_insert_with(|| MarketDocument::new(server, item))
            .clone())
    }

    async fn set(&self, document: MarketDocument) -> Result<(), StoreError> {
        let mut docs = self.documents.lock().unwrap();
        docs.insert((document.server, document.item), document);
        Ok(())
    }
}

/// Tier mirror with fail-open reads: callers apply their configured default
/// when `get` returns `None`.
#[derive(Debug, Default)]
pub struct MemoryPriorityCache {
    tiers: Mutex<HashMap<(ServerId, ItemId), Tier>>,
}

impl MemoryPriorityCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PriorityCachePort for MemoryPriorityCache {
    async fn put(&self, server: ServerId, item: ItemId, tier: Tier) -> Result<(), StoreError> {
        self.tiers.lock().unwrap().insert((server, item), tier);
        Ok(())
    }

    async fn get(&self, server: ServerId, item: ItemId) -> Result<Option<Tier>, StoreError> {
        Ok(self.tiers.lock().unwrap().get(&(server, item)).copied())
    }
}

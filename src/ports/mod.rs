//! Ports Layer - trait boundaries to external collaborators
//!
//! Everything the scheduler touches outside its own process sits behind one
//! of these traits: the market API, the document store, the relational pair
//! and token tables, the name registry, and the tier cache.

pub mod market_api;
pub mod mocks;
pub mod repository;
pub mod store;

pub use market_api::{
    ApiResponse, HistoryPayload, ListingsPayload, MarketApiError, MarketApiPort,
};
pub use repository::{
    DuePair, NameRegistryPort, PairRepositoryPort, RepositoryError, TokenSourcePort,
};
pub use store::{MarketStorePort, PriorityCachePort, StoreError};

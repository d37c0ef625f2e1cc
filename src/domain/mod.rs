//! Domain Layer - core market synchronization logic
//!
//! Pure types and policy with no I/O. External interactions happen through
//! the ports layer.
//!
//! - `pair`: tracked (server, item) pairs and their polling state machine
//! - `market`: market documents with content-hash merge and dedup
//! - `classifier`: sale-cadence to update-tier mapping
//! - `circuit_breaker`: run-local error budget and wall-clock deadline
//! - `token_pool`: per-server authentication token selection
//! - `world`: server and data-center registry

pub mod circuit_breaker;
pub mod classifier;
pub mod market;
pub mod pair;
pub mod token_pool;
pub mod world;

pub use circuit_breaker::{
    BreakerError, CircuitBreaker, DeadlineGuard, ExceptionKind, ExceptionRecord,
};
pub use classifier::{classify, Classification, ClassifierConfig, TierBound};
pub use market::{
    ItemId, ListingObservation, MarketDocument, MarketHistory, MarketListing, SaleObservation,
    ServerId,
};
pub use pair::{PairError, PairState, Tier, TrackedPair};
pub use token_pool::{AuthToken, TokenPool};
pub use world::{ServerInfo, ServerRegistry};

//! Tradepost - Market Board Synchronization Scheduler Library
//!
//! Keeps a per-server market snapshot fresh by polling an upstream
//! session-authenticated API in priority-tiered, deadline-bounded batches.
//!
//! # Modules
//!
//! - `domain`: Core business logic (MarketDocument, TrackedPair, classifier, CircuitBreaker)
//! - `ports`: Trait abstractions (MarketApiPort, MarketStorePort, PairRepositoryPort)
//! - `adapters`: External implementations (HTTP client, in-memory stores, CLI)
//! - `config`: Configuration loading and validation
//! - `application`: Update runner, reclassification job, manual requests

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

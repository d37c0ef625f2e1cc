//! HTTP Market API Adapter
//!
//! `reqwest`-based implementation of the market API port.

mod client;

pub use client::{HttpMarketApi, MarketApiConfig};

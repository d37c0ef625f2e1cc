//! Market API Port
//!
//! Boundary trait for the external, session-authenticated market API. The
//! untyped upstream response is decoded once at this boundary into a tagged
//! variant, so the runner never inspects ad hoc optional fields.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::market::{ItemId, ListingObservation, SaleObservation};
use crate::domain::token_pool::AuthToken;

/// Transport-level failure: the request never produced a payload.
#[derive(Error, Debug)]
pub enum MarketApiError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("malformed payload: {0}")]
    Decode(String),
}

/// Protocol-level outcome of one API call. The three non-`Ok` shapes are the
/// recognized failure signals; each one aborts the remainder of the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiResponse<T> {
    Ok(T),
    /// `state == "rejected"` in the raw response.
    Rejected,
    /// A populated error field, with its reason.
    Error(String),
    /// A null or empty response body.
    Empty,
}

impl<T> ApiResponse<T> {
    pub fn is_ok(&self) -> bool {
        matches!(self, ApiResponse::Ok(_))
    }
}

/// Payload of the price-listing endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingsPayload {
    /// External catalogue id carried alongside the listings.
    pub lodestone_id: Option<u64>,
    pub entries: Vec<ListingObservation>,
}

/// Payload of the transaction-history endpoint, newest-first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryPayload {
    pub entries: Vec<SaleObservation>,
}

/// Client for the external market API. Implementations own transport
/// concerns (timeout, bounded retry); from the scheduler's perspective each
/// call is a single blocking operation.
#[async_trait]
pub trait MarketApiPort: Send + Sync {
    async fn get_listings(
        &self,
        token: &AuthToken,
        item: ItemId,
    ) -> Result<ApiResponse<ListingsPayload>, MarketApiError>;

    async fn get_history(
        &self,
        token: &AuthToken,
        item: ItemId,
    ) -> Result<ApiResponse<HistoryPayload>, MarketApiError>;
}

/// Raw wire shape of one listing row, camelCase per the upstream API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireListing {
    pub sell_price: u64,
    pub stack: u32,
    pub hq: bool,
    pub is_crafted: bool,
    pub register_town: u8,
    #[serde(default)]
    pub sell_retainer_name: String,
    #[serde(default)]
    pub signature_name: String,
}

impl From<WireListing> for ListingObservation {
    fn from(w: WireListing) -> Self {
        Self {
            sell_price: w.sell_price,
            stack_size: w.stack,
            hq: w.hq,
            crafted: w.is_crafted,
            register_town: w.register_town,
            retainer_name: w.sell_retainer_name,
            creator_name: w.signature_name,
        }
    }
}

/// Raw wire shape of one sale row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireSale {
    pub sell_price: u64,
    pub stack: u32,
    pub hq: bool,
    pub buy_real_date: u64,
    #[serde(default)]
    pub buy_character_name: String,
}

impl From<WireSale> for SaleObservation {
    fn from(w: WireSale) -> Self {
        Self {
            sell_price: w.sell_price,
            stack_size: w.stack,
            hq: w.hq,
            purchase_date: w.buy_real_date,
            buyer_name: w.buy_character_name,
        }
    }
}

//! Scripted mock for the market API port.
//!
//! Records every call and replays configured responses, so runner behavior
//! (fail-fast, breaker counting, deadline handling) is testable without a
//! network.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::domain::market::ItemId;
use crate::domain::token_pool::AuthToken;
use super::market_api::{
    ApiResponse, HistoryPayload, ListingsPayload, MarketApiError, MarketApiPort,
};

/// Scripted outcome for one endpoint call.
#[derive(Debug, Clone)]
pub enum Scripted<T> {
    Respond(ApiResponse<T>),
    /// Transport failure surfaced as a timeout.
    Timeout(String),
}

/// Mock market API that replays scripted responses per item and records the
/// calls it receives, including which token was used.
#[derive(Debug, Default, Clone)]
pub struct ScriptedMarketApi {
    listings: Arc<Mutex<HashMap<ItemId, Scripted<ListingsPayload>>>>,
    history: Arc<Mutex<HashMap<ItemId, Scripted<HistoryPayload>>>>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub endpoint: &'static str,
    pub item: ItemId,
    pub token: String,
}

impl ScriptedMarketApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: script the listings response for an item.
    pub fn with_listings(self, item: ItemId, response: ApiResponse<ListingsPayload>) -> Self {
        self.listings.lock().unwrap().insert(item, Scripted::Respond(response));
        self
    }

    /// Builder method: script the history response for an item.
    pub fn with_history(self, item: ItemId, response: ApiResponse<HistoryPayload>) -> Self {
        self.history.lock().unwrap().insert(item, Scripted::Respond(response));
        self
    }

    /// Builder method: make the listings call fail at transport level.
    pub fn with_listings_timeout(self, item: ItemId) -> Self {
        self.listings
            .lock()
            .unwrap()
            .insert(item, Scripted::Timeout(format!("timed out fetching item {}", item)));
        self
    }

    /// All recorded calls in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Items whose listings endpoint was hit, in call order.
    pub fn polled_items(&self) -> Vec<ItemId> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.endpoint == "listings")
            .map(|c| c.item)
            .collect()
    }

    fn record(&self, endpoint: &'static str, item: ItemId, token: &AuthToken) {
        self.calls.lock().unwrap().push(RecordedCall {
            endpoint,
            item,
            token: token.token.clone(),
        });
    }
}

#[async_trait]
impl MarketApiPort for ScriptedMarketApi {
    async fn get_listings(
        &self,
        token: &AuthToken,
        item: ItemId,
    ) -> Result<ApiResponse<ListingsPayload>, MarketApiError> {
        self.record("listings", item, token);
        let scripted = self.listings.lock().unwrap().get(&item).cloned();
        match scripted {
            Some(Scripted::Respond(response)) => Ok(response),
            Some(Scripted::Timeout(message)) => Err(MarketApiError::Timeout(message)),
            // unscripted items respond with an empty board
            None => Ok(ApiResponse::Ok(ListingsPayload::default())),
        }
    }

    async fn get_history(
        &self,
        token: &AuthToken,
        item: ItemId,
    ) -> Result<ApiResponse<HistoryPayload>, MarketApiError> {
        self.record("history", item, token);
        let scripted = self.history.lock().unwrap().get(&item).cloned();
        match scripted {
            Some(Scripted::Respond(response)) => Ok(response),
            Some(Scripted::Timeout(message)) => Err(MarketApiError::Timeout(message)),
            None => Ok(ApiResponse::Ok(HistoryPayload::default())),
        }
    }
}

//! Market API HTTP Client
//!
//! Talks to the external session-authenticated market API. The client owns
//! the transport concerns the scheduler must not see: a per-request timeout
//! and a bounded retry/poll loop with a short inter-attempt delay. Protocol
//! failure shapes are decoded here, once, into the tagged `ApiResponse`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::config::ApiSection;
use crate::domain::market::ItemId;
use crate::domain::token_pool::AuthToken;
use crate::ports::market_api::{
    ApiResponse, HistoryPayload, ListingsPayload, MarketApiError, MarketApiPort, WireListing,
    WireSale,
};

/// Market API client configuration.
#[derive(Debug, Clone)]
pub struct MarketApiConfig {
    /// Base URL for the market API.
    pub base_url: String,
    /// Per-request client timeout.
    pub timeout: Duration,
    /// Bounded retry/poll attempts per call.
    pub retry_attempts: u32,
    /// Delay between attempts.
    pub retry_delay: Duration,
}

impl Default for MarketApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://companion.example.com/api".to_string(),
            timeout: Duration::from_millis(2_500),
            retry_attempts: 6,
            retry_delay: Duration::from_millis(1_000),
        }
    }
}

impl From<&ApiSection> for MarketApiConfig {
    fn from(section: &ApiSection) -> Self {
        Self {
            base_url: section.resolved_base_url(),
            timeout: Duration::from_millis(section.timeout_ms),
            retry_attempts: section.retry_attempts,
            retry_delay: Duration::from_millis(section.retry_delay_ms),
        }
    }
}

/// Market API client over HTTP.
#[derive(Debug, Clone)]
pub struct HttpMarketApi {
    config: MarketApiConfig,
    http: Client,
}

impl HttpMarketApi {
    pub fn new(config: MarketApiConfig) -> Result<Self, MarketApiError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| MarketApiError::Connection(format!("failed to build client: {}", e)))?;

        Ok(Self { config, http })
    }

    async fn fetch(&self, token: &AuthToken, path: &str) -> Result<String, MarketApiError> {
        let url = format!("{}/{}", self.config.base_url.trim_end_matches('/'), path);
        let mut last_error: Option<MarketApiError> = None;

        for attempt in 0..self.config.retry_attempts {
            if attempt > 0 {
                tokio::time::sleep(self.config.retry_delay).await;
            }

            let result = self
                .http
                .get(&url)
                .header("x-session-token", &token.token)
                .send()
                .await;

            match result {
                Ok(response) => {
                    let status = response.status();
                    // server errors and rate limits are worth another attempt
                    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
                        tracing::warn!(
                            %url,
                            status = status.as_u16(),
                            attempt = attempt + 1,
                            "market api retryable status"
                        );
                        last_error = Some(MarketApiError::Connection(format!(
                            "server returned {}",
                            status
                        )));
                        continue;
                    }

                    return response
                        .text()
                        .await
                        .map_err(|e| MarketApiError::Connection(e.to_string()));
                }
                Err(e) if e.is_timeout() => {
                    last_error = Some(MarketApiError::Timeout(e.to_string()));
                }
                Err(e) => {
                    last_error = Some(MarketApiError::Connection(e.to_string()));
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| MarketApiError::Connection("retry attempts exhausted".into())))
    }
}

#[async_trait]
impl MarketApiPort for HttpMarketApi {
    async fn get_listings(
        &self,
        token: &AuthToken,
        item: ItemId,
    ) -> Result<ApiResponse<ListingsPayload>, MarketApiError> {
        let body = self.fetch(token, &format!("items/{}/listings", item)).await?;
        decode_listings(&body)
    }

    async fn get_history(
        &self,
        token: &AuthToken,
        item: ItemId,
    ) -> Result<ApiResponse<HistoryPayload>, MarketApiError> {
        let body = self.fetch(token, &format!("items/{}/history", item)).await?;
        decode_history(&body)
    }
}

/// Raw envelope shared by both endpoints. The upstream API signals failure
/// through loosely-typed fields; they are interpreted here and nowhere else.
#[derive(Debug, Deserialize)]
struct RawEnvelope {
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<serde_json::Value>,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default, rename = "eorzeadbItemId")]
    eorzeadb_item_id: Option<u64>,
    #[serde(default)]
    entries: Option<Vec<WireListing>>,
    #[serde(default)]
    history: Option<Vec<WireSale>>,
}

fn decode_envelope(body: &str) -> Result<Option<RawEnvelope>, MarketApiError> {
    let trimmed = body.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(None);
    }
    serde_json::from_str(trimmed)
        .map(Some)
        .map_err(|e| MarketApiError::Decode(e.to_string()))
}

fn failure_shape<T>(raw: &RawEnvelope) -> Option<ApiResponse<T>> {
    if raw.state.as_deref() == Some("rejected") {
        return Some(ApiResponse::Rejected);
    }
    if raw.error.is_some() {
        let reason = raw
            .reason
            .clone()
            .unwrap_or_else(|| "unspecified error".to_string());
        return Some(ApiResponse::Error(reason));
    }
    None
}

fn decode_listings(body: &str) -> Result<ApiResponse<ListingsPayload>, MarketApiError> {
    let Some(raw) = decode_envelope(body)? else {
        return Ok(ApiResponse::Empty);
    };
    if let Some(failure) = failure_shape(&raw) {
        return Ok(failure);
    }
    let Some(entries) = raw.entries else {
        return Ok(ApiResponse::Empty);
    };

    Ok(ApiResponse::Ok(ListingsPayload {
        lodestone_id: raw.eorzeadb_item_id,
        entries: entries.into_iter().map(Into::into).collect(),
    }))
}

fn decode_history(body: &str) -> Result<ApiResponse<HistoryPayload>, MarketApiError> {
    let Some(raw) = decode_envelope(body)? else {
        return Ok(ApiResponse::Empty);
    };
    if let Some(failure) = failure_shape(&raw) {
        return Ok(failure);
    }
    let Some(history) = raw.history else {
        return Ok(ApiResponse::Empty);
    };

    Ok(ApiResponse::Ok(HistoryPayload {
        entries: history.into_iter().map(Into::into).collect(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_upstream_client_settings() {
        let config = MarketApiConfig::default();
        assert_eq!(config.timeout, Duration::from_millis(2_500));
        assert_eq!(config.retry_attempts, 6);
        assert_eq!(config.retry_delay, Duration::from_millis(1_000));
    }

    #[test]
    fn client_builds() {
        assert!(HttpMarketApi::new(MarketApiConfig::default()).is_ok());
    }

    #[test]
    fn null_body_decodes_as_empty() {
        assert_eq!(decode_listings("null").unwrap(), ApiResponse::Empty);
        assert_eq!(decode_history("").unwrap(), ApiResponse::Empty);
    }

    #[test]
    fn rejected_state_decodes_as_rejected() {
        let body = r#"{"state": "rejected"}"#;
        assert_eq!(decode_listings(body).unwrap(), ApiResponse::Rejected);
        assert_eq!(decode_history(body).unwrap(), ApiResponse::Rejected);
    }

    #[test]
    fn error_field_decodes_with_reason() {
        let body = r#"{"error": {"code": 500}, "reason": "sight is down"}"#;
        assert_eq!(
            decode_listings(body).unwrap(),
            ApiResponse::Error("sight is down".to_string())
        );
    }

    #[test]
    fn error_without_reason_gets_a_placeholder() {
        let body = r#"{"error": "boom"}"#;
        assert_eq!(
            decode_history(body).unwrap(),
            ApiResponse::Error("unspecified error".to_string())
        );
    }

    #[test]
    fn listings_payload_decodes() {
        let body = r#"{
            "eorzeadbItemId": 777,
            "entries": [
                {
                    "sellPrice": 500,
                    "stack": 3,
                    "hq": true,
                    "isCrafted": false,
                    "registerTown": 2,
                    "sellRetainerName": "Moggle"
                }
            ]
        }"#;

        match decode_listings(body).unwrap() {
            ApiResponse::Ok(payload) => {
                assert_eq!(payload.lodestone_id, Some(777));
                assert_eq!(payload.entries.len(), 1);
                assert_eq!(payload.entries[0].sell_price, 500);
            }
            other => panic!("expected Ok payload, got {:?}", other),
        }
    }

    #[test]
    fn history_payload_decodes() {
        let body = r#"{
            "history": [
                {
                    "sellPrice": 1200,
                    "stack": 1,
                    "hq": false,
                    "buyRealDate": 1700000000,
                    "buyCharacterName": "Some Buyer"
                }
            ]
        }"#;

        match decode_history(body).unwrap() {
            ApiResponse::Ok(payload) => {
                assert_eq!(payload.entries.len(), 1);
                assert_eq!(payload.entries[0].purchase_date, 1_700_000_000);
            }
            other => panic!("expected Ok payload, got {:?}", other),
        }
    }

    #[test]
    fn missing_entries_decodes_as_empty() {
        assert_eq!(decode_listings("{}").unwrap(), ApiResponse::Empty);
        assert_eq!(decode_history("{}").unwrap(), ApiResponse::Empty);
    }

    #[test]
    fn garbage_body_is_a_decode_error() {
        assert!(matches!(
            decode_listings("<html>"),
            Err(MarketApiError::Decode(_))
        ));
    }
}

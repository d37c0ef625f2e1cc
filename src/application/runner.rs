//! Update Runner
//!
//! Executes one bounded polling run for a tier: pulls the due pairs, calls
//! the market API with a per-server session token, merges the responses into
//! the document store, and batches the timestamp write-back. The circuit
//! breaker and deadline guard are consulted every iteration; either one ends
//! the run early while keeping completed work.

use std::sync::{Arc, Mutex};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use chrono::Timelike;
use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;

use crate::domain::circuit_breaker::{
    CircuitBreaker, DeadlineGuard, ExceptionKind, ExceptionRecord,
};
use crate::domain::market::{MarketHistory, MarketListing};
use crate::domain::pair::Tier;
use crate::domain::token_pool::TokenPool;
use crate::domain::world::ServerRegistry;
use crate::ports::market_api::{ApiResponse, MarketApiPort};
use crate::ports::repository::{
    DuePair, NameRegistryPort, PairRepositoryPort, RepositoryError, TokenSourcePort,
};
use crate::ports::store::{MarketStorePort, StoreError};

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("pair repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("document store error: {0}")]
    Store(#[from] StoreError),
}

/// Why a run stopped before exhausting its batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaltReason {
    /// Invoked inside the maintenance-blackout minute window.
    Blackout,
    /// Critical-exception count reached the threshold.
    CircuitBreaker,
    /// Wall-clock budget exhausted; a normal termination, not an error.
    Deadline,
    /// The market API returned one of the recognized failure shapes.
    ApiFailure,
}

/// Outcome of one run. Early termination still counts as success; the pairs
/// that were not reached stay stale and the next scheduled run picks them up.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub tier: Tier,
    pub processed: usize,
    pub skipped_no_token: usize,
    pub halt: Option<HaltReason>,
    /// Exceptions recorded against the breaker, queryable after the run.
    pub exceptions: Vec<ExceptionRecord>,
    /// Operator-visible critical flag.
    pub critical: bool,
}

/// Scheduler-facing settings for the runner, passed in at construction
/// instead of read from global state.
#[derive(Debug, Clone)]
pub struct RunnerSettings {
    pub blackout_minutes: Vec<u32>,
    pub error_threshold: u32,
}

pub struct UpdateRunner {
    api: Arc<dyn MarketApiPort>,
    store: Arc<dyn MarketStorePort>,
    pairs: Arc<dyn PairRepositoryPort>,
    tokens: Arc<dyn TokenSourcePort>,
    names: Arc<dyn NameRegistryPort>,
    registry: ServerRegistry,
    settings: RunnerSettings,
    rng: Mutex<StdRng>,
}

impl UpdateRunner {
    pub fn new(
        api: Arc<dyn MarketApiPort>,
        store: Arc<dyn MarketStorePort>,
        pairs: Arc<dyn PairRepositoryPort>,
        tokens: Arc<dyn TokenSourcePort>,
        names: Arc<dyn NameRegistryPort>,
        registry: ServerRegistry,
        settings: RunnerSettings,
    ) -> Self {
        Self {
            api,
            store,
            pairs,
            tokens,
            names,
            registry,
            settings,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Seed the token-selection RNG; selections become reproducible.
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    /// Execute one polling run for `tier`.
    pub async fn run(
        &self,
        tier: Tier,
        max_batch: usize,
        deadline_secs: u64,
    ) -> Result<RunSummary, RunnerError> {
        let minute = chrono::Utc::now().minute();
        if self.settings.blackout_minutes.contains(&minute) {
            tracing::info!(tier, minute, "skipping run inside blackout window");
            return Ok(RunSummary {
                tier,
                processed: 0,
                skipped_no_token: 0,
                halt: Some(HaltReason::Blackout),
                exceptions: Vec::new(),
                critical: false,
            });
        }

        let start = unix_now();
        let started = Instant::now();
        let guard = DeadlineGuard::new(start, deadline_secs);
        let mut breaker = CircuitBreaker::new(self.settings.error_threshold);

        let pool = TokenPool::from_rows(self.tokens.online_tokens().await?);
        let batch = self.pairs.due_pairs(tier, max_batch).await?;

        tracing::info!(
            tier,
            batch = batch.len(),
            token_servers = pool.server_count(),
            deadline = guard.deadline(),
            "starting update run"
        );

        if batch.is_empty() {
            tracing::info!(tier, "no pairs to update");
            return Ok(RunSummary {
                tier,
                processed: 0,
                skipped_no_token: 0,
                halt: None,
                exceptions: Vec::new(),
                critical: false,
            });
        }

        let mut updated_ids: Vec<u64> = Vec::new();
        let mut skipped_no_token = 0usize;
        let mut halt: Option<HaltReason> = None;

        for due in &batch {
            if breaker.is_open() {
                tracing::warn!(tier, "circuit breaker open, ending run");
                halt = Some(HaltReason::CircuitBreaker);
                break;
            }
            if guard.expired(unix_now()) {
                tracing::info!(tier, "deadline reached, ending run");
                halt = Some(HaltReason::Deadline);
                break;
            }

            let token = {
                let mut rng = self.rng.lock().unwrap();
                pool.pick(due.server, &mut *rng).cloned()
            };
            let Some(token) = token else {
                tracing::debug!(
                    server = %self.registry.name(due.server),
                    item = due.item,
                    "no online token for server, skipping pair"
                );
                skipped_no_token += 1;
                continue;
            };

            let pair_started = Instant::now();
            let context = self.registry.exception_context(due.item, due.server);

            let listings = match self.api.get_listings(&token, due.item).await {
                Ok(response) => response,
                Err(err) => {
                    breaker.record(ExceptionKind::Transport, err.to_string(), &context, unix_now());
                    halt = Some(HaltReason::ApiFailure);
                    break;
                }
            };
            let Some(listings) = check_response(listings, &mut breaker, &context) else {
                halt = Some(HaltReason::ApiFailure);
                break;
            };

            let history = match self.api.get_history(&token, due.item).await {
                Ok(response) => response,
                Err(err) => {
                    breaker.record(ExceptionKind::Transport, err.to_string(), &context, unix_now());
                    halt = Some(HaltReason::ApiFailure);
                    break;
                }
            };
            let Some(history) = check_response(history, &mut breaker, &context) else {
                halt = Some(HaltReason::ApiFailure);
                break;
            };

            self.merge_responses(due, listings, history).await?;
            updated_ids.push(due.id);

            tracing::info!(
                item = due.item,
                server = %self.registry.name(due.server),
                data_center = %self.registry.data_center(due.server),
                duration_ms = pair_started.elapsed().as_millis() as u64,
                "pair updated"
            );
        }

        // One batched write advances every completed pair and burns its
        // override; unreached pairs stay stale for the next run.
        if !updated_ids.is_empty() {
            self.pairs.mark_updated(&updated_ids, unix_now()).await?;
        }

        let summary = RunSummary {
            tier,
            processed: updated_ids.len(),
            skipped_no_token,
            halt,
            critical: breaker.is_critical(),
            exceptions: breaker.exceptions().to_vec(),
        };

        tracing::info!(
            tier,
            processed = summary.processed,
            skipped = summary.skipped_no_token,
            halt = ?summary.halt,
            duration_ms = started.elapsed().as_millis() as u64,
            "update run complete"
        );

        Ok(summary)
    }

    /// Merge one pair's poll results into its market document.
    async fn merge_responses(
        &self,
        due: &DuePair,
        listings: crate::ports::market_api::ListingsPayload,
        history: crate::ports::market_api::HistoryPayload,
    ) -> Result<(), RunnerError> {
        let mut document = self.store.get(due.server, due.item).await?;

        if listings.lodestone_id.is_some() {
            document.lodestone_id = listings.lodestone_id;
        }

        let mut built = Vec::with_capacity(listings.entries.len());
        for obs in &listings.entries {
            let retainer_id = self.names.resolve(due.server, &obs.retainer_name).await?;
            let creator_id = self.names.resolve(due.server, &obs.creator_name).await?;
            built.push(MarketListing::from_observation(
                due.item,
                obs,
                retainer_id,
                creator_id,
            ));
        }
        document.replace_listings(built);

        let mut incoming = Vec::with_capacity(history.entries.len());
        for obs in &history.entries {
            let buyer_id = self.names.resolve(due.server, &obs.buyer_name).await?;
            incoming.push(MarketHistory::from_observation(due.item, obs, buyer_id));
        }
        let inserted = document.merge_history(incoming);

        tracing::debug!(
            item = due.item,
            server = due.server,
            listings = document.listings.len(),
            new_sales = inserted,
            "document merged"
        );

        self.store.set(document).await?;
        Ok(())
    }
}

/// Unpack a protocol response; a non-`Ok` shape records an exception and
/// yields `None`, which aborts the remainder of the run.
fn check_response<T>(
    response: ApiResponse<T>,
    breaker: &mut CircuitBreaker,
    context: &str,
) -> Option<T> {
    match response {
        ApiResponse::Ok(payload) => Some(payload),
        ApiResponse::Rejected => {
            breaker.record(ExceptionKind::Rejected, "response rejected", context, unix_now());
            None
        }
        ApiResponse::Error(reason) => {
            breaker.record(ExceptionKind::ApiError, reason, context, unix_now());
            None
        }
        ApiResponse::Empty => {
            breaker.record(ExceptionKind::EmptyResponse, "empty response", context, unix_now());
            None
        }
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

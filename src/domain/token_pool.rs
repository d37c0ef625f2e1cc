//! Token Pool
//!
//! Holds the currently-online authentication tokens grouped per server and
//! hands one out at random per poll. Random choice spreads load across
//! sessions and avoids a detectable polling pattern; a seeded RNG makes the
//! selection reproducible in tests.

use std::collections::HashMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::market::ServerId;

/// One authentication token row as supplied by the token source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthToken {
    pub server: ServerId,
    pub online: bool,
    /// Opaque session payload forwarded verbatim to the API client.
    pub token: String,
}

/// Online tokens grouped by server. Offline rows are dropped at construction;
/// the pool never refreshes itself, a new one is built per run.
#[derive(Debug, Clone, Default)]
pub struct TokenPool {
    by_server: HashMap<ServerId, Vec<AuthToken>>,
}

impl TokenPool {
    pub fn from_rows(rows: Vec<AuthToken>) -> Self {
        let mut by_server: HashMap<ServerId, Vec<AuthToken>> = HashMap::new();
        for row in rows {
            if !row.online {
                continue;
            }
            by_server.entry(row.server).or_default().push(row);
        }
        Self { by_server }
    }

    /// Pick one token uniformly at random from the server's online pool.
    /// Returns `None` when the server has no online token; the caller skips
    /// the pair silently in that case.
    pub fn pick<R: Rng>(&self, server: ServerId, rng: &mut R) -> Option<&AuthToken> {
        let pool = self.by_server.get(&server)?;
        if pool.is_empty() {
            return None;
        }
        Some(&pool[rng.gen_range(0..pool.len())])
    }

    pub fn has_tokens_for(&self, server: ServerId) -> bool {
        self.by_server.get(&server).map_or(false, |p| !p.is_empty())
    }

    pub fn server_count(&self) -> usize {
        self.by_server.len()
    }
}

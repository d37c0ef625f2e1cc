//! In-memory tracked-pair table and token source.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::market::{ItemId, ServerId};
use crate::domain::pair::{PairState, Tier, TrackedPair};
use crate::domain::token_pool::AuthToken;
use crate::ports::repository::{
    DuePair, PairRepositoryPort, RepositoryError, TokenSourcePort,
};

/// Tracked-pair table over a mutex-guarded map, mirroring the relational
/// queue table's behavior: staleness-ordered due queries and narrow,
/// last-writer-wins field updates.
#[derive(Debug, Default)]
pub struct MemoryPairRepository {
    pairs: Mutex<HashMap<u64, TrackedPair>>,
}

impl MemoryPairRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pairs(pairs: Vec<TrackedPair>) -> Self {
        Self {
            pairs: Mutex::new(pairs.into_iter().map(|p| (p.id, p)).collect()),
        }
    }

    pub fn get(&self, id: u64) -> Option<TrackedPair> {
        self.pairs.lock().unwrap().get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.pairs.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.lock().unwrap().is_empty()
    }
}

#[async_trait]
impl PairRepositoryPort for MemoryPairRepository {
    async fn due_pairs(&self, tier: Tier, limit: usize) -> Result<Vec<DuePair>, RepositoryError> {
        let pairs = self.pairs.lock().unwrap();
        let mut due: Vec<&TrackedPair> = pairs
            .values()
            .filter(|p| p.state.is_polled() && p.effective_tier() == tier)
            .collect();
        due.sort_by_key(|p| (p.updated_at, p.id));

        Ok(due
            .into_iter()
            .take(limit)
            .map(|p| DuePair {
                id: p.id,
                server: p.server,
                item: p.item,
            })
            .collect())
    }

    async fn mark_updated(&self, ids: &[u64], now: u64) -> Result<(), RepositoryError> {
        let mut pairs = self.pairs.lock().unwrap();
        for id in ids {
            if let Some(pair) = pairs.get_mut(id) {
                pair.mark_updated(now);
            }
        }
        Ok(())
    }

    async fn save_classification(
        &self,
        id: u64,
        state: PairState,
        tier: Tier,
        now: u64,
    ) -> Result<(), RepositoryError> {
        let mut pairs = self.pairs.lock().unwrap();
        let pair = pairs
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::QueryFailed(format!("no pair with id {}", id)))?;
        pair.reclassify(state, tier, now);
        Ok(())
    }

    async fn attach_override(
        &self,
        item: ItemId,
        servers: &[ServerId],
        tier: Tier,
    ) -> Result<usize, RepositoryError> {
        let mut pairs = self.pairs.lock().unwrap();
        let mut attached = 0;
        for pair in pairs.values_mut() {
            if pair.item == item && servers.contains(&pair.server) {
                if pair.attach_override(tier).is_ok() {
                    attached += 1;
                }
            }
        }
        Ok(attached)
    }

    async fn all_pairs(&self) -> Result<Vec<TrackedPair>, RepositoryError> {
        let pairs = self.pairs.lock().unwrap();
        let mut all: Vec<TrackedPair> = pairs.values().cloned().collect();
        all.sort_by_key(|p| p.id);
        Ok(all)
    }

    async fn insert(&self, pair: TrackedPair) -> Result<(), RepositoryError> {
        self.pairs.lock().unwrap().insert(pair.id, pair);
        Ok(())
    }
}

/// Static token rows, as an external token-management process would leave
/// them.
#[derive(Debug, Default)]
pub struct MemoryTokenSource {
    rows: Vec<AuthToken>,
}

impl MemoryTokenSource {
    pub fn new(rows: Vec<AuthToken>) -> Self {
        Self { rows }
    }
}

#[async_trait]
impl TokenSourcePort for MemoryTokenSource {
    async fn online_tokens(&self) -> Result<Vec<AuthToken>, RepositoryError> {
        Ok(self.rows.iter().filter(|t| t.online).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(id: u64, server: ServerId, item: ItemId, tier: Tier, updated_at: u64) -> TrackedPair {
        let mut p = TrackedPair::new(id, server, item, false, 9);
        p.reclassify(PairState::Updating, tier, updated_at);
        p
    }

    #[tokio::test]
    async fn due_pairs_ordered_by_staleness() {
        let repo = MemoryPairRepository::with_pairs(vec![
            pair(1, 1, 44, 2, 300),
            pair(2, 1, 45, 2, 100),
            pair(3, 1, 46, 2, 200),
        ]);

        let due = repo.due_pairs(2, 10).await.unwrap();
        let ids: Vec<u64> = due.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[tokio::test]
    async fn due_pairs_respects_limit_and_tier() {
        let repo = MemoryPairRepository::with_pairs(vec![
            pair(1, 1, 44, 2, 100),
            pair(2, 1, 45, 3, 100),
            pair(3, 1, 46, 2, 200),
        ]);

        let due = repo.due_pairs(2, 1).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, 1);
    }

    #[tokio::test]
    async fn due_pairs_includes_override_matches() {
        let mut overridden = pair(2, 1, 45, 6, 100);
        overridden.attach_override(2).unwrap();
        let repo =
            MemoryPairRepository::with_pairs(vec![pair(1, 1, 44, 2, 200), overridden]);

        let due = repo.due_pairs(2, 10).await.unwrap();
        let ids: Vec<u64> = due.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![2, 1]);

        // while overridden, the pair is not due on its steady-state tier
        assert!(repo.due_pairs(6, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn sourced_pairs_are_never_due() {
        let repo =
            MemoryPairRepository::with_pairs(vec![TrackedPair::new(1, 1, 44, true, 9)]);
        assert!(repo.due_pairs(9, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn mark_updated_clears_overrides_in_batch() {
        let mut a = pair(1, 1, 44, 2, 100);
        a.attach_override(1).unwrap();
        let repo = MemoryPairRepository::with_pairs(vec![a, pair(2, 1, 45, 2, 100)]);

        repo.mark_updated(&[1, 2], 5_000).await.unwrap();

        let a = repo.get(1).unwrap();
        assert_eq!(a.updated_at, 5_000);
        assert_eq!(a.patreon_override_tier, None);
        assert_eq!(repo.get(2).unwrap().updated_at, 5_000);
    }

    #[tokio::test]
    async fn attach_override_skips_sourced_pairs() {
        let repo = MemoryPairRepository::with_pairs(vec![
            pair(1, 1, 44, 5, 100),
            pair(2, 2, 44, 5, 100),
            TrackedPair::new(3, 3, 44, true, 9),
        ]);

        let attached = repo.attach_override(44, &[1, 2, 3], 1).await.unwrap();
        assert_eq!(attached, 2);
        assert_eq!(repo.get(3).unwrap().patreon_override_tier, None);
    }

    #[tokio::test]
    async fn token_source_filters_offline_rows() {
        let source = MemoryTokenSource::new(vec![
            AuthToken { server: 1, online: true, token: "a".into() },
            AuthToken { server: 1, online: false, token: "b".into() },
        ]);

        let rows = source.online_tokens().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].token, "a");
    }
}

//! Manual Update Requests
//!
//! Lets a patreon/manual request jump an item's next poll to a given tier.
//! The override fans out to every server in the target's data center and a
//! per-(item, server) cooldown keeps request storms off the queue table.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use thiserror::Error;

use crate::domain::market::{ItemId, ServerId};
use crate::domain::pair::Tier;
use crate::domain::world::ServerRegistry;
use crate::ports::repository::{PairRepositoryPort, RepositoryError};

#[derive(Debug, Error)]
pub enum ManualUpdateError {
    #[error("request for item {item} on server {server} is on cooldown for {remaining_secs}s")]
    Cooldown {
        item: ItemId,
        server: ServerId,
        remaining_secs: u64,
    },

    #[error("pair repository error: {0}")]
    Repository(#[from] RepositoryError),
}

pub struct ManualUpdateService {
    pairs: Arc<dyn PairRepositoryPort>,
    registry: ServerRegistry,
    cooldown_secs: u64,
    /// Last accepted request per (item, server).
    recent: Mutex<HashMap<(ItemId, ServerId), u64>>,
}

impl ManualUpdateService {
    pub fn new(
        pairs: Arc<dyn PairRepositoryPort>,
        registry: ServerRegistry,
        cooldown_secs: u64,
    ) -> Self {
        Self {
            pairs,
            registry,
            cooldown_secs,
            recent: Mutex::new(HashMap::new()),
        }
    }

    /// Attach a one-shot override tier to every pair carrying `item` across
    /// the server's data center. Returns the number of pairs flagged.
    pub async fn request(
        &self,
        item: ItemId,
        server: ServerId,
        tier: Tier,
        now: u64,
    ) -> Result<usize, ManualUpdateError> {
        {
            let mut recent = self.recent.lock().unwrap();
            if let Some(last) = recent.get(&(item, server)) {
                let elapsed = now.saturating_sub(*last);
                if elapsed < self.cooldown_secs {
                    return Err(ManualUpdateError::Cooldown {
                        item,
                        server,
                        remaining_secs: self.cooldown_secs - elapsed,
                    });
                }
            }
            recent.insert((item, server), now);
        }

        let servers = self.registry.data_center_servers(server);
        let attached = self.pairs.attach_override(item, &servers, tier).await?;

        tracing::info!(
            item,
            server,
            data_center = %self.registry.data_center(server),
            tier,
            attached,
            "manual update requested"
        );

        Ok(attached)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryPairRepository;
    use crate::domain::pair::{PairState, TrackedPair};
    use crate::domain::world::ServerInfo;

    fn registry() -> ServerRegistry {
        ServerRegistry::new(vec![
            ServerInfo { id: 1, name: "Cerberus".into(), data_center: "Chaos".into() },
            ServerInfo { id: 2, name: "Ragnarok".into(), data_center: "Chaos".into() },
            ServerInfo { id: 3, name: "Odin".into(), data_center: "Light".into() },
        ])
    }

    fn pair(id: u64, server: u32, item: u32) -> TrackedPair {
        let mut p = TrackedPair::new(id, server, item, false, 9);
        p.reclassify(PairState::Updating, 6, 100);
        p
    }

    #[tokio::test]
    async fn request_fans_out_across_the_data_center() {
        let repo = Arc::new(MemoryPairRepository::with_pairs(vec![
            pair(1, 1, 44),
            pair(2, 2, 44),
            pair(3, 3, 44), // other data center, untouched
            pair(4, 1, 45), // other item, untouched
        ]));
        let service = ManualUpdateService::new(repo.clone(), registry(), 300);

        let attached = service.request(44, 1, 1, 1_000).await.unwrap();
        assert_eq!(attached, 2);

        assert_eq!(repo.get(1).unwrap().patreon_override_tier, Some(1));
        assert_eq!(repo.get(2).unwrap().patreon_override_tier, Some(1));
        assert_eq!(repo.get(3).unwrap().patreon_override_tier, None);
        assert_eq!(repo.get(4).unwrap().patreon_override_tier, None);
    }

    #[tokio::test]
    async fn cooldown_rejects_repeat_requests() {
        let repo = Arc::new(MemoryPairRepository::with_pairs(vec![pair(1, 1, 44)]));
        let service = ManualUpdateService::new(repo, registry(), 300);

        service.request(44, 1, 1, 1_000).await.unwrap();
        let err = service.request(44, 1, 1, 1_100).await.unwrap_err();
        assert!(matches!(
            err,
            ManualUpdateError::Cooldown { remaining_secs: 200, .. }
        ));

        // a different item on the same server is unaffected
        let repo2 = Arc::new(MemoryPairRepository::with_pairs(vec![pair(1, 1, 45)]));
        let service2 = ManualUpdateService::new(repo2, registry(), 300);
        assert!(service2.request(45, 1, 1, 1_100).await.is_ok());
    }

    #[tokio::test]
    async fn cooldown_expires() {
        let repo = Arc::new(MemoryPairRepository::with_pairs(vec![pair(1, 1, 44)]));
        let service = ManualUpdateService::new(repo, registry(), 300);

        service.request(44, 1, 1, 1_000).await.unwrap();
        assert!(service.request(44, 1, 1, 1_300).await.is_ok());
    }

    #[tokio::test]
    async fn rejected_request_does_not_start_a_cooldown_for_others() {
        let repo = Arc::new(MemoryPairRepository::with_pairs(vec![
            pair(1, 1, 44),
            pair(2, 3, 44),
        ]));
        let service = ManualUpdateService::new(repo.clone(), registry(), 300);

        service.request(44, 1, 1, 1_000).await.unwrap();
        // same item, different server (other data center) has its own window
        assert!(service.request(44, 3, 1, 1_010).await.is_ok());
        assert_eq!(repo.get(2).unwrap().patreon_override_tier, Some(1));
    }
}

//! Market Documents
//!
//! The per-(server, item) document that holds the current listing snapshot and
//! the append-only sale history. Listings are fully replaced on every poll;
//! history is merged by content-hash id so double-processing the same payload
//! is a no-op.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Internal id of a game server (world).
pub type ServerId = u32;

/// In-game item catalogue id.
pub type ItemId = u32;

/// One active sell offer as observed by a poll, before name resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingObservation {
    pub sell_price: u64,
    pub stack_size: u32,
    pub hq: bool,
    pub crafted: bool,
    pub register_town: u8,
    pub retainer_name: String,
    pub creator_name: String,
}

/// One completed sale as observed by a poll, before name resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleObservation {
    pub sell_price: u64,
    pub stack_size: u32,
    pub hq: bool,
    pub purchase_date: u64,
    pub buyer_name: String,
}

/// A stored sell offer. `id` is a content hash, so the same offer observed
/// twice produces the same id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketListing {
    pub id: String,
    pub price_per_unit: u64,
    pub stack_size: u32,
    pub hq: bool,
    pub crafted: bool,
    pub register_town: u8,
    /// Resolved internal id of the selling retainer.
    pub retainer_id: Option<String>,
    /// Resolved internal id of the crafter who signed the item.
    pub creator_signature_id: Option<String>,
}

impl MarketListing {
    /// Build a listing from an observation plus resolved name ids.
    ///
    /// Hash collisions between genuinely distinct listings are accepted; the
    /// id only needs to be stable for the same offer across polls.
    pub fn from_observation(
        item: ItemId,
        obs: &ListingObservation,
        retainer_id: Option<String>,
        creator_signature_id: Option<String>,
    ) -> Self {
        let id = content_id(&[
            &item.to_string(),
            &(obs.crafted as u8).to_string(),
            &(obs.hq as u8).to_string(),
            &obs.sell_price.to_string(),
            &obs.stack_size.to_string(),
            &obs.register_town.to_string(),
            &obs.retainer_name,
        ]);

        Self {
            id,
            price_per_unit: obs.sell_price,
            stack_size: obs.stack_size,
            hq: obs.hq,
            crafted: obs.crafted,
            register_town: obs.register_town,
            retainer_id,
            creator_signature_id,
        }
    }
}

/// A stored sale record. The buyer name is excluded from the id because
/// character renames would change it; the remaining fields never change for a
/// completed sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketHistory {
    pub id: String,
    pub purchase_date: u64,
    pub stack_size: u32,
    pub hq: bool,
    pub sell_price: u64,
    /// Resolved internal id of the buying character.
    pub buyer_id: Option<String>,
}

impl MarketHistory {
    pub fn from_observation(item: ItemId, obs: &SaleObservation, buyer_id: Option<String>) -> Self {
        let id = content_id(&[
            &item.to_string(),
            &obs.stack_size.to_string(),
            &(obs.hq as u8).to_string(),
            &obs.sell_price.to_string(),
            &obs.purchase_date.to_string(),
        ]);

        Self {
            id,
            purchase_date: obs.purchase_date,
            stack_size: obs.stack_size,
            hq: obs.hq,
            sell_price: obs.sell_price,
            buyer_id,
        }
    }
}

/// The persisted market document for one (server, item) pair.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketDocument {
    pub server: ServerId,
    pub item: ItemId,
    /// External catalogue id, copied from the latest listings payload.
    pub lodestone_id: Option<u64>,
    /// Current snapshot, sorted ascending by unit price.
    pub listings: Vec<MarketListing>,
    /// Append-only sale records, sorted descending by purchase time.
    pub history: Vec<MarketHistory>,
}

impl MarketDocument {
    pub fn new(server: ServerId, item: ItemId) -> Self {
        Self {
            server,
            item,
            lodestone_id: None,
            listings: Vec::new(),
            history: Vec::new(),
        }
    }

    /// Replace the listing snapshot with the latest poll result.
    ///
    /// The previous snapshot is discarded entirely; listings that vanished
    /// from the board must not linger.
    pub fn replace_listings(&mut self, listings: Vec<MarketListing>) {
        self.listings = listings;
        self.listings.sort_by(|a, b| a.price_per_unit.cmp(&b.price_per_unit));
    }

    /// Merge incoming sale records into the history by id-set membership.
    ///
    /// The upstream API claims to return history newest-first, but nothing
    /// defends against reordering or backfill, so every incoming entry is
    /// checked against the existing id set rather than stopping at the first
    /// known id. Returns the number of entries actually inserted.
    pub fn merge_history(&mut self, incoming: Vec<MarketHistory>) -> usize {
        let known: std::collections::HashSet<&str> =
            self.history.iter().map(|h| h.id.as_str()).collect();

        let fresh: Vec<MarketHistory> = incoming
            .into_iter()
            .filter(|h| !known.contains(h.id.as_str()))
            .collect();
        drop(known);

        let inserted = fresh.len();
        self.history.extend(fresh);
        self.history.sort_by(|a, b| b.purchase_date.cmp(&a.purchase_date));
        inserted
    }
}

/// Hex-encoded SHA-256 over `_`-joined fields.
fn content_id(fields: &[&str]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(fields.join("_").as_bytes());
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sale(price: u64, date: u64) -> SaleObservation {
        SaleObservation {
            sell_price: price,
            stack_size: 1,
            hq: false,
            purchase_date: date,
            buyer_name: "Buyer Name".to_string(),
        }
    }

    fn listing(price: u64, retainer: &str) -> ListingObservation {
        ListingObservation {
            sell_price: price,
            stack_size: 1,
            hq: false,
            crafted: false,
            register_town: 1,
            retainer_name: retainer.to_string(),
            creator_name: String::new(),
        }
    }

    #[test]
    fn listing_id_is_stable() {
        let obs = listing(500, "Moggle");
        let a = MarketListing::from_observation(44, &obs, None, None);
        let b = MarketListing::from_observation(44, &obs, Some("r-1".into()), None);
        assert_eq!(a.id, b.id); // resolved ids are not part of the hash
    }

    #[test]
    fn listing_id_differs_per_item() {
        let obs = listing(500, "Moggle");
        let a = MarketListing::from_observation(44, &obs, None, None);
        let b = MarketListing::from_observation(45, &obs, None, None);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn replace_listings_discards_previous_snapshot() {
        let mut doc = MarketDocument::new(1, 44);
        doc.replace_listings(vec![MarketListing::from_observation(
            44,
            &listing(900, "Old"),
            None,
            None,
        )]);
        doc.replace_listings(vec![MarketListing::from_observation(
            44,
            &listing(700, "New"),
            None,
            None,
        )]);

        assert_eq!(doc.listings.len(), 1);
        assert_eq!(doc.listings[0].price_per_unit, 700);
    }

    #[test]
    fn replace_listings_sorts_ascending_by_price() {
        let mut doc = MarketDocument::new(1, 44);
        doc.replace_listings(vec![
            MarketListing::from_observation(44, &listing(900, "A"), None, None),
            MarketListing::from_observation(44, &listing(300, "B"), None, None),
            MarketListing::from_observation(44, &listing(600, "C"), None, None),
        ]);

        let prices: Vec<u64> = doc.listings.iter().map(|l| l.price_per_unit).collect();
        assert_eq!(prices, vec![300, 600, 900]);
    }

    #[test]
    fn merge_history_is_idempotent() {
        let mut doc = MarketDocument::new(1, 44);
        let payload: Vec<MarketHistory> = [sale(100, 30), sale(200, 20), sale(300, 10)]
            .iter()
            .map(|s| MarketHistory::from_observation(44, s, None))
            .collect();

        assert_eq!(doc.merge_history(payload.clone()), 3);
        assert_eq!(doc.merge_history(payload), 0);
        assert_eq!(doc.history.len(), 3);
    }

    #[test]
    fn merge_history_sorts_descending_by_purchase_date() {
        let mut doc = MarketDocument::new(1, 44);
        doc.merge_history(
            [sale(100, 10), sale(200, 30), sale(300, 20)]
                .iter()
                .map(|s| MarketHistory::from_observation(44, s, None))
                .collect(),
        );

        let dates: Vec<u64> = doc.history.iter().map(|h| h.purchase_date).collect();
        assert_eq!(dates, vec![30, 20, 10]);
    }

    #[test]
    fn merge_history_catches_backfilled_entries() {
        let mut doc = MarketDocument::new(1, 44);
        doc.merge_history(
            [sale(100, 30), sale(200, 10)]
                .iter()
                .map(|s| MarketHistory::from_observation(44, s, None))
                .collect(),
        );

        // A later page backfills an entry between two already-known ones.
        // A first-match-stops scan would drop it; the id-set merge keeps it.
        let inserted = doc.merge_history(
            [sale(100, 30), sale(150, 20), sale(200, 10)]
                .iter()
                .map(|s| MarketHistory::from_observation(44, s, None))
                .collect(),
        );

        assert_eq!(inserted, 1);
        let dates: Vec<u64> = doc.history.iter().map(|h| h.purchase_date).collect();
        assert_eq!(dates, vec![30, 20, 10]);
    }

    #[test]
    fn identical_sales_at_different_times_are_distinct() {
        let mut doc = MarketDocument::new(1, 44);
        doc.merge_history(
            [sale(100, 10), sale(100, 11)]
                .iter()
                .map(|s| MarketHistory::from_observation(44, s, None))
                .collect(),
        );
        assert_eq!(doc.history.len(), 2);
    }
}

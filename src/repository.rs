// Read-only listing source for discovery pages and booking entry points
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

use crate::listing::{ListingKind, ListingRecord};

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("Listing not found: {0}")]
    NotFound(String),

    #[error("Duplicate id: {0}")]
    DuplicateId(String),

    #[error("JSON parse error: {0}")]
    JsonParseError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// Sample catalog shipped with the crate
pub const SAMPLE_LISTINGS_PATH: &str = "samples/listings.json";

#[async_trait]
pub trait ListingRepository: Send + Sync {
    // All listings in catalog order
    async fn list(&self) -> Result<Vec<ListingRecord>, RepositoryError>;

    async fn get(&self, id: &str) -> Result<ListingRecord, RepositoryError>;

    async fn list_kind(&self, kind: ListingKind) -> Result<Vec<ListingRecord>, RepositoryError> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .filter(|listing| listing.kind() == kind)
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryListingRepository {
    listings: RwLock<Vec<ListingRecord>>,
}

impl InMemoryListingRepository {
    pub fn new(listings: Vec<ListingRecord>) -> Result<Self, RepositoryError> {
        let mut seen = HashSet::new();
        for listing in &listings {
            if !seen.insert(listing.id()) {
                return Err(RepositoryError::DuplicateId(listing.id().to_string()));
            }
            check_items(listing)?;
        }
        Ok(Self {
            listings: RwLock::new(listings),
        })
    }

    pub fn from_json_str(json: &str) -> Result<Self, RepositoryError> {
        let listings: Vec<ListingRecord> =
            serde_json::from_str(json).map_err(|e| RepositoryError::JsonParseError(e.to_string()))?;
        debug!(count = listings.len(), "parsed listing catalog");
        Self::new(listings)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, RepositoryError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn load_sample() -> Result<Self, RepositoryError> {
        Self::load(SAMPLE_LISTINGS_PATH)
    }

    /// Add a listing at the end of the catalog.
    pub fn insert(&self, listing: ListingRecord) -> Result<(), RepositoryError> {
        let mut listings = self.listings.write();
        if listings.iter().any(|l| l.id() == listing.id()) {
            return Err(RepositoryError::DuplicateId(listing.id().to_string()));
        }
        check_items(&listing)?;
        listings.push(listing);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.listings.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.read().is_empty()
    }
}

// Item ids must be unique within a listing or selections would match twice
fn check_items(listing: &ListingRecord) -> Result<(), RepositoryError> {
    match listing.duplicate_item_id() {
        Some(item) => Err(RepositoryError::DuplicateId(format!("{}/{}", listing.id(), item))),
        None => Ok(()),
    }
}

#[async_trait]
impl ListingRepository for InMemoryListingRepository {
    async fn list(&self) -> Result<Vec<ListingRecord>, RepositoryError> {
        Ok(self.listings.read().clone())
    }

    async fn get(&self, id: &str) -> Result<ListingRecord, RepositoryError> {
        self.listings
            .read()
            .iter()
            .find(|listing| listing.id() == id)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"[
        { "kind": "venue", "id": "v1", "name": "Loft 22", "category_id": "loft",
          "hourly_rate": 150.0, "capacity": 80 },
        { "kind": "event", "id": "e1", "name": "Jazz Night", "category_id": "concert",
          "ticket_price": 25.0, "starts_at": "2025-07-04T19:30:00" },
        { "kind": "service", "id": "s1", "name": "Snap Studio", "category_id": "photo",
          "hourly_rate": 90.0 }
    ]"#;

    #[tokio::test]
    async fn test_list_preserves_catalog_order() {
        let repo = InMemoryListingRepository::from_json_str(CATALOG).unwrap();
        let ids: Vec<String> = repo
            .list()
            .await
            .unwrap()
            .iter()
            .map(|l| l.id().to_string())
            .collect();
        assert_eq!(ids, vec!["v1", "e1", "s1"]);
    }

    #[tokio::test]
    async fn test_get_and_missing() {
        let repo = InMemoryListingRepository::from_json_str(CATALOG).unwrap();

        assert_eq!(repo.get("e1").await.unwrap().name(), "Jazz Night");
        assert!(matches!(
            repo.get("nope").await,
            Err(RepositoryError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_kind() {
        let repo = InMemoryListingRepository::from_json_str(CATALOG).unwrap();
        let venues = repo.list_kind(ListingKind::Venue).await.unwrap();
        assert_eq!(venues.len(), 1);
        assert_eq!(venues[0].id(), "v1");
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicates() {
        let repo = InMemoryListingRepository::from_json_str(CATALOG).unwrap();
        let existing = repo.get("s1").await.unwrap();

        assert!(matches!(
            repo.insert(existing),
            Err(RepositoryError::DuplicateId(_))
        ));
        assert_eq!(repo.len(), 3);
    }

    #[test]
    fn test_rejects_repeated_add_on_ids() {
        let catalog = r#"[
            { "kind": "service", "id": "s2", "name": "Fog Co", "category_id": "effects",
              "hourly_rate": 60.0,
              "add_ons": [
                { "id": "x", "name": "Fog", "price": 50.0 },
                { "id": "x", "name": "Haze", "price": 30.0 }
              ] }
        ]"#;

        match InMemoryListingRepository::from_json_str(catalog) {
            Err(RepositoryError::DuplicateId(id)) => assert_eq!(id, "s2/x"),
            other => panic!("expected duplicate id, got {:?}", other.map(|r| r.len())),
        }
    }

    #[tokio::test]
    async fn test_insert_rejects_repeated_package_ids() {
        let repo = InMemoryListingRepository::from_json_str(CATALOG).unwrap();
        let listing: ListingRecord = serde_json::from_str(
            r#"{ "kind": "venue", "id": "v2", "name": "Barn", "category_id": "barn",
                 "hourly_rate": 90.0,
                 "packages": [
                   { "id": "day", "name": "Day", "price": 500.0 },
                   { "id": "day", "name": "Day again", "price": 400.0 }
                 ] }"#,
        )
        .unwrap();

        assert!(matches!(
            repo.insert(listing),
            Err(RepositoryError::DuplicateId(_))
        ));
        assert!(matches!(repo.get("v2").await, Err(RepositoryError::NotFound(_))));
    }

    #[test]
    fn test_load_sample_catalog() {
        let repo = InMemoryListingRepository::load_sample();
        assert!(repo.is_ok(), "Failed to load sample catalog: {:?}", repo.err());
        assert!(!repo.unwrap().is_empty());
    }
}

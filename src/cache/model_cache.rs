use std::{sync::Arc, time::Duration};

use chrono::Utc;
use serde::Serialize;

use super::TtlStore;
use crate::catalog::{CatalogKind, DetailRecord, ModelRecord, format_timestamp};

/// An immutable snapshot of one catalog's records.
pub type Listing = Arc<Vec<Arc<ModelRecord>>>;

/// Both listings, as returned for `type=all`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ModelListings {
    pub openrouter: Listing,
    pub huggingface: Listing,
}

/// Progress of one catalog's listing.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CatalogProgress {
    pub processed: usize,
    /// `"processing"` while the listing is empty, `"streaming"` once records
    /// are visible.
    pub status: &'static str,
}

impl CatalogProgress {
    fn of(listing: &Listing) -> Self {
        let processed = listing.len();
        Self {
            processed,
            status: if processed > 0 {
                "streaming"
            } else {
                "processing"
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessingStatus {
    pub openrouter: CatalogProgress,
    pub huggingface: CatalogProgress,
    pub timestamp: String,
}

struct Inner {
    listings: TtlStore<Listing>,
    details: TtlStore<DetailRecord>,
    listing_ttl: Duration,
    detail_ttl: Duration,
}

/// The process-wide model cache.
///
/// Listings are replaced wholesale: every write installs a complete new
/// array, so readers always see either the previous or the next snapshot.
/// Detail records live in a separate store with their own lifetime and are
/// unaffected by listing replacement.
#[derive(Clone)]
pub struct ModelCache {
    inner: Arc<Inner>,
}

impl ModelCache {
    pub fn new(listing_ttl: Duration, detail_ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                listings: TtlStore::new(),
                details: TtlStore::new(),
                listing_ttl,
                detail_ttl,
            }),
        }
    }

    /// The current listing for a catalog; empty when absent or expired.
    pub fn get_listing(&self, kind: CatalogKind) -> Listing {
        self.inner
            .listings
            .get(kind.as_str())
            .unwrap_or_default()
    }

    pub fn get_all(&self) -> ModelListings {
        ModelListings {
            openrouter: self.get_listing(CatalogKind::OpenRouter),
            huggingface: self.get_listing(CatalogKind::HuggingFace),
        }
    }

    /// Replace a catalog's listing.
    pub fn set_listing(&self, kind: CatalogKind, records: Listing) {
        self.inner
            .listings
            .insert(kind.as_str(), records, self.inner.listing_ttl);
    }

    pub fn get_detail(&self, model_id: &str) -> Option<DetailRecord> {
        self.inner.details.get(model_id)
    }

    pub fn set_detail(&self, model_id: &str, record: DetailRecord) {
        self.set_detail_with_ttl(model_id, record, self.inner.detail_ttl);
    }

    pub fn set_detail_with_ttl(&self, model_id: &str, record: DetailRecord, ttl: Duration) {
        self.inner.details.insert(model_id, record, ttl);
    }

    /// Number of detail records held, including expired ones not yet purged.
    pub fn detail_count(&self) -> usize {
        self.inner.details.len()
    }

    pub fn status(&self) -> ProcessingStatus {
        ProcessingStatus {
            openrouter: CatalogProgress::of(&self.get_listing(CatalogKind::OpenRouter)),
            huggingface: CatalogProgress::of(&self.get_listing(CatalogKind::HuggingFace)),
            timestamp: format_timestamp(Utc::now()),
        }
    }

    /// Drop expired listings and details. Returns the number removed.
    pub fn purge_expired(&self) -> usize {
        self.inner.listings.purge_expired() + self.inner.details.purge_expired()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::Map;

    use super::*;

    fn record(id: &str, kind: CatalogKind) -> Arc<ModelRecord> {
        Arc::new(ModelRecord {
            id: id.to_string(),
            kind,
            icon: "default.png".to_string(),
            openrouter_link: None,
            huggingface_link: None,
            pricing_converted: None,
            created_date: None,
            description: None,
            description_zh: None,
            readme_html: None,
            readme_html_zh: None,
            extra: Map::new(),
        })
    }

    fn detail(html: &str) -> DetailRecord {
        DetailRecord {
            readme_html: Some(html.to_string()),
            last_updated: format_timestamp(Utc::now()),
            error: None,
        }
    }

    #[test]
    fn test_empty_cache() {
        let cache = ModelCache::new(Duration::from_secs(60), Duration::from_secs(60));
        let all = cache.get_all();
        assert!(all.openrouter.is_empty());
        assert!(all.huggingface.is_empty());

        let status = cache.status();
        assert_eq!(status.openrouter.status, "processing");
        assert_eq!(status.huggingface.processed, 0);
    }

    #[test]
    fn test_set_listing_replaces_whole_array() {
        let cache = ModelCache::new(Duration::from_secs(60), Duration::from_secs(60));
        cache.set_listing(
            CatalogKind::OpenRouter,
            Arc::new(vec![
                record("a", CatalogKind::OpenRouter),
                record("b", CatalogKind::OpenRouter),
            ]),
        );
        cache.set_listing(
            CatalogKind::OpenRouter,
            Arc::new(vec![record("c", CatalogKind::OpenRouter)]),
        );

        let listing = cache.get_listing(CatalogKind::OpenRouter);
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].id, "c");
        assert!(cache.get_listing(CatalogKind::HuggingFace).is_empty());

        let status = cache.status();
        assert_eq!(
            status.openrouter,
            CatalogProgress {
                processed: 1,
                status: "streaming"
            }
        );
    }

    #[test]
    fn test_snapshot_survives_replacement() {
        let cache = ModelCache::new(Duration::ZERO, Duration::ZERO);
        cache.set_listing(
            CatalogKind::HuggingFace,
            Arc::new(vec![record("x", CatalogKind::HuggingFace)]),
        );
        let snapshot = cache.get_listing(CatalogKind::HuggingFace);
        cache.set_listing(CatalogKind::HuggingFace, Arc::new(Vec::new()));

        assert_eq!(snapshot.len(), 1);
        assert!(cache.get_listing(CatalogKind::HuggingFace).is_empty());
    }

    #[test]
    fn test_details_independent_of_listings() {
        let cache = ModelCache::new(Duration::from_secs(60), Duration::from_secs(60));
        cache.set_detail("org/model", detail("<p>card</p>"));
        cache.set_listing(CatalogKind::HuggingFace, Arc::new(Vec::new()));

        let cached = cache.get_detail("org/model").unwrap();
        assert_eq!(cached.readme_html.as_deref(), Some("<p>card</p>"));
        assert!(cache.get_detail("other/model").is_none());
    }

    #[test]
    fn test_listing_expiry() {
        let cache = ModelCache::new(Duration::from_millis(30), Duration::from_secs(60));
        cache.set_listing(
            CatalogKind::OpenRouter,
            Arc::new(vec![record("a", CatalogKind::OpenRouter)]),
        );
        std::thread::sleep(Duration::from_millis(80));
        assert!(cache.get_listing(CatalogKind::OpenRouter).is_empty());
    }

    #[test]
    fn test_purge_expired_details() {
        let cache = ModelCache::new(Duration::from_secs(60), Duration::from_secs(60));
        cache.set_detail_with_ttl("short", detail("a"), Duration::from_millis(20));
        cache.set_detail("long", detail("b"));
        std::thread::sleep(Duration::from_millis(60));

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.detail_count(), 1);
    }

    #[test]
    fn test_listings_serialize_by_catalog() {
        let cache = ModelCache::new(Duration::from_secs(60), Duration::from_secs(60));
        cache.set_listing(
            CatalogKind::OpenRouter,
            Arc::new(vec![record("a", CatalogKind::OpenRouter)]),
        );
        let value = serde_json::to_value(cache.get_all()).unwrap();
        assert_eq!(value["openrouter"][0]["id"], "a");
        assert_eq!(value["huggingface"], serde_json::json!([]));
    }
}

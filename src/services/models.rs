use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use serde::Serialize;

use crate::{
    cache::{Listing, ModelCache, ModelListings, ProcessingStatus},
    catalog::{CatalogKind, DetailRecord, ModelRecord, format_timestamp},
    jobs::{ModelRefresher, RefreshState},
    upstream::UpstreamClient,
};

const DETAIL_FETCH_ERROR: &str = "Failed to fetch model details";

/// Which catalogs a query covers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ModelFilter {
    #[default]
    All,
    Only(CatalogKind),
}

impl ModelFilter {
    /// Parse the optional `type` query parameter. Anything unrecognized
    /// means both catalogs.
    pub fn parse(value: Option<&str>) -> Self {
        value
            .and_then(|v| v.parse::<CatalogKind>().ok())
            .map(ModelFilter::Only)
            .unwrap_or_default()
    }
}

/// Listing data shaped by the filter: both catalogs keyed by name, or one
/// catalog as a bare array.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ModelsView {
    All(ModelListings),
    Single(Listing),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpenRouterStats {
    pub total: usize,
    pub free: usize,
    pub paid: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HuggingFaceStats {
    pub total: usize,
    pub trending: usize,
    pub popular: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelStats {
    pub openrouter: OpenRouterStats,
    pub huggingface: HuggingFaceStats,
    pub total: usize,
}

/// Cache progress plus pipeline state.
#[derive(Debug, Clone, Serialize)]
pub struct ModelStatus {
    #[serde(flatten)]
    pub processing: ProcessingStatus,
    pub pipeline: RefreshState,
}

/// Read access to the model catalog and on-demand detail enrichment.
#[derive(Clone)]
pub struct ModelService {
    cache: ModelCache,
    upstream: Arc<dyn UpstreamClient>,
    refresher: ModelRefresher,
    /// Per-model locks so concurrent requests for the same uncached detail
    /// share one upstream fetch.
    detail_locks: Arc<DetailLocks>,
}

impl ModelService {
    pub fn new(
        cache: ModelCache,
        upstream: Arc<dyn UpstreamClient>,
        refresher: ModelRefresher,
    ) -> Self {
        Self {
            cache,
            upstream,
            refresher,
            detail_locks: Arc::new(DashMap::new()),
        }
    }

    pub fn models(&self, filter: ModelFilter) -> ModelsView {
        match filter {
            ModelFilter::All => ModelsView::All(self.cache.get_all()),
            ModelFilter::Only(kind) => ModelsView::Single(self.cache.get_listing(kind)),
        }
    }

    /// Case-insensitive substring search over name, id and description.
    /// OpenRouter results come first; listing order is preserved.
    pub fn search(&self, query: &str, filter: ModelFilter) -> Vec<Arc<ModelRecord>> {
        let needle = query.to_lowercase();
        let kinds: &[CatalogKind] = match filter {
            ModelFilter::All => &CatalogKind::ALL,
            ModelFilter::Only(CatalogKind::OpenRouter) => &[CatalogKind::OpenRouter],
            ModelFilter::Only(CatalogKind::HuggingFace) => &[CatalogKind::HuggingFace],
        };

        kinds
            .iter()
            .flat_map(|kind| {
                self.cache
                    .get_listing(*kind)
                    .iter()
                    .filter(|record| matches_query(record, &needle))
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    pub fn stats(&self) -> ModelStats {
        let all = self.cache.get_all();

        let free = all.openrouter.iter().filter(|m| m.is_free()).count();
        let openrouter = OpenRouterStats {
            total: all.openrouter.len(),
            free,
            paid: all.openrouter.len() - free,
        };

        let huggingface = HuggingFaceStats {
            total: all.huggingface.len(),
            trending: all
                .huggingface
                .iter()
                .filter(|m| m.trending_score() > 100.0)
                .count(),
            popular: all.huggingface.iter().filter(|m| m.likes() > 1000.0).count(),
        };

        ModelStats {
            total: openrouter.total + huggingface.total,
            openrouter,
            huggingface,
        }
    }

    /// Model card for a Hugging Face model, fetched on first request and
    /// cached for the detail TTL.
    ///
    /// A failed fetch yields a record carrying an error message; it is not
    /// cached, so the next request retries.
    #[tracing::instrument(name = "models.details", skip(self))]
    pub async fn details(&self, model_id: &str) -> DetailRecord {
        if let Some(cached) = self.cache.get_detail(model_id) {
            tracing::debug!("Serving cached model details");
            return cached;
        }

        let lock = DetailLock::acquire(&self.detail_locks, model_id);
        let _guard = lock.mutex().lock().await;
        match self.cache.get_detail(model_id) {
            Some(cached) => cached,
            None => self.fetch_details(model_id).await,
        }
    }

    async fn fetch_details(&self, model_id: &str) -> DetailRecord {
        tracing::debug!("Fetching model details");

        match self.upstream.fetch_huggingface_readme(model_id).await {
            Ok(readme_html) => {
                let record = DetailRecord {
                    readme_html,
                    last_updated: format_timestamp(Utc::now()),
                    error: None,
                };
                self.cache.set_detail(model_id, record.clone());
                record
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to fetch model README");
                DetailRecord {
                    readme_html: None,
                    last_updated: format_timestamp(Utc::now()),
                    error: Some(DETAIL_FETCH_ERROR.to_string()),
                }
            }
        }
    }

    pub fn status(&self) -> ModelStatus {
        ModelStatus {
            processing: self.cache.status(),
            pipeline: self.refresher.state(),
        }
    }

    pub fn refresher(&self) -> &ModelRefresher {
        &self.refresher
    }
}

type DetailLocks = DashMap<String, Arc<tokio::sync::Mutex<()>>>;

/// A handle on one model's single-flight lock.
///
/// Dropping it removes the map entry once no other request holds the lock,
/// including when the request future is cancelled mid-fetch.
struct DetailLock<'a> {
    // Fields drop in order: the mutex handle goes before the cleanup runs.
    mutex: Arc<tokio::sync::Mutex<()>>,
    _cleanup: DetailLockCleanup<'a>,
}

impl<'a> DetailLock<'a> {
    fn acquire(locks: &'a DetailLocks, model_id: &'a str) -> Self {
        Self {
            mutex: locks.entry(model_id.to_string()).or_default().clone(),
            _cleanup: DetailLockCleanup { locks, model_id },
        }
    }

    fn mutex(&self) -> &tokio::sync::Mutex<()> {
        &self.mutex
    }
}

struct DetailLockCleanup<'a> {
    locks: &'a DetailLocks,
    model_id: &'a str,
}

impl Drop for DetailLockCleanup<'_> {
    fn drop(&mut self) {
        // Only the map still holds the lock when nobody else is waiting on it.
        self.locks
            .remove_if(self.model_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

fn matches_query(record: &ModelRecord, needle: &str) -> bool {
    let contains = |text: &str| text.to_lowercase().contains(needle);

    record.name().is_some_and(contains)
        || contains(&record.id)
        || record.description.as_deref().is_some_and(contains)
}

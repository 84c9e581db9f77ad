//! modeldex: an in-memory catalog of AI models aggregated from OpenRouter
//! and Hugging Face, served over a small JSON API.

pub mod cache;
pub mod catalog;
pub mod config;
pub mod icons;
pub mod jobs;
pub mod normalize;
pub mod observability;
pub mod routes;
pub mod services;
pub mod upstream;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use axum::Router;
use tokio_util::task::TaskTracker;
use tower_http::trace::TraceLayer;

use crate::{
    cache::ModelCache,
    config::ModeldexConfig,
    icons::IconResolver,
    jobs::ModelRefresher,
    normalize::SiteLinks,
    services::ModelService,
    upstream::{HttpUpstream, UpstreamClient},
};

/// Shared application state, cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub http_client: reqwest::Client,
    pub config: Arc<ModeldexConfig>,
    pub cache: ModelCache,
    pub models: ModelService,
    pub refresher: ModelRefresher,
    /// Tracks background tasks (refresh passes, streams) for graceful shutdown.
    pub task_tracker: TaskTracker,
}

impl AppState {
    /// Build the state with the HTTP upstream client.
    pub fn new(config: ModeldexConfig) -> Result<Self, reqwest::Error> {
        let http_client = config.server.http_client.build_client()?;
        let upstream = Arc::new(HttpUpstream::new(http_client.clone(), &config.catalog));
        Ok(Self::with_upstream(config, http_client, upstream))
    }

    /// Build the state around any upstream implementation.
    pub fn with_upstream(
        config: ModeldexConfig,
        http_client: reqwest::Client,
        upstream: Arc<dyn UpstreamClient>,
    ) -> Self {
        let task_tracker = TaskTracker::new();
        let cache = ModelCache::new(config.catalog.listing_ttl(), config.catalog.detail_ttl());
        let refresher = ModelRefresher::new(
            cache.clone(),
            upstream.clone(),
            IconResolver::new(&config.icons.dir, &config.icons.default_icon),
            SiteLinks::from_config(&config.catalog),
            config.catalog.throttle.clone(),
            task_tracker.clone(),
        );
        let models = ModelService::new(cache.clone(), upstream, refresher.clone());

        Self {
            http_client,
            config: Arc::new(config),
            cache,
            models,
            refresher,
            task_tracker,
        }
    }
}

/// Build the application router.
pub fn build_app(config: &ModeldexConfig, state: AppState) -> Router {
    let mut app = Router::new().nest("/api", routes::get_api_routes(&state));

    if let Some(cors_layer) = config.server.cors.clone().into_layer() {
        app = app.layer(cors_layer);
    }

    app.layer(TraceLayer::new_for_http()).with_state(state)
}

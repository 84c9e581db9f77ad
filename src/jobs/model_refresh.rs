//! Model refresh pipeline.
//!
//! A pass rebuilds both catalog listings from scratch:
//!
//! 1. Both listings are reset to empty and any Hugging Face stream left over
//!    from the previous pass is aborted.
//! 2. The OpenRouter listing is fetched and every record is normalized in
//!    order. After each record the whole accumulated array is installed in
//!    the cache, so readers watch the listing grow.
//! 3. The Hugging Face listing is fetched and handed to a detached task that
//!    fetches each model's detail record with an increasing delay between
//!    calls, installing the accumulated array after each success.
//!
//! [`ModelRefresher::run_pass`] returns once the Hugging Face stream is
//! spawned. Failures never escape a pass: upstream problems degrade to empty
//! listings and malformed records are skipped, so the next tick simply
//! starts over.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Instant,
};

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;

use crate::{
    cache::ModelCache,
    catalog::{CatalogKind, ModelRecord, RecordBuilder, format_timestamp},
    config::{CatalogConfig, ThrottleConfig},
    icons::IconResolver,
    normalize::SiteLinks,
    upstream::UpstreamClient,
};

/// Results from the synchronous part of a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshRunResult {
    /// OpenRouter models installed in the cache.
    pub openrouter_count: usize,
    /// Hugging Face summaries handed to the streaming task.
    pub huggingface_pending: usize,
    /// Duration of the synchronous part in milliseconds.
    pub duration_ms: u64,
}

/// Where the pipeline currently is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshPhase {
    #[default]
    Idle,
    FetchingOpenrouter,
    StreamingOpenrouter,
    FetchingHuggingface,
    StreamingHuggingface,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RefreshState {
    pub phase: RefreshPhase,
    pub passes_started: u64,
    /// Passes whose Hugging Face stream ran to the end. Aborted passes never
    /// complete.
    pub passes_completed: u64,
    pub last_pass_started_at: Option<String>,
    pub last_pass_completed_at: Option<String>,
}

struct Inner {
    cache: ModelCache,
    upstream: Arc<dyn UpstreamClient>,
    icons: IconResolver,
    links: SiteLinks,
    throttle: ThrottleConfig,
    task_tracker: TaskTracker,
    /// Serializes the reset and OpenRouter stage of overlapping passes.
    pass_lock: tokio::sync::Mutex<()>,
    /// The Hugging Face stream of the latest pass.
    streaming: Mutex<Option<JoinHandle<()>>>,
    state: RwLock<RefreshState>,
    /// Incremented per pass; a stream only reports completion for its own pass.
    generation: AtomicU64,
}

/// Drives refresh passes. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct ModelRefresher {
    inner: Arc<Inner>,
}

impl ModelRefresher {
    pub fn new(
        cache: ModelCache,
        upstream: Arc<dyn UpstreamClient>,
        icons: IconResolver,
        links: SiteLinks,
        throttle: ThrottleConfig,
        task_tracker: TaskTracker,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                cache,
                upstream,
                icons,
                links,
                throttle,
                task_tracker,
                pass_lock: tokio::sync::Mutex::new(()),
                streaming: Mutex::new(None),
                state: RwLock::new(RefreshState::default()),
                generation: AtomicU64::new(0),
            }),
        }
    }

    pub fn state(&self) -> RefreshState {
        self.inner.state.read().clone()
    }

    /// Start a pass in the background and return immediately.
    pub fn trigger(&self) {
        let refresher = self.clone();
        self.inner.task_tracker.spawn(async move {
            let result = refresher.run_pass().await;
            tracing::info!(
                openrouter_count = result.openrouter_count,
                huggingface_pending = result.huggingface_pending,
                duration_ms = result.duration_ms,
                "Manual model refresh started streaming"
            );
        });
    }

    /// Run one pass. Returns after the OpenRouter listing is installed and
    /// the Hugging Face stream has been spawned.
    pub async fn run_pass(&self) -> RefreshRunResult {
        let start = Instant::now();
        let _pass = self.inner.pass_lock.lock().await;

        let generation = {
            let mut streaming = self.inner.streaming.lock();
            Self::abort_handle(&mut streaming);
            let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
            let cache = &self.inner.cache;
            cache.set_listing(CatalogKind::OpenRouter, Arc::new(Vec::new()));
            cache.set_listing(CatalogKind::HuggingFace, Arc::new(Vec::new()));
            generation
        };
        {
            let mut state = self.inner.state.write();
            state.phase = RefreshPhase::FetchingOpenrouter;
            state.passes_started += 1;
            state.last_pass_started_at = Some(format_timestamp(Utc::now()));
        }

        let builder = RecordBuilder::new(self.inner.icons.snapshot(), self.inner.links.clone());

        let openrouter = self.inner.upstream.fetch_openrouter_models().await;
        if openrouter.is_empty() {
            self.warn_empty_listing(CatalogKind::OpenRouter);
        }

        self.set_phase(RefreshPhase::StreamingOpenrouter);
        let openrouter_count = self.stream_openrouter(&builder, openrouter).await;
        tracing::info!(count = openrouter_count, "Stream updated OpenRouter models");

        self.set_phase(RefreshPhase::FetchingHuggingface);
        let summaries = self.inner.upstream.fetch_huggingface_models().await;
        let huggingface_pending = summaries.len();

        if summaries.is_empty() {
            self.warn_empty_listing(CatalogKind::HuggingFace);
            self.complete_pass(generation);
        } else {
            tracing::info!(count = huggingface_pending, "Processing Hugging Face models");
            self.set_phase(RefreshPhase::StreamingHuggingface);
            let refresher = self.clone();
            let handle = self.inner.task_tracker.spawn(async move {
                refresher
                    .stream_huggingface(builder, summaries, generation)
                    .await;
            });
            *self.inner.streaming.lock() = Some(handle);
        }

        RefreshRunResult {
            openrouter_count,
            huggingface_pending,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    /// Wait for the current Hugging Face stream, if any, to finish.
    pub async fn wait_for_streaming(&self) {
        let handle = self.inner.streaming.lock().take();
        if let Some(handle) = handle {
            // An aborted stream resolves with a cancellation error.
            let _ = handle.await;
        }
    }

    /// Abort the Hugging Face stream. Already installed records stay cached.
    pub fn shutdown(&self) {
        if self.abort_streaming() {
            tracing::info!("Aborted in-flight Hugging Face stream");
        }
        self.set_phase(RefreshPhase::Idle);
    }

    /// Abort the stream and retire its generation, so a stream that is
    /// still mid-poll can no longer install records.
    fn abort_streaming(&self) -> bool {
        let mut streaming = self.inner.streaming.lock();
        let aborted = Self::abort_handle(&mut streaming);
        if aborted {
            self.inner.generation.fetch_add(1, Ordering::SeqCst);
        }
        aborted
    }

    fn abort_handle(streaming: &mut Option<JoinHandle<()>>) -> bool {
        match streaming.take() {
            Some(handle) if !handle.is_finished() => {
                handle.abort();
                true
            }
            _ => false,
        }
    }

    /// Install a Hugging Face snapshot unless a newer pass has taken over.
    ///
    /// Runs under the `streaming` lock, which is also held while a new pass
    /// resets the listings, so a retired stream can never write after a reset.
    fn install_huggingface(&self, generation: u64, records: &[Arc<ModelRecord>]) -> bool {
        let _streaming = self.inner.streaming.lock();
        if self.inner.generation.load(Ordering::SeqCst) != generation {
            return false;
        }
        self.inner
            .cache
            .set_listing(CatalogKind::HuggingFace, Arc::new(records.to_vec()));
        true
    }

    async fn stream_openrouter(&self, builder: &RecordBuilder, models: Vec<Value>) -> usize {
        let mut records = Vec::with_capacity(models.len());

        for (index, raw) in models.into_iter().enumerate() {
            match builder.openrouter(raw) {
                Ok(record) => {
                    records.push(Arc::new(record));
                    self.inner
                        .cache
                        .set_listing(CatalogKind::OpenRouter, Arc::new(records.clone()));
                }
                Err(e) => {
                    tracing::warn!(index, error = %e, "Skipping malformed OpenRouter model");
                }
            }
            // Normalization is CPU-bound; let readers and other tasks run.
            tokio::task::yield_now().await;
        }

        records.len()
    }

    async fn stream_huggingface(
        self,
        builder: RecordBuilder,
        summaries: Vec<Value>,
        generation: u64,
    ) {
        let mut records = Vec::with_capacity(summaries.len());

        for (index, summary) in summaries.into_iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(self.inner.throttle.delay_for(index - 1)).await;
            }

            let Some(model_id) = summary.get("id").and_then(Value::as_str).map(str::to_string)
            else {
                tracing::warn!(index, "Skipping Hugging Face model without id");
                continue;
            };

            let Some(detail) = self.inner.upstream.fetch_huggingface_model(&model_id).await else {
                tracing::debug!(model_id = %model_id, "No detail record, skipping model");
                continue;
            };

            match builder.huggingface(summary, detail) {
                Ok(record) => {
                    records.push(Arc::new(record));
                    if !self.install_huggingface(generation, &records) {
                        tracing::debug!(generation, "Stream superseded by a newer pass");
                        return;
                    }
                }
                Err(e) => {
                    tracing::warn!(model_id = %model_id, error = %e, "Skipping malformed Hugging Face model");
                }
            }
        }

        tracing::info!(count = records.len(), "Stream completed Hugging Face models");
        self.complete_pass(generation);
    }

    fn complete_pass(&self, generation: u64) {
        if self.inner.generation.load(Ordering::SeqCst) != generation {
            return;
        }
        let mut state = self.inner.state.write();
        state.phase = RefreshPhase::Idle;
        state.passes_completed += 1;
        state.last_pass_completed_at = Some(format_timestamp(Utc::now()));
    }

    fn set_phase(&self, phase: RefreshPhase) {
        self.inner.state.write().phase = phase;
    }

    fn warn_empty_listing(&self, kind: CatalogKind) {
        let cache = &self.inner.cache;
        tracing::warn!(
            catalog = %kind,
            openrouter_cached = cache.get_listing(CatalogKind::OpenRouter).len(),
            huggingface_cached = cache.get_listing(CatalogKind::HuggingFace).len(),
            "Upstream returned no models"
        );
    }
}

/// Starts the model refresh worker as a background task.
///
/// Runs a pass immediately, then one per configured interval, until the task
/// is cancelled.
pub async fn start_model_refresh_worker(refresher: ModelRefresher, config: CatalogConfig) {
    if !config.enabled {
        tracing::info!("Model refresh worker disabled by configuration");
        return;
    }

    tracing::info!(
        refresh_interval_secs = config.refresh_interval_secs,
        openrouter_url = %config.openrouter.api_url,
        huggingface_url = %config.huggingface.api_url,
        "Starting model refresh worker"
    );

    let interval = config.refresh_interval();

    let result = refresher.run_pass().await;
    log_pass("Initial model refresh streaming", &result);

    loop {
        tokio::time::sleep(interval).await;

        let result = refresher.run_pass().await;
        log_pass("Model refresh streaming", &result);
    }
}

fn log_pass(message: &str, result: &RefreshRunResult) {
    tracing::info!(
        openrouter_count = result.openrouter_count,
        huggingface_pending = result.huggingface_pending,
        duration_ms = result.duration_ms,
        "{message}"
    );
}

//! Background jobs.
//!
//! - **Model refresh**: rebuilds both catalog listings from the upstream
//!   APIs, streaming partial results into the cache as records are
//!   normalized.
//! - **Cache purge**: sweeps expired entries out of the model cache.
//!
//! Jobs follow a consistent pattern:
//! 1. Configuration in `config/catalog.rs`
//! 2. Worker function that runs in a loop with configurable interval
//! 3. Run function that performs a single pass
//! 4. Structured result type for logging
//!
//! # Example
//!
//! ```toml
//! [catalog]
//! enabled = true
//! refresh_interval_secs = 600
//! purge_interval_secs = 600
//! ```

mod cache_purge;
mod model_refresh;

pub use cache_purge::start_cache_purge_worker;
pub use model_refresh::{
    ModelRefresher, RefreshPhase, RefreshRunResult, RefreshState, start_model_refresh_worker,
};

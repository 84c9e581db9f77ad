//! In-memory caching.
//!
//! [`TtlStore`] is a concurrent map with per-entry expiry. [`ModelCache`]
//! composes two of them: one for the per-catalog listings the refresh
//! pipeline writes, and one for lazily fetched model details.

mod memory;
mod model_cache;

pub use memory::TtlStore;
pub use model_cache::{CatalogProgress, Listing, ModelCache, ModelListings, ProcessingStatus};

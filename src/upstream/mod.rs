//! Clients for the upstream model catalogs.
//!
//! Two catalogs are consulted:
//! - **OpenRouter**: a unified inference-routing API with one bulk listing
//!   that already carries pricing, context length and architecture.
//! - **Hugging Face**: an open model hub whose bulk listing holds summaries
//!   only; full records come from a per-model detail call and the model card
//!   (README) is fetched on demand.
//!
//! Listing and detail calls never fail from the caller's point of view: any
//! transport, status or decode problem is logged and degrades to an empty
//! listing or an absent record. Only the README call reports errors, so the
//! lazy detail endpoint can tell "no README" apart from "fetch failed".

mod client;

use async_trait::async_trait;
pub use client::HttpUpstream;
use serde_json::Value;

/// Access to both upstream catalogs.
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    /// Raw OpenRouter model records (the `data` array of the listing).
    async fn fetch_openrouter_models(&self) -> Vec<Value>;

    /// Raw Hugging Face model summaries.
    async fn fetch_huggingface_models(&self) -> Vec<Value>;

    /// Full Hugging Face record for one model. `None` when the hub has no
    /// record (404) or the call failed.
    async fn fetch_huggingface_model(&self, model_id: &str) -> Option<Value>;

    /// The model card rendered to HTML, with relative links made absolute.
    /// `Ok(None)` when the repository has no README.
    async fn fetch_huggingface_readme(
        &self,
        model_id: &str,
    ) -> Result<Option<String>, UpstreamError>;
}

/// Errors from upstream catalog calls.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },
}

impl UpstreamError {
    /// Whether the upstream reported the resource as missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, UpstreamError::Status { status: 404, .. })
    }
}

#[cfg(test)]
pub mod test_utils;

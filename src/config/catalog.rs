use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Upstream catalogs, refresh cadence and cache lifetimes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogConfig {
    /// Whether the background refresh worker runs.
    /// Manual refreshes through the API work either way.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Interval between refresh passes in seconds.
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,

    /// Lifetime of the listing arrays in seconds. 0 disables expiry.
    #[serde(default = "default_listing_ttl_secs")]
    pub listing_ttl_secs: u64,

    /// Lifetime of lazily fetched model details in seconds. 0 disables expiry.
    #[serde(default = "default_detail_ttl_secs")]
    pub detail_ttl_secs: u64,

    /// Interval between sweeps of expired cache entries in seconds.
    #[serde(default = "default_purge_interval_secs")]
    pub purge_interval_secs: u64,

    #[serde(default)]
    pub openrouter: OpenRouterConfig,

    #[serde(default)]
    pub huggingface: HuggingFaceConfig,

    /// Pacing of per-model Hugging Face detail calls.
    #[serde(default)]
    pub throttle: ThrottleConfig,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            refresh_interval_secs: default_refresh_interval_secs(),
            listing_ttl_secs: default_listing_ttl_secs(),
            detail_ttl_secs: default_detail_ttl_secs(),
            purge_interval_secs: default_purge_interval_secs(),
            openrouter: OpenRouterConfig::default(),
            huggingface: HuggingFaceConfig::default(),
            throttle: ThrottleConfig::default(),
        }
    }
}

impl CatalogConfig {
    pub(super) fn validate(&self) -> Result<(), ConfigError> {
        if self.refresh_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "catalog.refresh_interval_secs must be greater than 0".into(),
            ));
        }
        if self.purge_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "catalog.purge_interval_secs must be greater than 0".into(),
            ));
        }
        if self.detail_ttl_secs > self.listing_ttl_secs && self.listing_ttl_secs != 0 {
            tracing::warn!(
                detail_ttl_secs = self.detail_ttl_secs,
                listing_ttl_secs = self.listing_ttl_secs,
                "Model details outlive the listings they belong to"
            );
        }
        self.throttle.validate()
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn listing_ttl(&self) -> Duration {
        Duration::from_secs(self.listing_ttl_secs)
    }

    pub fn detail_ttl(&self) -> Duration {
        Duration::from_secs(self.detail_ttl_secs)
    }
}

fn default_true() -> bool {
    true
}

fn default_refresh_interval_secs() -> u64 {
    600 // 10 minutes
}

fn default_listing_ttl_secs() -> u64 {
    7200 // 2 hours
}

fn default_detail_ttl_secs() -> u64 {
    7200
}

fn default_purge_interval_secs() -> u64 {
    600
}

/// OpenRouter (unified routing API) endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OpenRouterConfig {
    /// Bulk model listing endpoint.
    #[serde(default = "default_openrouter_api_url")]
    pub api_url: String,

    /// Public site, used for model page links and absolute document links.
    #[serde(default = "default_openrouter_site_url")]
    pub site_url: String,
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            api_url: default_openrouter_api_url(),
            site_url: default_openrouter_site_url(),
        }
    }
}

fn default_openrouter_api_url() -> String {
    "https://openrouter.ai/api/v1/models".to_string()
}

fn default_openrouter_site_url() -> String {
    "https://openrouter.ai".to_string()
}

/// Hugging Face (open model hub) endpoints and credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HuggingFaceConfig {
    /// Model listing endpoint. Per-model details live at `{api_url}/{model_id}`.
    #[serde(default = "default_huggingface_api_url")]
    pub api_url: String,

    /// Public site, used for model links and README downloads.
    #[serde(default = "default_huggingface_site_url")]
    pub site_url: String,

    /// Environment variable holding an optional bearer token for detail calls.
    #[serde(default = "default_huggingface_token_env")]
    pub api_token_env: Option<String>,
}

impl Default for HuggingFaceConfig {
    fn default() -> Self {
        Self {
            api_url: default_huggingface_api_url(),
            site_url: default_huggingface_site_url(),
            api_token_env: default_huggingface_token_env(),
        }
    }
}

impl HuggingFaceConfig {
    /// Read the bearer token from the configured environment variable.
    /// Unset or empty values mean anonymous access.
    pub fn api_token(&self) -> Option<String> {
        let var = self.api_token_env.as_deref()?;
        std::env::var(var).ok().filter(|token| !token.trim().is_empty())
    }
}

fn default_huggingface_api_url() -> String {
    "https://huggingface.co/api/models".to_string()
}

fn default_huggingface_site_url() -> String {
    "https://huggingface.co".to_string()
}

fn default_huggingface_token_env() -> Option<String> {
    Some("HUGGINGFACE_API_TOKEN".to_string())
}

/// Increasing delay between per-model Hugging Face calls:
/// `min(initial_delay_ms + index * step_ms, max_delay_ms)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ThrottleConfig {
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    #[serde(default = "default_step_ms")]
    pub step_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay_ms(),
            step_ms: default_step_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl ThrottleConfig {
    /// No pacing at all. Used by tests.
    pub fn disabled() -> Self {
        Self {
            initial_delay_ms: 0,
            step_ms: 0,
            max_delay_ms: 0,
        }
    }

    /// Delay to wait after the item at `index`.
    pub fn delay_for(&self, index: usize) -> Duration {
        let ms = self
            .initial_delay_ms
            .saturating_add((index as u64).saturating_mul(self.step_ms))
            .min(self.max_delay_ms);
        Duration::from_millis(ms)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_delay_ms > self.max_delay_ms {
            return Err(ConfigError::Validation(
                "catalog.throttle.initial_delay_ms must not exceed max_delay_ms".into(),
            ));
        }
        Ok(())
    }
}

fn default_initial_delay_ms() -> u64 {
    100
}

fn default_step_ms() -> u64 {
    10
}

fn default_max_delay_ms() -> u64 {
    500
}

/// Local icon assets served under `/api/icons`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IconsConfig {
    /// Directory containing `.svg`, `.png`, `.jpg` and `.jpeg` icons.
    #[serde(default = "default_icons_dir")]
    pub dir: PathBuf,

    /// Filename returned when nothing matches.
    #[serde(default = "default_icon")]
    pub default_icon: String,
}

impl Default for IconsConfig {
    fn default() -> Self {
        Self {
            dir: default_icons_dir(),
            default_icon: default_icon(),
        }
    }
}

impl IconsConfig {
    pub(super) fn validate(&self) -> Result<(), ConfigError> {
        if self.default_icon.is_empty() || self.default_icon.contains('/') {
            return Err(ConfigError::Validation(
                "icons.default_icon must be a plain filename".into(),
            ));
        }
        Ok(())
    }
}

fn default_icons_dir() -> PathBuf {
    PathBuf::from("models-icons")
}

fn default_icon() -> String {
    "default.png".to_string()
}

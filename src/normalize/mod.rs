//! Pure normalization helpers for upstream catalog records.
//!
//! Everything here is synchronous and total: upstream payloads are untyped
//! JSON and any field may be missing or of an unexpected type, so every
//! accessor degrades to a neutral value instead of failing.

mod description;
mod document;
mod locale;
mod pricing;

pub use description::{generate_description, group_thousands};
pub use document::{generate_long_form_document, render_markdown, rewrite_readme_links};
pub use locale::Locale;
pub use pricing::{
    PriceDisplay, PricingConverted, convert_pricing, format_price_display, format_raw_price,
    parse_rate,
};

use crate::config::CatalogConfig;

/// Public site roots used to build model links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteLinks {
    pub openrouter: String,
    pub huggingface: String,
}

impl Default for SiteLinks {
    fn default() -> Self {
        Self {
            openrouter: "https://openrouter.ai".to_string(),
            huggingface: "https://huggingface.co".to_string(),
        }
    }
}

impl SiteLinks {
    pub fn from_config(config: &CatalogConfig) -> Self {
        Self {
            openrouter: config.openrouter.site_url.trim_end_matches('/').to_string(),
            huggingface: config.huggingface.site_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn openrouter_model(&self, id: &str) -> String {
        format!("{}/models/{}", self.openrouter, id)
    }

    pub fn huggingface_model(&self, id: &str) -> String {
        format!("{}/{}", self.huggingface, id)
    }
}

/// Non-empty string field of a JSON object.
pub(crate) fn str_field<'a>(value: &'a serde_json::Value, key: &str) -> Option<&'a str> {
    value
        .get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
}

/// Positive numeric field of a JSON object, accepting integers and floats.
pub(crate) fn positive_number(value: &serde_json::Value, key: &str) -> Option<f64> {
    value
        .get(key)
        .and_then(|v| v.as_f64())
        .filter(|n| n.is_finite() && *n > 0.0)
}

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::normalize::PricingConverted;

/// The upstream catalog a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogKind {
    OpenRouter,
    HuggingFace,
}

impl CatalogKind {
    pub const ALL: [CatalogKind; 2] = [CatalogKind::OpenRouter, CatalogKind::HuggingFace];

    pub fn as_str(&self) -> &'static str {
        match self {
            CatalogKind::OpenRouter => "openrouter",
            CatalogKind::HuggingFace => "huggingface",
        }
    }
}

impl fmt::Display for CatalogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CatalogKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "openrouter" => Ok(CatalogKind::OpenRouter),
            "huggingface" => Ok(CatalogKind::HuggingFace),
            other => Err(format!("unknown catalog: {other}")),
        }
    }
}

/// Keys owned by [`ModelRecord`]'s typed fields. Upstream values under these
/// keys are dropped from the pass-through map.
pub(crate) const RESERVED_KEYS: &[&str] = &[
    "id",
    "type",
    "icon",
    "openrouter_link",
    "huggingface_link",
    "pricing_converted",
    "created_date",
    "description",
    "description_zh",
    "readme_html",
    "readme_html_zh",
];

/// A normalized model from either catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRecord {
    pub id: String,

    #[serde(rename = "type")]
    pub kind: CatalogKind,

    pub icon: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openrouter_link: Option<String>,

    #[serde(default)]
    pub huggingface_link: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pricing_converted: Option<PricingConverted>,

    #[serde(default)]
    pub created_date: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description_zh: Option<String>,

    /// Always present for OpenRouter models. Hugging Face models carry
    /// `null` here; their model card is served by the detail endpoint.
    #[serde(default)]
    pub readme_html: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readme_html_zh: Option<String>,

    /// Upstream fields passed through unmodified.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ModelRecord {
    /// Display name, when upstream provides one.
    pub fn name(&self) -> Option<&str> {
        self.extra.get("name").and_then(Value::as_str)
    }

    /// Hugging Face trending score, `0` when absent.
    pub fn trending_score(&self) -> f64 {
        self.extra
            .get("trendingScore")
            .and_then(Value::as_f64)
            .unwrap_or(0.0)
    }

    /// Hugging Face like count, `0` when absent.
    pub fn likes(&self) -> f64 {
        self.extra.get("likes").and_then(Value::as_f64).unwrap_or(0.0)
    }

    /// Free to prompt. Models without pricing information count as paid.
    pub fn is_free(&self) -> bool {
        self.pricing_converted
            .as_ref()
            .is_some_and(PricingConverted::is_free)
    }
}

/// Lazily fetched model card for a Hugging Face model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailRecord {
    pub readme_html: Option<String>,

    pub last_updated: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

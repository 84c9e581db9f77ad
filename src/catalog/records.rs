use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde_json::{Map, Value};

use super::types::{CatalogKind, ModelRecord, RESERVED_KEYS};
use crate::{
    icons::IconSet,
    normalize::{self, Locale, SiteLinks},
};

/// RFC 3339 UTC timestamp with millisecond precision (`2024-05-01T12:00:00.000Z`).
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Why an upstream record could not be normalized.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("record is not a JSON object")]
    NotAnObject,

    #[error("record has no string id")]
    MissingId,
}

/// Normalizes raw upstream records for one refresh pass.
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    icons: IconSet,
    links: SiteLinks,
}

impl RecordBuilder {
    pub fn new(icons: IconSet, links: SiteLinks) -> Self {
        Self { icons, links }
    }

    /// Fully materialize an OpenRouter record, including both generated
    /// descriptions and both rendered documents.
    pub fn openrouter(&self, raw: Value) -> Result<ModelRecord, RecordError> {
        let Value::Object(fields) = raw else {
            return Err(RecordError::NotAnObject);
        };
        let id = string_id(&fields)?;
        let raw = Value::Object(fields);

        let huggingface_link =
            trimmed_str(&raw, "hugging_face_id").map(|hf_id| self.links.huggingface_model(hf_id));
        let pricing_converted = raw.get("pricing").and_then(normalize::convert_pricing);
        let created_date = raw.get("created").and_then(epoch_to_timestamp);

        let record = ModelRecord {
            icon: self.icons.resolve(&id),
            openrouter_link: Some(self.links.openrouter_model(&id)),
            huggingface_link,
            pricing_converted,
            created_date,
            description: Some(normalize::generate_description(&raw, Locale::En)),
            description_zh: Some(normalize::generate_description(&raw, Locale::Zh)),
            readme_html: Some(normalize::generate_long_form_document(
                &raw,
                Locale::En,
                &self.links,
            )),
            readme_html_zh: Some(normalize::generate_long_form_document(
                &raw,
                Locale::Zh,
                &self.links,
            )),
            kind: CatalogKind::OpenRouter,
            extra: passthrough(raw),
            id,
        };

        Ok(record)
    }

    /// Merge a Hugging Face summary with its detail record (detail fields
    /// win). The model card is left for lazy loading.
    pub fn huggingface(&self, summary: Value, detail: Value) -> Result<ModelRecord, RecordError> {
        let Value::Object(mut merged) = summary else {
            return Err(RecordError::NotAnObject);
        };
        let id = string_id(&merged)?;

        if let Value::Object(detail) = detail {
            merged.extend(detail);
        }

        let created_date = merged.get("createdAt").and_then(date_to_timestamp);
        let description = merged
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok(ModelRecord {
            icon: self.icons.resolve(&id),
            openrouter_link: None,
            huggingface_link: Some(self.links.huggingface_model(&id)),
            pricing_converted: None,
            created_date,
            description,
            description_zh: None,
            readme_html: None,
            readme_html_zh: None,
            kind: CatalogKind::HuggingFace,
            extra: passthrough(Value::Object(merged)),
            id,
        })
    }
}

fn string_id(fields: &Map<String, Value>) -> Result<String, RecordError> {
    fields
        .get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or(RecordError::MissingId)
}

fn trimmed_str<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn passthrough(raw: Value) -> Map<String, Value> {
    let Value::Object(mut fields) = raw else {
        return Map::new();
    };
    for key in RESERVED_KEYS {
        fields.remove(*key);
    }
    fields
}

fn epoch_to_timestamp(value: &Value) -> Option<String> {
    let secs = value.as_f64().filter(|s| s.is_finite())?;
    DateTime::from_timestamp_millis((secs * 1000.0) as i64).map(format_timestamp)
}

fn date_to_timestamp(value: &Value) -> Option<String> {
    let raw = value.as_str()?;
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(format_timestamp(at.with_timezone(&Utc)));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
    Some(format_timestamp(date.and_hms_opt(0, 0, 0)?.and_utc()))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::icons::IconResolver;

    fn builder(icons: &[&str]) -> (RecordBuilder, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        for icon in icons {
            std::fs::write(dir.path().join(icon), b"icon").unwrap();
        }
        let set = IconResolver::new(dir.path(), "default.png").snapshot();
        (RecordBuilder::new(set, SiteLinks::default()), dir)
    }

    #[test]
    fn test_openrouter_record() {
        let (builder, _dir) = builder(&["openai.svg"]);
        let record = builder
            .openrouter(json!({
                "id": "openai/gpt-4o",
                "name": "GPT-4o",
                "created": 1714564800,
                "description": "Upstream prose",
                "context_length": 128000,
                "pricing": {"prompt": "0.0000025", "completion": "0.00001"},
                "hugging_face_id": "",
                "top_provider": {"is_moderated": true}
            }))
            .unwrap();

        assert_eq!(record.kind, CatalogKind::OpenRouter);
        assert_eq!(record.icon, "openai.svg");
        assert_eq!(
            record.openrouter_link.as_deref(),
            Some("https://openrouter.ai/models/openai/gpt-4o")
        );
        assert_eq!(record.huggingface_link, None);
        assert_eq!(record.created_date.as_deref(), Some("2024-05-01T12:00:00.000Z"));
        assert_eq!(record.pricing_converted.unwrap().prompt, 0.0000025);
        assert!(
            record
                .description
                .as_deref()
                .unwrap()
                .starts_with("GPT-4o is an AI model")
        );
        assert!(record.description_zh.as_deref().unwrap().contains("128,000"));
        assert!(record.readme_html.as_deref().unwrap().contains("Upstream prose"));
        assert!(record.readme_html_zh.is_some());
        assert_eq!(record.name(), Some("GPT-4o"));
        assert_eq!(record.extra["top_provider"]["is_moderated"], true);
        // Computed keys never leak through the pass-through map.
        assert!(!record.extra.contains_key("description"));
        assert!(!record.extra.contains_key("id"));
    }

    #[test]
    fn test_openrouter_record_links_huggingface_id() {
        let (builder, _dir) = builder(&[]);
        let record = builder
            .openrouter(json!({"id": "meta-llama/llama-3-8b", "hugging_face_id": "meta-llama/Meta-Llama-3-8B"}))
            .unwrap();
        assert_eq!(
            record.huggingface_link.as_deref(),
            Some("https://huggingface.co/meta-llama/Meta-Llama-3-8B")
        );
        assert_eq!(record.icon, "default.png");
        assert_eq!(record.pricing_converted, None);
        assert_eq!(record.created_date, None);
    }

    #[test]
    fn test_openrouter_record_requires_string_id() {
        let (builder, _dir) = builder(&[]);
        assert_eq!(
            builder.openrouter(json!({"id": 42})).unwrap_err(),
            RecordError::MissingId
        );
        assert_eq!(
            builder.openrouter(json!(["not", "an", "object"])).unwrap_err(),
            RecordError::NotAnObject
        );
    }

    #[test]
    fn test_huggingface_record_merges_detail() {
        let (builder, _dir) = builder(&["llama.png"]);
        let record = builder
            .huggingface(
                json!({"id": "meta-llama/Llama-3-8B", "likes": 10, "createdAt": "2024-04-17T09:35:12.000Z"}),
                json!({"likes": 5000, "cardData": {"license": "llama3"}, "readme_html": "<p>x</p>"}),
            )
            .unwrap();

        assert_eq!(record.kind, CatalogKind::HuggingFace);
        assert_eq!(record.icon, "llama.png");
        assert_eq!(
            record.huggingface_link.as_deref(),
            Some("https://huggingface.co/meta-llama/Llama-3-8B")
        );
        assert_eq!(record.created_date.as_deref(), Some("2024-04-17T09:35:12.000Z"));
        assert_eq!(record.likes(), 5000.0);
        assert_eq!(record.extra["cardData"]["license"], "llama3");
        assert_eq!(record.readme_html, None);
        assert_eq!(record.openrouter_link, None);
    }

    #[test]
    fn test_date_parsing() {
        assert_eq!(
            date_to_timestamp(&json!("2024-04-17T11:35:12+02:00")).as_deref(),
            Some("2024-04-17T09:35:12.000Z")
        );
        assert_eq!(
            date_to_timestamp(&json!("2024-04-17")).as_deref(),
            Some("2024-04-17T00:00:00.000Z")
        );
        assert_eq!(date_to_timestamp(&json!("yesterday")), None);
        assert_eq!(epoch_to_timestamp(&json!("1714564800")), None);
    }
}

//! Short capability descriptions for OpenRouter models.

use serde_json::Value;

use super::{Locale, positive_number, str_field};

/// Known modality patterns, matched as case-insensitive substrings in order.
const MODALITIES: &[(&str, &str, &str)] = &[
    ("text->text", "text to text", "文本到文本"),
    ("text+image->text", "text and image to text", "文本+图片到文本"),
    ("text->image", "text to image", "文本到图片"),
    ("image->text", "image to text", "图片到文本"),
    ("text+image->image", "text and image to image", "文本+图片到图片"),
    ("image->image", "image to image", "图片到图片"),
    ("audio->text", "audio to text", "音频到文本"),
    ("text->audio", "text to audio", "文本到音频"),
    ("multimodal", "multimodal", "多模态"),
];

/// Natural-language name for an architecture modality. Unknown modalities
/// are returned verbatim.
fn describe_modality(modality: &str, locale: Locale) -> String {
    let lower = modality.to_lowercase();
    MODALITIES
        .iter()
        .find(|(pattern, _, _)| lower.contains(pattern))
        .map(|(_, en, zh)| match locale {
            Locale::En => (*en).to_string(),
            Locale::Zh => (*zh).to_string(),
        })
        .unwrap_or_else(|| modality.to_string())
}

/// Format a non-negative number with comma thousands separators.
///
/// Fractional values are rounded to the nearest integer.
pub fn group_thousands(n: f64) -> String {
    let digits = format!("{:.0}", n.max(0.0));
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Generate a one-paragraph description of an OpenRouter model.
pub fn generate_description(record: &Value, locale: Locale) -> String {
    let name = str_field(record, "name")
        .or_else(|| str_field(record, "id"))
        .unwrap_or_default();

    let mut description = match locale {
        Locale::En => format!("{name} is an AI model available through OpenRouter's unified API."),
        Locale::Zh => format!("{name} 是一个通过 OpenRouter 统一 API 提供的 AI 模型。"),
    };

    if let Some(context) = positive_number(record, "context_length") {
        let n = group_thousands(context);
        match locale {
            Locale::En => description.push_str(&format!(" It supports up to {n} tokens of context.")),
            Locale::Zh => description.push_str(&format!(" 它支持最多 {n} 个 token 的上下文。")),
        }
    }

    if let Some(modality) = record
        .get("architecture")
        .and_then(|arch| str_field(arch, "modality"))
    {
        let m = describe_modality(modality, locale);
        match locale {
            Locale::En => description.push_str(&format!(" This model specializes in {m} tasks.")),
            Locale::Zh => description.push_str(&format!(" 该模型专注于 {m} 任务。")),
        }
    }

    description
}

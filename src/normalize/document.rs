//! Long-form model documents rendered to HTML.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use pulldown_cmark::{Options, Parser, html};
use regex::Regex;
use serde_json::Value;

use super::{
    Locale, PriceDisplay, SiteLinks, group_thousands, parse_rate, positive_number, str_field,
};

static ROOT_RELATIVE_LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\]\(/([^)]*)\)").expect("valid regex"));

/// Render CommonMark (with tables and strikethrough) to HTML.
pub fn render_markdown(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let parser = Parser::new_ext(markdown, options);
    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

/// Make links in a Hugging Face README absolute.
///
/// `](./x)` resolves against the repository's main branch and `](/x)`
/// against the site root.
pub fn rewrite_readme_links(markdown: &str, site_url: &str, model_id: &str) -> String {
    let site = site_url.trim_end_matches('/');
    markdown
        .replace("](./", &format!("]({site}/{model_id}/resolve/main/"))
        .replace("](/", &format!("]({site}/"))
}

struct Labels {
    overview: &'static str,
    overview_line: &'static str,
    description: &'static str,
    details: &'static str,
    model_id: &'static str,
    provider: &'static str,
    created: &'static str,
    context_length: &'static str,
    context_unit: &'static str,
    architecture: &'static str,
    tokenizer: &'static str,
    unknown: &'static str,
    pricing: &'static str,
    input: &'static str,
    output: &'static str,
    image: &'static str,
    free: &'static str,
    not_specified: &'static str,
    parameters: &'static str,
    usage: &'static str,
    usage_line: &'static str,
    prompt_placeholder: &'static str,
    links: &'static str,
    openrouter_page: &'static str,
    huggingface_page: &'static str,
    date_format: &'static str,
}

const EN: Labels = Labels {
    overview: "Overview",
    overview_line: "is an AI model available through [OpenRouter](/)'s unified API platform.",
    description: "Description",
    details: "Model Details",
    model_id: "Model ID",
    provider: "Provider",
    created: "Created",
    context_length: "Context Length",
    context_unit: "tokens",
    architecture: "Architecture",
    tokenizer: "Tokenizer",
    unknown: "Unknown",
    pricing: "Pricing",
    input: "Input",
    output: "Output",
    image: "Image",
    free: "Free",
    not_specified: "Not specified",
    parameters: "Supported Parameters",
    usage: "Usage",
    usage_line: "This model can be accessed through the OpenRouter API:",
    prompt_placeholder: "Your prompt here",
    links: "Links",
    openrouter_page: "OpenRouter Model Page",
    huggingface_page: "HuggingFace Page",
    date_format: "%-m/%-d/%Y",
};

const ZH: Labels = Labels {
    overview: "概述",
    overview_line: "是一个通过 [OpenRouter](/) 统一 API 平台提供的 AI 模型。",
    description: "描述",
    details: "模型详情",
    model_id: "模型 ID",
    provider: "提供商",
    created: "创建时间",
    context_length: "上下文长度",
    context_unit: "个 token",
    architecture: "架构",
    tokenizer: "分词器",
    unknown: "未知",
    pricing: "价格",
    input: "输入",
    output: "输出",
    image: "图像",
    free: "免费",
    not_specified: "未指定",
    parameters: "支持的参数",
    usage: "使用方法",
    usage_line: "可以通过 OpenRouter API 访问此模型：",
    prompt_placeholder: "在此输入您的提示",
    links: "链接",
    openrouter_page: "OpenRouter 模型页面",
    huggingface_page: "HuggingFace 页面",
    date_format: "%Y/%-m/%-d",
};

fn labels(locale: Locale) -> &'static Labels {
    match locale {
        Locale::En => &EN,
        Locale::Zh => &ZH,
    }
}

/// Generate the long-form document for an OpenRouter model as HTML.
///
/// Root-relative links in the markdown (including any in the upstream
/// description) are made absolute against the OpenRouter site.
pub fn generate_long_form_document(record: &Value, locale: Locale, links: &SiteLinks) -> String {
    let markdown = long_form_markdown(record, locale, links);
    let site = links.openrouter.trim_end_matches('/');
    let absolute = ROOT_RELATIVE_LINK_RE.replace_all(&markdown, |caps: &regex::Captures<'_>| {
        format!("]({}/{})", site, &caps[1])
    });
    render_markdown(&absolute)
}

fn long_form_markdown(record: &Value, locale: Locale, links: &SiteLinks) -> String {
    let l = labels(locale);
    let id = str_field(record, "id").unwrap_or_default();
    let name = str_field(record, "name").unwrap_or(id);
    let provider = id.split('/').next().unwrap_or(id);

    // Writing to a String cannot fail.
    let mut md = String::new();
    let _ = writeln!(md, "# {name}\n");
    let _ = writeln!(md, "## {}\n", l.overview);
    let _ = writeln!(md, "**{name}** {}\n", l.overview_line);

    if let Some(description) = str_field(record, "description") {
        let _ = writeln!(md, "### {}\n{description}\n", l.description);
    }

    let _ = writeln!(md, "## {}\n", l.details);
    let _ = writeln!(md, "- **{}**: `{id}`", l.model_id);
    let _ = writeln!(md, "- **{}**: {provider}", l.provider);
    let created = epoch_seconds(record.get("created"))
        .map(|date| date.format(l.date_format).to_string())
        .unwrap_or_else(|| l.unknown.to_string());
    let _ = writeln!(md, "- **{}**: {created}", l.created);

    if let Some(context) = positive_number(record, "context_length") {
        let _ = writeln!(
            md,
            "- **{}**: {} {}",
            l.context_length,
            group_thousands(context),
            l.context_unit
        );
    }

    if let Some(architecture) = record.get("architecture").filter(|a| a.is_object()) {
        let modality = str_field(architecture, "modality").unwrap_or(l.unknown);
        let _ = writeln!(md, "- **{}**: {modality}", l.architecture);
        if let Some(tokenizer) = str_field(architecture, "tokenizer") {
            let _ = writeln!(md, "- **{}**: {tokenizer}", l.tokenizer);
        }
    }

    let _ = writeln!(md, "\n## {}\n", l.pricing);
    match record.get("pricing").filter(|p| p.is_object()) {
        Some(pricing) => {
            let price = |key: &str| {
                PriceDisplay::from_rate(pricing.get(key).map(parse_rate).unwrap_or(0.0))
            };
            let show = |display: &PriceDisplay| match display {
                PriceDisplay::Free => l.free.to_string(),
                paid => paid.to_string(),
            };
            let _ = writeln!(md, "- **{}**: {}", l.input, show(&price("prompt")));
            let _ = writeln!(md, "- **{}**: {}", l.output, show(&price("completion")));
            let image = price("image");
            if !image.is_free() {
                let _ = writeln!(md, "- **{}**: {}", l.image, show(&image));
            }
        }
        None => {
            let _ = writeln!(md, "- **{}**: {}", l.pricing, l.not_specified);
        }
    }

    let parameters: Vec<&str> = record
        .get("supported_parameters")
        .and_then(|p| p.as_array())
        .map(|params| params.iter().filter_map(|p| p.as_str()).collect())
        .unwrap_or_default();
    if !parameters.is_empty() {
        let _ = writeln!(md, "\n## {}\n", l.parameters);
        for param in parameters {
            let _ = writeln!(md, "- `{param}`");
        }
    }

    let _ = writeln!(md, "\n## {}\n", l.usage);
    let _ = writeln!(md, "{}\n", l.usage_line);
    let _ = writeln!(md, "```javascript");
    let _ = writeln!(
        md,
        "const response = await fetch('{}/api/v1/chat/completions', {{",
        links.openrouter
    );
    let _ = writeln!(md, "  method: 'POST',");
    let _ = writeln!(md, "  headers: {{");
    let _ = writeln!(md, "    'Authorization': 'Bearer YOUR_API_KEY',");
    let _ = writeln!(md, "    'Content-Type': 'application/json'");
    let _ = writeln!(md, "  }},");
    let _ = writeln!(md, "  body: JSON.stringify({{");
    let _ = writeln!(md, "    model: '{id}',");
    let _ = writeln!(md, "    messages: [");
    let _ = writeln!(md, "      {{ role: 'user', content: '{}' }}", l.prompt_placeholder);
    let _ = writeln!(md, "    ]");
    let _ = writeln!(md, "  }})");
    let _ = writeln!(md, "}});");
    let _ = writeln!(md, "```");

    let _ = writeln!(md, "\n## {}\n", l.links);
    let _ = writeln!(md, "- [{}](/models/{id})", l.openrouter_page);
    if let Some(hf_id) = str_field(record, "hugging_face_id") {
        let _ = writeln!(
            md,
            "- [{}]({})",
            l.huggingface_page,
            links.huggingface_model(hf_id)
        );
    }

    md
}

fn epoch_seconds(value: Option<&Value>) -> Option<DateTime<Utc>> {
    let secs = value?.as_f64().filter(|s| s.is_finite())?;
    DateTime::from_timestamp_millis((secs * 1000.0) as i64)
}

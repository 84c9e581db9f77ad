//! Per-token price coercion and display.
//!
//! Upstream prices are per-token rates encoded as strings (`"0.000002"`),
//! numbers, or garbage. Every entry point here is total.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Numeric per-token rates derived from an upstream `pricing` object.
///
/// Every component is finite and non-negative; anything unparseable is `0`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PricingConverted {
    pub prompt: f64,
    pub completion: f64,
    pub request: f64,
    pub image: f64,
    pub web_search: f64,
    pub internal_reasoning: f64,
}

impl PricingConverted {
    pub fn is_free(&self) -> bool {
        self.prompt == 0.0
    }
}

/// Convert an upstream `pricing` object. Returns `None` when it is absent or
/// not an object.
pub fn convert_pricing(raw: &Value) -> Option<PricingConverted> {
    let pricing = raw.as_object()?;
    let rate = |key: &str| pricing.get(key).map(parse_rate).unwrap_or(0.0);

    Some(PricingConverted {
        prompt: rate("prompt"),
        completion: rate("completion"),
        request: rate("request"),
        image: rate("image"),
        web_search: rate("web_search"),
        internal_reasoning: rate("internal_reasoning"),
    })
}

/// Coerce a raw price to a non-negative finite rate, `0` when it can't be.
pub fn parse_rate(raw: &Value) -> f64 {
    let parsed = match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match parsed {
        Some(rate) if rate.is_finite() && rate > 0.0 => rate,
        _ => 0.0,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceUnit {
    PerThousand,
    PerToken,
    PerMillion,
}

impl PriceUnit {
    pub fn suffix(&self) -> &'static str {
        match self {
            PriceUnit::PerThousand => "/1K",
            PriceUnit::PerToken => "/token",
            PriceUnit::PerMillion => "/1M",
        }
    }
}

/// A rate scaled into the unit that keeps it readable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PriceDisplay {
    Free,
    Paid { amount: String, unit: PriceUnit },
}

impl PriceDisplay {
    /// Pick the display unit for a per-token rate.
    ///
    /// Rates of at least 0.001 are shown per thousand tokens, rates of at
    /// least 0.00001 per token, and anything smaller per million tokens.
    pub fn from_rate(rate: f64) -> Self {
        if !rate.is_finite() || rate <= 0.0 {
            return PriceDisplay::Free;
        }

        let (amount, unit) = if rate >= 0.001 {
            (format!("{:.4}", rate * 1000.0), PriceUnit::PerThousand)
        } else if rate >= 0.00001 {
            (format!("{:.6}", rate), PriceUnit::PerToken)
        } else {
            (format!("{:.2}", rate * 1_000_000.0), PriceUnit::PerMillion)
        };

        PriceDisplay::Paid { amount, unit }
    }

    pub fn is_free(&self) -> bool {
        matches!(self, PriceDisplay::Free)
    }
}

impl fmt::Display for PriceDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriceDisplay::Free => f.write_str("Free"),
            PriceDisplay::Paid { amount, unit } => write!(f, "${}{}", amount, unit.suffix()),
        }
    }
}

/// `"Free"` or `"$<amount><unit>"` for a per-token rate.
pub fn format_price_display(rate: f64) -> String {
    PriceDisplay::from_rate(rate).to_string()
}

/// Same as [`format_price_display`] for a raw upstream value.
pub fn format_raw_price(raw: Option<&Value>) -> String {
    format_price_display(raw.map(parse_rate).unwrap_or(0.0))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    #[rstest]
    #[case::per_thousand(0.002, "$2.0000/1K")]
    #[case::per_token(0.0005, "$0.000500/token")]
    #[case::per_million(0.000005, "$5.00/1M")]
    #[case::zero(0.0, "Free")]
    #[case::negative(-0.5, "Free")]
    #[case::nan(f64::NAN, "Free")]
    #[case::infinite(f64::INFINITY, "Free")]
    #[case::thousand_boundary(0.001, "$1.0000/1K")]
    #[case::below_thousand_boundary(0.0009, "$0.000900/token")]
    #[case::token_boundary(0.00001, "$0.000010/token")]
    #[case::below_token_boundary(0.000009, "$9.00/1M")]
    fn test_format_price_display(#[case] rate: f64, #[case] expected: &str) {
        assert_eq!(format_price_display(rate), expected);
    }

    #[rstest]
    #[case::null(Some(json!(null)), "Free")]
    #[case::missing(None, "Free")]
    #[case::empty_string(Some(json!("")), "Free")]
    #[case::zero_string(Some(json!("0")), "Free")]
    #[case::negative_string(Some(json!("-1")), "Free")]
    #[case::garbage(Some(json!("n/a")), "Free")]
    #[case::object(Some(json!({"usd": 1})), "Free")]
    #[case::numeric_string(Some(json!("0.000002")), "$2.00/1M")]
    #[case::padded_string(Some(json!(" 0.002 ")), "$2.0000/1K")]
    #[case::number(Some(json!(0.0005)), "$0.000500/token")]
    fn test_format_raw_price(#[case] raw: Option<Value>, #[case] expected: &str) {
        assert_eq!(format_raw_price(raw.as_ref()), expected);
    }

    #[test]
    fn test_convert_pricing_absent() {
        assert_eq!(convert_pricing(&json!(null)), None);
        assert_eq!(convert_pricing(&json!("0.1")), None);
    }

    #[test]
    fn test_convert_pricing_mixed_values() {
        let converted = convert_pricing(&json!({
            "prompt": "0.000003",
            "completion": 0.000015,
            "request": "",
            "image": null,
            "web_search": "-2",
            "internal_reasoning": "abc"
        }))
        .unwrap();

        assert_eq!(converted.prompt, 0.000003);
        assert_eq!(converted.completion, 0.000015);
        assert_eq!(converted.request, 0.0);
        assert_eq!(converted.image, 0.0);
        assert_eq!(converted.web_search, 0.0);
        assert_eq!(converted.internal_reasoning, 0.0);
        assert!(!converted.is_free());
    }

    #[test]
    fn test_convert_pricing_empty_object_is_free() {
        let converted = convert_pricing(&json!({})).unwrap();
        assert_eq!(converted, PricingConverted::default());
        assert!(converted.is_free());
    }
}

//! Response normalization for prediction backends.
//!
//! Backends disagree on field names and value types: the disease flag may be
//! `chronicDisease`, `chronic_disease` or `prediction` and may arrive as a
//! bool, a number or a label such as `"At Risk"`. [`normalize_prediction`]
//! maps any JSON value onto one [`PredictionResult`]. It never fails: absent
//! or unusable fields fall back to defaults.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Field names for the disease flag, in lookup order.
pub const DISEASE_KEYS: [&str; 3] = ["chronicDisease", "chronic_disease", "prediction"];

/// Field names for an explicit risk level, in lookup order.
pub const RISK_LEVEL_KEYS: [&str; 3] = ["riskLevel", "risk_level", "risk"];

/// Field names for the confidence percentage, in lookup order.
pub const CONFIDENCE_KEYS: [&str; 2] = ["confidence", "probability"];

const TRUE_LABELS: [&str; 6] = ["yes", "true", "1", "high", "at risk", "risk"];
const FALSE_LABELS: [&str; 6] = ["no", "false", "0", "low", "healthy", "not at risk"];

/// Risk band shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }

    /// Map a free-form label onto a band. Unrecognized labels are `High`.
    pub fn from_label(label: &str) -> Self {
        let normalized = label.trim().to_lowercase();
        if normalized.starts_with("low") {
            Self::Low
        } else if normalized.starts_with("medium") || normalized.starts_with("moderate") {
            Self::Medium
        } else {
            Self::High
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical prediction result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub at_risk: bool,
    pub risk_level: RiskLevel,
    /// Percentage in [0, 100], two decimals.
    pub confidence: f64,
}

/// First value among `keys` that is present and not null.
pub fn first_present<'a>(raw: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| raw.get(*key))
        .find(|value| !value.is_null())
}

/// Text form of a JSON value, following browser string conversion.
///
/// Arrays join their elements with `,` (so `["no"]` reads as `no`), integral
/// numbers drop the fraction and objects become `[object Object]`.
fn text_of(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e21 => format!("{:.0}", f),
            _ => n.to_string(),
        },
        Value::Array(items) => items.iter().map(text_of).collect::<Vec<_>>().join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

/// Trimmed, lowercased text form of a JSON value.
fn label_of(value: &Value) -> String {
    text_of(value).trim().to_lowercase()
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Coerce a backend value into an at-risk flag.
pub fn to_boolean_prediction(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64() == Some(1.0),
        _ => {
            let label = label_of(value);
            if TRUE_LABELS.contains(&label.as_str()) {
                true
            } else if FALSE_LABELS.contains(&label.as_str()) {
                false
            } else {
                is_truthy(value)
            }
        }
    }
}

/// Coerce a backend value into a risk band.
pub fn to_risk_level(value: &Value) -> RiskLevel {
    RiskLevel::from_label(&label_of(value))
}

fn to_number(value: &Value) -> f64 {
    match value {
        Value::Null => 0.0,
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => parse_number(s),
        Value::Array(_) => parse_number(&text_of(value)),
        Value::Object(_) => f64::NAN,
    }
}

/// Numeric value of a string; blank is 0, `0x`/`0o`/`0b` prefixes select the radix.
fn parse_number(text: &str) -> f64 {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    let radix = match trimmed.get(..2).map(str::to_ascii_lowercase).as_deref() {
        Some("0x") => Some(16),
        Some("0o") => Some(8),
        Some("0b") => Some(2),
        _ => None,
    };
    match radix {
        Some(_) if trimmed[2..].starts_with('+') => f64::NAN,
        Some(radix) => u64::from_str_radix(&trimmed[2..], radix)
            .map(|n| n as f64)
            .unwrap_or(f64::NAN),
        None => trimmed.parse::<f64>().unwrap_or(f64::NAN),
    }
}

/// Coerce a backend value into a confidence percentage in [0, 100].
pub fn to_confidence(value: &Value) -> f64 {
    let numeric = to_number(value);
    if !numeric.is_finite() {
        return 0.0;
    }
    let clamped = numeric.clamp(0.0, 100.0);
    (clamped * 100.0).round() / 100.0
}

/// Map an arbitrary backend response onto the canonical result.
pub fn normalize_prediction(raw: &Value) -> PredictionResult {
    let at_risk = first_present(raw, &DISEASE_KEYS)
        .map(to_boolean_prediction)
        .unwrap_or(false);

    let risk_level = match first_present(raw, &RISK_LEVEL_KEYS) {
        Some(value) => to_risk_level(value),
        None if at_risk => RiskLevel::High,
        None => RiskLevel::Low,
    };

    let confidence = first_present(raw, &CONFIDENCE_KEYS)
        .map(to_confidence)
        .unwrap_or(0.0);

    PredictionResult {
        at_risk,
        risk_level,
        confidence,
    }
}

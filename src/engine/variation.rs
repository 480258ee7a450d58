//! Variation lookup and stored-value decoding.

use crate::types::{FlagType, FlagValue, Variation};

/// Finds the variation to serve for `key`.
///
/// Falls back from the exact key to the config default, then to the boolean
/// sentinel variation (`"true"` or `"false"`), then to the first variation.
/// Returns `None` only when the flag has no variations at all.
pub fn resolve_variation<'a>(
    variations: &'a [Variation],
    key: Option<&str>,
    default_key: Option<&str>,
    sentinel: bool,
) -> Option<&'a Variation> {
    let sentinel_key = if sentinel { "true" } else { "false" };

    [key, default_key, Some(sentinel_key)]
        .into_iter()
        .flatten()
        .find_map(|candidate| variations.iter().find(|v| v.key == candidate))
        .or_else(|| variations.first())
}

/// Decodes a variation's stored form according to the flag's declared type.
///
/// A value that does not decode for its type is served as a plain string.
pub fn decode_value(flag_type: FlagType, raw: &str) -> FlagValue {
    match flag_type {
        FlagType::Boolean => match raw.trim() {
            "true" => FlagValue::Bool(true),
            "false" => FlagValue::Bool(false),
            _ => FlagValue::String(raw.to_string()),
        },
        FlagType::Number => raw
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .map(FlagValue::Number)
            .unwrap_or_else(|| FlagValue::String(raw.to_string())),
        FlagType::String => match serde_json::from_str::<serde_json::Value>(raw) {
            Ok(serde_json::Value::String(s)) => FlagValue::String(s),
            _ => FlagValue::String(raw.to_string()),
        },
        FlagType::Json => match serde_json::from_str::<serde_json::Value>(raw) {
            Ok(serde_json::Value::Null) => FlagValue::Null,
            Ok(value) => FlagValue::Json(value),
            Err(_) => FlagValue::String(raw.to_string()),
        },
    }
}

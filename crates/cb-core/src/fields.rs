//! Field resolution over raw platform records.
//!
//! Records arrive as untyped JSON and older records use superseded
//! parameter names, so every lookup here either degrades to the `"-"`
//! placeholder or resolves through an ordered fallback chain.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;
use thiserror::Error;

/// Sentinel for an absent or empty value.
pub const PLACEHOLDER: &str = "-";

/// A field problem that makes one line item unreportable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    #[error("missing required field {0}")]
    Missing(String),

    #[error("field {0} is not a quantity: {1}")]
    NotNumeric(String, String),
}

/// Looks up a required string at a JSON pointer path.
pub fn required_str<'a>(record: &'a Value, pointer: &str) -> Result<&'a str, FieldError> {
    record
        .pointer(pointer)
        .and_then(Value::as_str)
        .ok_or_else(|| FieldError::Missing(pointer.to_string()))
}

/// Looks up an optional string, degrading to the placeholder.
pub fn string_or_placeholder(record: &Value, pointer: &str) -> String {
    record
        .pointer(pointer)
        .and_then(Value::as_str)
        .unwrap_or(PLACEHOLDER)
        .to_string()
}

/// Resolves a named parameter from the record's parameter set.
///
/// Parameters are `{id|name, value}` objects under `asset.params`; older
/// records carry the key under `name`. Absent or empty values resolve to
/// the placeholder.
pub fn parameter(record: &Value, name: &str) -> String {
    record
        .pointer("/asset/params")
        .and_then(Value::as_array)
        .and_then(|params| {
            params.iter().find(|p| {
                p.get("id").and_then(Value::as_str) == Some(name)
                    || p.get("name").and_then(Value::as_str) == Some(name)
            })
        })
        .and_then(|p| p.get("value"))
        .and_then(Value::as_str)
        .filter(|v| !v.is_empty())
        .unwrap_or(PLACEHOLDER)
        .to_string()
}

/// Ordered-fallback parameter resolution: the first candidate yielding a
/// non-placeholder value wins.
pub fn parameter_chain(record: &Value, names: &[&str]) -> String {
    for name in names {
        let value = parameter(record, name);
        if value != PLACEHOLDER {
            return value;
        }
    }
    PLACEHOLDER.to_string()
}

/// Capitalizes a label: first character uppercased, the rest lowercased.
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}

/// Parses a quantity that may arrive as a JSON number or a numeric string.
pub fn quantity(item: &Value, key: &str) -> Result<i64, FieldError> {
    let value = item
        .get(key)
        .ok_or_else(|| FieldError::Missing(key.to_string()))?;
    match value {
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| FieldError::NotNumeric(key.to_string(), n.to_string())),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| FieldError::NotNumeric(key.to_string(), s.clone())),
        other => Err(FieldError::NotNumeric(key.to_string(), other.to_string())),
    }
}

/// Normalizes a platform timestamp to `YYYY-MM-DD HH:MM:SS` (UTC).
///
/// Unparseable input is passed through unchanged rather than dropped.
pub fn normalize_datetime(raw: &str) -> String {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt
            .with_timezone(&Utc)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string();
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return dt.format("%Y-%m-%d %H:%M:%S").to_string();
    }
    raw.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record_with_params(params: Value) -> Value {
        json!({"asset": {"params": params}})
    }

    #[test]
    fn test_parameter_by_id_and_name() {
        let record = record_with_params(json!([
            {"id": "microsoft_domain", "value": "contoso.onmicrosoft.com"},
            {"name": "customer_id", "value": "c-123"},
        ]));
        assert_eq!(
            parameter(&record, "microsoft_domain"),
            "contoso.onmicrosoft.com"
        );
        assert_eq!(parameter(&record, "customer_id"), "c-123");
        assert_eq!(parameter(&record, "absent"), PLACEHOLDER);
    }

    #[test]
    fn test_parameter_empty_value_is_placeholder() {
        let record = record_with_params(json!([{"id": "subscription_id", "value": ""}]));
        assert_eq!(parameter(&record, "subscription_id"), PLACEHOLDER);
    }

    #[test]
    fn test_parameter_chain_returns_first_hit() {
        let record = record_with_params(json!([
            {"id": "microsoft_subscription_id", "value": "ms-sub-9"},
        ]));
        assert_eq!(
            parameter_chain(&record, &["subscription_id", "microsoft_subscription_id"]),
            "ms-sub-9"
        );
        assert_eq!(
            parameter_chain(&record, &["one", "two"]),
            PLACEHOLDER
        );
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("purchase"), "Purchase");
        assert_eq!(capitalize("CHANGE"), "Change");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn test_quantity_accepts_numbers_and_strings() {
        assert_eq!(quantity(&json!({"quantity": 5}), "quantity").unwrap(), 5);
        assert_eq!(quantity(&json!({"quantity": "-1"}), "quantity").unwrap(), -1);
        assert!(matches!(
            quantity(&json!({}), "quantity"),
            Err(FieldError::Missing(_))
        ));
        assert!(matches!(
            quantity(&json!({"quantity": "many"}), "quantity"),
            Err(FieldError::NotNumeric(_, _))
        ));
    }

    #[test]
    fn test_normalize_datetime() {
        assert_eq!(
            normalize_datetime("2024-03-05T12:30:45+00:00"),
            "2024-03-05 12:30:45"
        );
        assert_eq!(
            normalize_datetime("2024-03-05T12:30:45.123456+00:00"),
            "2024-03-05 12:30:45"
        );
        assert_eq!(normalize_datetime("not a date"), "not a date");
    }
}

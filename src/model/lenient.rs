//! Tolerant field deserializers for snapshot data.
//!
//! Snapshots come from an external collaborator and from older versions of
//! the planner, so fields may be missing, `null`, stringly typed or plain
//! malformed. These helpers coerce what they can and fall back to the field
//! default for the rest; they never fail on a bad value.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Date wire format used throughout the snapshot.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse `YYYY-MM-DD`, also accepting a full timestamp whose first ten
/// characters are a date (`2024-03-01T00:00:00.000Z`).
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
        .ok()
        .or_else(|| {
            trimmed
                .get(..10)
                .and_then(|prefix| NaiveDate::parse_from_str(prefix, DATE_FORMAT).ok())
        })
}

/// Missing, `null` or any value that does not decode as `T` becomes
/// `T::default()`.
pub fn or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned + Default,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default())
}

pub fn string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_to_string).unwrap_or_default())
}

/// Empty strings are treated as absent.
pub fn opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(value_to_string)
        .filter(|s| !s.is_empty()))
}

pub fn opt_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(Value::as_str).and_then(parse_date))
}

pub fn number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_to_f64).unwrap_or(0.0))
}

pub fn opt_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_to_f64))
}

/// Non-negative whole numbers only; anything else is dropped.
pub fn opt_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(value_to_f64)
        .filter(|n| *n >= 0.0 && n.fract() == 0.0 && *n <= f64::from(u32::MAX))
        .map(|n| n as u32))
}

pub fn opt_i32<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(value_to_f64)
        .filter(|n| n.fract() == 0.0 && n.abs() <= f64::from(i32::MAX))
        .map(|n| n as i32))
}

pub fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Bool(b)) => b,
        Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
        Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
        _ => false,
    })
}

/// Keeps the array entries that decode as `T` and drops the rest. A
/// non-array value becomes an empty list.
pub fn list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let Some(Value::Array(items)) = value else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect())
}

/// Keeps the string and number entries of an array, as strings. Blank
/// entries and anything else are dropped.
pub fn string_set<'de, D>(deserializer: D) -> Result<BTreeSet<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let Some(Value::Array(items)) = value else {
        return Ok(BTreeSet::new());
    };
    Ok(items
        .iter()
        .filter_map(value_to_string)
        .filter(|s| !s.trim().is_empty())
        .collect())
}

/// Objects pass through; anything else becomes `{}`.
pub fn object<'de, D>(deserializer: D) -> Result<Value, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Object(map)) => Value::Object(map),
        _ => Value::Object(serde_json::Map::new()),
    })
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn value_to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', ".").parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Record {
        #[serde(default, deserialize_with = "string")]
        id: String,
        #[serde(default, deserialize_with = "opt_date")]
        date: Option<NaiveDate>,
        #[serde(default, deserialize_with = "number")]
        cost: f64,
        #[serde(default, deserialize_with = "opt_u32")]
        months: Option<u32>,
        #[serde(default, deserialize_with = "flag")]
        done: bool,
        #[serde(default, deserialize_with = "or_default")]
        items: Vec<String>,
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let record: Record = serde_json::from_str("{}").unwrap();
        assert_eq!(record.id, "");
        assert_eq!(record.date, None);
        assert_eq!(record.cost, 0.0);
        assert!(!record.done);
        assert!(record.items.is_empty());
    }

    #[test]
    fn test_malformed_values_are_coerced() {
        let record: Record = serde_json::from_str(
            r#"{"id": 1712, "date": "not a date", "cost": "12,50", "months": -3, "done": "true", "items": null}"#,
        )
        .unwrap();
        assert_eq!(record.id, "1712");
        assert_eq!(record.date, None);
        assert_eq!(record.cost, 12.5);
        assert_eq!(record.months, None);
        assert!(record.done);
        assert!(record.items.is_empty());
    }

    #[derive(Debug, Deserialize)]
    struct Section {
        #[serde(default, deserialize_with = "list")]
        entries: Vec<Record>,
        #[serde(default, deserialize_with = "object")]
        info: Value,
    }

    #[test]
    fn test_list_drops_undecodable_entries() {
        let section: Section =
            serde_json::from_str(r#"{"entries": [{"id": "a"}, 7, "x", {"id": "b"}], "info": [1]}"#)
                .unwrap();
        let ids: Vec<&str> = section.entries.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(section.info.as_object().is_some_and(|m| m.is_empty()));

        let section: Section = serde_json::from_str(r#"{"entries": {"id": "a"}}"#).unwrap();
        assert!(section.entries.is_empty());
    }

    #[derive(Debug, Default, PartialEq, Deserialize)]
    struct Nested {
        #[serde(default, deserialize_with = "number")]
        x: f64,
    }

    #[derive(Debug, Deserialize)]
    struct Shapes {
        #[serde(default, deserialize_with = "string_set")]
        tags: BTreeSet<String>,
        #[serde(default, deserialize_with = "or_default")]
        nested: Nested,
    }

    #[test]
    fn test_string_set_keeps_usable_entries() {
        let shapes: Shapes =
            serde_json::from_str(r#"{"tags": ["dak", 3, null, {"a": 1}, " ", "dak"]}"#).unwrap();
        let tags: Vec<&str> = shapes.tags.iter().map(String::as_str).collect();
        assert_eq!(tags, vec!["3", "dak"]);

        let shapes: Shapes = serde_json::from_str(r#"{"tags": "dak"}"#).unwrap();
        assert!(shapes.tags.is_empty());
    }

    #[test]
    fn test_or_default_absorbs_wrong_shape() {
        let shapes: Shapes = serde_json::from_str(r#"{"nested": "oops"}"#).unwrap();
        assert_eq!(shapes.nested, Nested::default());

        let shapes: Shapes = serde_json::from_str(r#"{"nested": [1, 2]}"#).unwrap();
        assert_eq!(shapes.nested, Nested::default());

        let shapes: Shapes = serde_json::from_str(r#"{"nested": {"x": "2,5"}}"#).unwrap();
        assert_eq!(shapes.nested.x, 2.5);
    }

    #[test]
    fn test_parse_date_accepts_timestamp_prefix() {
        assert_eq!(
            parse_date("2024-03-01T10:00:00.000Z"),
            NaiveDate::from_ymd_opt(2024, 3, 1)
        );
        assert_eq!(parse_date("2024-02-30"), None);
    }
}

//! Forgiving field deserializers for snapshot payloads.
//!
//! Snapshots come from other replicas, possibly running other versions. A
//! known field carrying a value of the wrong type is read as absent instead of
//! failing the whole payload; merge and sanitization then fall back to the
//! other side or to local values.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::util::normalize_text_option;

/// Read any JSON value and keep it only when it converts to `T`.
pub fn optional<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|value| serde_json::from_value(value).ok()))
}

/// Read a string, defaulting to empty when absent or mistyped.
pub fn string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    optional::<D, String>(deserializer).map(Option::unwrap_or_default)
}

/// Read a trimmed, non-empty string; anything else is absent.
pub fn trimmed<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    optional::<D, String>(deserializer).map(normalize_text_option)
}

/// Read a list, dropping elements that do not convert to `T`.
pub fn filtered_list<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let Some(value) = Option::<Value>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let Value::Array(items) = value else {
        return Ok(None);
    };
    let total = items.len();
    let kept = items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect::<Vec<T>>();
    if kept.len() < total {
        tracing::warn!(dropped = total - kept.len(), "Dropped malformed list entries");
    }
    Ok(Some(kept))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Probe {
        #[serde(default, deserialize_with = "optional")]
        rev: Option<u64>,
        #[serde(default, deserialize_with = "trimmed")]
        rev_by: Option<String>,
        #[serde(default, deserialize_with = "string")]
        label: String,
        #[serde(default, deserialize_with = "filtered_list")]
        values: Option<Vec<u32>>,
    }

    #[test]
    fn mistyped_fields_read_as_absent() {
        let probe: Probe = serde_json::from_str(
            r#"{"rev": -3, "rev_by": "   ", "label": 12, "values": [1, "two", 3]}"#,
        )
        .unwrap();
        assert_eq!(probe.rev, None);
        assert_eq!(probe.rev_by, None);
        assert_eq!(probe.label, "");
        assert_eq!(probe.values, Some(vec![1, 3]));
    }

    #[test]
    fn well_typed_fields_are_kept() {
        let probe: Probe =
            serde_json::from_str(r#"{"rev": 4, "rev_by": " device-a ", "label": "x"}"#).unwrap();
        assert_eq!(probe.rev, Some(4));
        assert_eq!(probe.rev_by.as_deref(), Some("device-a"));
        assert_eq!(probe.label, "x");
        assert_eq!(probe.values, None);
    }
}

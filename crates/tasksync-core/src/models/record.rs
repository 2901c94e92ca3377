//! Shared sync metadata carried by every synchronized record.

use serde::{Deserialize, Serialize};

use super::lenient;
use crate::util::parse_timestamp_ms;

/// Timestamps, tombstone markers and revision metadata common to all records.
///
/// Timestamps are kept as the ISO-8601 strings found in the snapshot so a
/// merge never rewrites a value it did not have to repair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordMeta {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::optional"
    )]
    pub created_at: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub updated_at: String,
    /// Tombstone marker: presence means soft-deleted.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::optional"
    )]
    pub deleted_at: Option<String>,
    /// Marks a tombstone eligible for hard removal.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::optional"
    )]
    pub purged_at: Option<String>,
    /// Monotonic per-replica write counter.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::optional"
    )]
    pub rev: Option<u64>,
    /// Replica that produced `rev`.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::trimmed"
    )]
    pub rev_by: Option<String>,
}

impl RecordMeta {
    /// Metadata for a record created and last updated at `at`.
    pub fn at(at: impl Into<String>) -> Self {
        let at = at.into();
        Self {
            created_at: Some(at.clone()),
            updated_at: at,
            ..Self::default()
        }
    }

    /// Attach revision metadata.
    #[must_use]
    pub fn with_rev(mut self, rev: u64, rev_by: impl Into<String>) -> Self {
        self.rev = Some(rev);
        self.rev_by = Some(rev_by.into());
        self
    }

    /// Mark as soft-deleted at `at`.
    #[must_use]
    pub fn deleted(mut self, at: impl Into<String>) -> Self {
        self.deleted_at = Some(at.into());
        self
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at
            .as_deref()
            .is_some_and(|value| !value.is_empty())
    }

    /// `rev` for comparisons; absent counts as zero.
    pub fn rev_or_zero(&self) -> u64 {
        self.rev.unwrap_or(0)
    }

    /// `revBy` for comparisons; absent counts as empty.
    pub fn rev_by_or_empty(&self) -> &str {
        self.rev_by.as_deref().unwrap_or("")
    }

    /// `updatedAt` in Unix ms, `None` when unparsable.
    pub fn updated_ms(&self) -> Option<i64> {
        parse_timestamp_ms(&self.updated_at)
    }
}

/// A record with a stable identity that participates in snapshot merges.
pub trait Record: Clone + Serialize {
    /// Opaque identifier, immutable after creation.
    fn id(&self) -> &str;

    fn meta(&self) -> &RecordMeta;

    fn meta_mut(&mut self) -> &mut RecordMeta;

    fn is_deleted(&self) -> bool {
        self.meta().is_deleted()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_reads_revision_fields_leniently() {
        let meta: RecordMeta = serde_json::from_str(
            r#"{"updatedAt": "2025-01-01T00:00:00Z", "rev": 1.5, "revBy": "  "}"#,
        )
        .unwrap();
        assert_eq!(meta.rev, None);
        assert_eq!(meta.rev_by, None);
        assert_eq!(meta.rev_or_zero(), 0);
        assert_eq!(meta.rev_by_or_empty(), "");
    }

    #[test]
    fn empty_deleted_at_is_not_a_tombstone() {
        let mut meta = RecordMeta::at("2025-01-01T00:00:00Z");
        assert!(!meta.is_deleted());
        meta.deleted_at = Some(String::new());
        assert!(!meta.is_deleted());
        let meta = meta.deleted("2025-01-02T00:00:00Z");
        assert!(meta.is_deleted());
    }

    #[test]
    fn absent_fields_are_not_serialized() {
        let meta = RecordMeta::at("2025-01-01T00:00:00Z");
        let value = serde_json::to_value(&meta).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "createdAt": "2025-01-01T00:00:00Z",
                "updatedAt": "2025-01-01T00:00:00Z"
            })
        );
    }
}

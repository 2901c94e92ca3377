//! Snapshot shape checks on read and deep validation before write.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::models::{AppData, Area, Record, RecordMeta};
use crate::util::{is_non_empty, parse_timestamp_ms};

const ENTITY_LISTS: [&str; 4] = ["tasks", "projects", "sections", "areas"];

/// Which replica a snapshot was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotSide {
    Local,
    Remote,
}

impl SnapshotSide {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Remote => "remote",
        }
    }
}

impl fmt::Display for SnapshotSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Top-level structure problems of a raw snapshot.
pub fn validate_payload_shape(value: &Value, side: SnapshotSide) -> Vec<String> {
    let Some(record) = value.as_object() else {
        return vec![format!("{side} payload must be an object")];
    };

    let mut issues = ENTITY_LISTS
        .iter()
        .filter(|field| record.get(**field).is_some_and(|list| !list.is_array()))
        .map(|field| format!("{side} payload field \"{field}\" must be an array when present"))
        .collect::<Vec<_>>();
    if record
        .get("settings")
        .is_some_and(|settings| !settings.is_object())
    {
        issues.push(format!(
            "{side} payload field \"settings\" must be an object when present"
        ));
    }
    issues
}

/// Turn a raw snapshot into `AppData`.
///
/// `None` (and a remote `null`) is the empty snapshot of a first sync. Missing
/// lists and settings become empty. Shape problems, and records that do not
/// fit the model at all, are reported as [`Error::InvalidPayload`].
pub fn normalize_app_data(raw: Option<Value>, side: SnapshotSide) -> Result<AppData> {
    let raw = match raw {
        None => return Ok(AppData::default()),
        Some(Value::Null) if side == SnapshotSide::Remote => return Ok(AppData::default()),
        Some(raw) => raw,
    };

    let issues = validate_payload_shape(&raw, side);
    if !issues.is_empty() {
        tracing::warn!(
            %side,
            issues = issues.len(),
            sample = %issues.first().map(String::as_str).unwrap_or_default(),
            "Invalid sync payload shape"
        );
        return Err(Error::InvalidPayload { side, issues });
    }

    serde_json::from_value(raw).map_err(|error| Error::InvalidPayload {
        side,
        issues: vec![error.to_string()],
    })
}

/// Deep validation of a merged snapshot; empty means valid.
pub fn validate_merged(data: &AppData) -> Vec<String> {
    let mut issues = Vec::new();
    validate_records("tasks", &data.tasks, &mut issues);
    validate_records("projects", &data.projects, &mut issues);
    validate_records("sections", &data.sections, &mut issues);
    validate_areas(&data.areas, &mut issues);
    issues
}

/// [`validate_merged`] as a fail-closed gate.
pub fn check_merged(data: &AppData) -> Result<()> {
    let issues = validate_merged(data);
    if issues.is_empty() {
        return Ok(());
    }
    tracing::warn!(
        issues = issues.len(),
        sample = %issues.first().map(String::as_str).unwrap_or_default(),
        "Sync merge validation failed"
    );
    Err(Error::Validation { issues })
}

fn validate_records<T: Record>(label: &str, items: &[T], issues: &mut Vec<String>) {
    for (index, item) in items.iter().enumerate() {
        let at = format!("{label}[{index}]");
        if !is_non_empty(item.id()) {
            issues.push(format!("{at}.id must be a non-empty string"));
        }

        let meta = item.meta();
        let created = match meta.created_at.as_deref() {
            Some(created) if !is_non_empty(created) => {
                issues.push(format!("{at}.createdAt must be a non-empty string when present"));
                None
            }
            Some(created) => {
                let parsed = parse_timestamp_ms(created);
                if parsed.is_none() {
                    issues.push(format!(
                        "{at}.createdAt must be a valid ISO timestamp when present"
                    ));
                }
                parsed
            }
            None => None,
        };

        let updated = if is_non_empty(&meta.updated_at) {
            let parsed = meta.updated_ms();
            if parsed.is_none() {
                issues.push(format!("{at}.updatedAt must be a valid ISO timestamp"));
            }
            parsed
        } else {
            issues.push(format!("{at}.updatedAt must be a non-empty string"));
            None
        };

        check_order(&at, created, updated, issues);
        check_revision(&at, meta, issues);
    }
}

/// Areas predate timestamps; theirs are checked only when present.
fn validate_areas(areas: &[Area], issues: &mut Vec<String>) {
    for (index, area) in areas.iter().enumerate() {
        let at = format!("areas[{index}]");
        if !is_non_empty(&area.id) {
            issues.push(format!("{at}.id must be a non-empty string"));
        }
        if !is_non_empty(&area.name) {
            issues.push(format!("{at}.name must be a non-empty string"));
        }

        let created = area.meta.created_at.as_deref().and_then(|created| {
            let parsed = parse_timestamp_ms(created);
            if parsed.is_none() {
                issues.push(format!(
                    "{at}.createdAt must be a valid ISO timestamp when present"
                ));
            }
            parsed
        });
        let updated = if area.meta.updated_at.is_empty() {
            None
        } else {
            let parsed = area.meta.updated_ms();
            if parsed.is_none() {
                issues.push(format!(
                    "{at}.updatedAt must be a valid ISO timestamp when present"
                ));
            }
            parsed
        };

        check_order(&at, created, updated, issues);
        check_revision(&at, &area.meta, issues);
    }
}

fn check_order(at: &str, created: Option<i64>, updated: Option<i64>, issues: &mut Vec<String>) {
    if let (Some(created), Some(updated)) = (created, updated) {
        if updated < created {
            issues.push(format!(
                "{at}.updatedAt must be greater than or equal to createdAt"
            ));
        }
    }
}

/// `rev` is unsigned by construction; only `revBy` can be malformed here.
fn check_revision(at: &str, meta: &RecordMeta, issues: &mut Vec<String>) {
    if meta
        .rev_by
        .as_deref()
        .is_some_and(|rev_by| !is_non_empty(rev_by))
    {
        issues.push(format!("{at}.revBy must be a non-empty string when present"));
    }
}

//! Sync history recorded in settings.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of history entries kept by default.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Outcome of a sync cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Success,
    Conflict,
    Error,
}

impl SyncStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Conflict => "conflict",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Where the remote snapshot lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncBackend {
    File,
    Webdav,
    Cloud,
    Off,
}

impl SyncBackend {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Webdav => "webdav",
            Self::Cloud => "cloud",
            Self::Off => "off",
        }
    }
}

/// Why a cycle ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncCycleType {
    Push,
    Pull,
    Merge,
}

impl SyncCycleType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Push => "push",
            Self::Pull => "pull",
            Self::Merge => "merge",
        }
    }
}

impl fmt::Display for SyncCycleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// One recorded sync cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncHistoryEntry {
    pub at: String,
    pub status: SyncStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<SyncBackend>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub cycle_type: Option<SyncCycleType>,
    #[serde(default)]
    pub conflicts: usize,
    #[serde(default)]
    pub conflict_ids: Vec<String>,
    #[serde(default)]
    pub max_clock_skew_ms: u64,
    #[serde(default)]
    pub timestamp_adjustments: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Descriptive labels attached to the history entry of a cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryContext {
    pub backend: Option<SyncBackend>,
    pub cycle_type: Option<SyncCycleType>,
    pub details: Option<String>,
}

/// Prepend `entry`, drop entries without a timestamp, keep at most `limit` (at least one).
pub fn append_sync_history(
    history: Option<&[SyncHistoryEntry]>,
    entry: SyncHistoryEntry,
    limit: usize,
) -> Vec<SyncHistoryEntry> {
    let history = history.unwrap_or_default();
    let total = history.len() + 1;
    let next = std::iter::once(entry)
        .chain(history.iter().cloned())
        .filter(|item| !item.at.is_empty())
        .collect::<Vec<_>>();

    let dropped = total - next.len();
    if dropped > 0 {
        tracing::warn!(dropped, "Dropped invalid sync history entries");
    }
    next.into_iter().take(limit.max(1)).collect()
}

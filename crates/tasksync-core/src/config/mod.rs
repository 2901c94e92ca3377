//! Sync configuration.
//!
//! A small JSON document shared by every front end that drives sync cycles.
//! Unknown keys are rejected so typos surface instead of silently falling
//! back to defaults.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::sync::{
    resolve_retention_days, HistoryContext, SyncBackend, SyncCycle, SyncCycleType,
    DEFAULT_HISTORY_LIMIT,
};

/// Tuning knobs for sync cycles.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SyncConfig {
    /// Days a tombstone is kept after `purgedAt`; clamped to `[1, 3650]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tombstone_retention_days: Option<i64>,
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<SyncBackend>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cycle_type: Option<SyncCycleType>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            tombstone_retention_days: None,
            history_limit: DEFAULT_HISTORY_LIMIT,
            backend: None,
            cycle_type: None,
        }
    }
}

const fn default_history_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}

impl SyncConfig {
    /// Parse and validate a JSON config document.
    pub fn parse(payload: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(payload)
            .map_err(|error| Error::InvalidInput(format!("invalid sync config JSON: {error}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.history_limit == 0 {
            return Err(Error::InvalidInput(
                "sync config field 'history_limit' must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Effective retention after defaults and clamping.
    pub fn retention_days(&self) -> i64 {
        resolve_retention_days(self.tombstone_retention_days)
    }

    pub const fn history_context(&self) -> HistoryContext {
        HistoryContext {
            backend: self.backend,
            cycle_type: self.cycle_type,
            details: None,
        }
    }

    /// Apply this configuration to `cycle`.
    #[must_use]
    pub fn configure(&self, cycle: SyncCycle) -> SyncCycle {
        cycle
            .with_retention_days(self.tombstone_retention_days)
            .with_history_limit(self.history_limit)
            .with_history_context(self.history_context())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_document_uses_defaults() {
        let config = SyncConfig::parse("{}").unwrap();
        assert_eq!(config, SyncConfig::default());
        assert_eq!(config.retention_days(), 90);
        assert_eq!(config.history_limit, 50);
    }

    #[test]
    fn parse_reads_all_fields() {
        let config = SyncConfig::parse(
            r#"{
              "tombstone_retention_days": 5000,
              "history_limit": 10,
              "backend": "webdav",
              "cycle_type": "push"
            }"#,
        )
        .unwrap();
        assert_eq!(config.retention_days(), 3650);
        assert_eq!(
            config.history_context(),
            HistoryContext {
                backend: Some(SyncBackend::Webdav),
                cycle_type: Some(SyncCycleType::Push),
                details: None,
            }
        );
    }

    #[test]
    fn parse_rejects_unknown_fields() {
        let error = SyncConfig::parse(r#"{"retention": 3}"#).unwrap_err();
        assert!(error.to_string().contains("unknown field"));
    }

    #[test]
    fn parse_rejects_zero_history_limit() {
        let error = SyncConfig::parse(r#"{"history_limit": 0}"#).unwrap_err();
        assert!(error.to_string().contains("history_limit"));
    }
}

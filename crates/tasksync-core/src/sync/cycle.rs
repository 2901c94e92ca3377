//! Sync cycle orchestration
//!
//! A cycle runs `read-local → read-remote → merge → write-local → write-remote`
//! exactly once each, in order. Shape and validation failures abort before
//! any write. Local is written before remote so a failed local write never
//! leaves the remote replica ahead.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;

use super::history::{
    append_sync_history, HistoryContext, SyncCycleType, SyncHistoryEntry, SyncStatus,
    DEFAULT_HISTORY_LIMIT,
};
use super::merge::{merge_app_data_at, MergeStats, CLOCK_SKEW_THRESHOLD_MS};
use super::tombstones::purge_expired_tombstones;
use super::validate::{check_merged, normalize_app_data, SnapshotSide};
use crate::error::{Error, Result};
use crate::models::AppData;
use crate::util::now_iso;

/// Maximum number of conflict ids recorded in a history entry.
const HISTORY_CONFLICT_ID_LIMIT: usize = 10;

/// Steps of a sync cycle, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncStep {
    ReadLocal,
    ReadRemote,
    Merge,
    WriteLocal,
    WriteRemote,
}

impl SyncStep {
    pub const ALL: [Self; 5] = [
        Self::ReadLocal,
        Self::ReadRemote,
        Self::Merge,
        Self::WriteLocal,
        Self::WriteRemote,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ReadLocal => "read-local",
            Self::ReadRemote => "read-remote",
            Self::Merge => "merge",
            Self::WriteLocal => "write-local",
            Self::WriteRemote => "write-remote",
        }
    }
}

impl fmt::Display for SyncStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Storage collaborators of a cycle.
///
/// Reads return raw JSON so the cycle can check its shape before typing it.
/// Writes must be atomic from the point of view of a later read.
pub trait SyncIo: Send + Sync {
    /// The authoritative local snapshot.
    fn read_local(&self) -> impl Future<Output = Result<Value>> + Send;

    /// The remote snapshot, or `None` before the first sync.
    fn read_remote(&self) -> impl Future<Output = Result<Option<Value>>> + Send;

    fn write_local(&self, data: &AppData) -> impl Future<Output = Result<()>> + Send;

    fn write_remote(&self, data: &AppData) -> impl Future<Output = Result<()>> + Send;
}

/// Source of the cycle timestamp.
pub trait Clock: Send + Sync {
    /// Current time as an ISO-8601 string.
    fn now(&self) -> String;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> String {
        now_iso()
    }
}

/// A clock stuck at one instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedClock(String);

impl FixedClock {
    pub fn new(at: impl Into<String>) -> Self {
        Self(at.into())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> String {
        self.0.clone()
    }
}

/// Cooperative cancellation, observed at step boundaries only.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

type StepHook = Arc<dyn Fn(SyncStep) + Send + Sync>;

/// Result of a completed cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncCycleResult {
    pub data: AppData,
    pub stats: MergeStats,
    pub status: SyncStatus,
}

/// A configured sync cycle, reusable across runs.
#[derive(Clone)]
pub struct SyncCycle {
    clock: Arc<dyn Clock>,
    on_step: Option<StepHook>,
    cancel: Option<CancelToken>,
    retention_days: Option<i64>,
    history_limit: usize,
    history: HistoryContext,
}

impl fmt::Debug for SyncCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncCycle")
            .field("retention_days", &self.retention_days)
            .field("history_limit", &self.history_limit)
            .field("history", &self.history)
            .field("cancellable", &self.cancel.is_some())
            .finish_non_exhaustive()
    }
}

impl Default for SyncCycle {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncCycle {
    pub fn new() -> Self {
        Self {
            clock: Arc::new(SystemClock),
            on_step: None,
            cancel: None,
            retention_days: None,
            history_limit: DEFAULT_HISTORY_LIMIT,
            history: HistoryContext::default(),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Observe each step as it starts.
    #[must_use]
    pub fn on_step(mut self, hook: impl Fn(SyncStep) + Send + Sync + 'static) -> Self {
        self.on_step = Some(Arc::new(hook));
        self
    }

    #[must_use]
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Tombstone retention in days; clamped to the supported range.
    #[must_use]
    pub const fn with_retention_days(mut self, days: Option<i64>) -> Self {
        self.retention_days = days;
        self
    }

    #[must_use]
    pub const fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    #[must_use]
    pub fn with_history_context(mut self, context: HistoryContext) -> Self {
        self.history = context;
        self
    }

    /// Run one full cycle against `io`.
    pub async fn run<I: SyncIo>(&self, io: &I) -> Result<SyncCycleResult> {
        let now = self.clock.now();

        self.enter(SyncStep::ReadLocal)?;
        let local = normalize_app_data(Some(io.read_local().await?), SnapshotSide::Local)?;
        let local = purge_expired_tombstones(local, &now, self.retention_days).data;

        self.enter(SyncStep::ReadRemote)?;
        let remote = normalize_app_data(io.read_remote().await?, SnapshotSide::Remote)?;
        let remote = purge_expired_tombstones(remote, &now, self.retention_days).data;

        self.enter(SyncStep::Merge)?;
        let (data, stats, status) = self.merge(&local, &remote, &now)?;

        self.enter(SyncStep::WriteLocal)?;
        io.write_local(&data).await?;

        self.enter(SyncStep::WriteRemote)?;
        io.write_remote(&data).await?;

        tracing::info!(
            %status,
            conflicts = stats.total_conflicts(),
            tasks = data.tasks.len(),
            "Sync cycle completed"
        );
        Ok(SyncCycleResult {
            data,
            stats,
            status,
        })
    }

    fn enter(&self, step: SyncStep) -> Result<()> {
        if self.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
            tracing::info!(%step, "Sync cycle cancelled");
            return Err(Error::Cancelled { before: step });
        }
        tracing::debug!(%step, "Sync step");
        if let Some(hook) = &self.on_step {
            hook(step);
        }
        Ok(())
    }

    fn merge(
        &self,
        local: &AppData,
        remote: &AppData,
        now: &str,
    ) -> Result<(AppData, MergeStats, SyncStatus)> {
        let merged = merge_app_data_at(local, remote, now);
        let stats = merged.stats;
        let conflicts = stats.total_conflicts();
        let status = if conflicts > 0 {
            SyncStatus::Conflict
        } else {
            SyncStatus::Success
        };

        let max_clock_skew_ms = stats.max_clock_skew_ms();
        if max_clock_skew_ms > CLOCK_SKEW_THRESHOLD_MS {
            tracing::warn!(
                max_clock_skew_ms,
                threshold_ms = CLOCK_SKEW_THRESHOLD_MS,
                "Sync merge detected large clock skew"
            );
        }

        let entry = SyncHistoryEntry {
            at: now.to_string(),
            status,
            backend: self.history.backend,
            cycle_type: Some(self.history.cycle_type.unwrap_or(SyncCycleType::Merge)),
            conflicts,
            conflict_ids: stats.conflict_ids(HISTORY_CONFLICT_ID_LIMIT),
            max_clock_skew_ms,
            timestamp_adjustments: stats.timestamp_adjustments(),
            details: self.history.details.clone(),
            error: None,
        };

        let mut data = merged.data;
        let history = append_sync_history(
            data.settings.last_sync_history.as_deref(),
            entry,
            self.history_limit,
        );
        let settings = &mut data.settings;
        settings.last_sync_at = Some(now.to_string());
        settings.last_sync_status = Some(status.to_string());
        settings.last_sync_error = None;
        settings.last_sync_stats = Some(stats.clone());
        settings.last_sync_history = Some(history);

        let purged = purge_expired_tombstones(data, now, self.retention_days);
        if purged.removed_any() {
            tracing::warn!(
                removed_task_tombstones = purged.removed_task_tombstones,
                removed_attachment_tombstones = purged.removed_attachment_tombstones,
                "Purged expired sync tombstones"
            );
        }

        check_merged(&purged.data)?;
        Ok((purged.data, stats, status))
    }
}

/// Allows at most one cycle in flight for one dataset.
#[derive(Debug, Default)]
pub struct SyncCoordinator {
    in_flight: Mutex<()>,
}

impl SyncCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `cycle`, or fail with [`Error::SyncInProgress`] if one is already running.
    pub async fn run<I: SyncIo>(&self, cycle: &SyncCycle, io: &I) -> Result<SyncCycleResult> {
        let Ok(_guard) = self.in_flight.try_lock() else {
            tracing::debug!("Sync cycle rejected; another cycle is in flight");
            return Err(Error::SyncInProgress);
        };
        cycle.run(io).await
    }

    pub fn is_running(&self) -> bool {
        self.in_flight.try_lock().is_err()
    }
}

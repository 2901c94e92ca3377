use std::path::PathBuf;

use serde::Serialize;
use tasksync_core::sync::{
    CancelToken, HistoryContext, SyncBackend, SyncCycle, SyncCycleResult, SyncStatus,
};
use tasksync_core::SyncConfig;

use crate::commands::common::{
    format_stats_lines, load_profile, resolve_local_path, resolve_remote_path, stats_items,
    EntityStatsItem,
};
use crate::error::CliError;
use crate::snapshot_file::FileSyncIo;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSummary {
    pub status: SyncStatus,
    pub conflicts: usize,
    pub conflict_ids: Vec<String>,
    pub max_clock_skew_ms: u64,
    pub records: usize,
    pub stats: Vec<EntityStatsItem>,
}

impl From<&SyncCycleResult> for SyncSummary {
    fn from(result: &SyncCycleResult) -> Self {
        Self {
            status: result.status,
            conflicts: result.stats.total_conflicts(),
            conflict_ids: result.stats.conflict_ids(10),
            max_clock_skew_ms: result.stats.max_clock_skew_ms(),
            records: result.data.record_count(),
            stats: stats_items(&result.stats),
        }
    }
}

pub async fn run_sync(
    local: Option<PathBuf>,
    remote: Option<PathBuf>,
    retention_days: Option<i64>,
    as_json: bool,
    profile: Option<&str>,
) -> Result<(), CliError> {
    let (profile_name, profile) = load_profile(profile)?;
    let local = resolve_local_path(local, &profile)?;
    let remote = resolve_remote_path(remote, &profile)?;
    tracing::debug!(
        profile = %profile_name,
        local = %local.display(),
        remote = %remote.display(),
        "Starting file sync"
    );

    let mut config = profile.sync;
    if retention_days.is_some() {
        config.tombstone_retention_days = retention_days;
    }

    let cancel = CancelToken::new();
    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };

    let io = FileSyncIo::new(local, remote);
    let result = build_cycle(&config, cancel).run(&io).await;
    watcher.abort();
    let result = result?;

    let summary = SyncSummary::from(&result);
    if as_json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!(
        "Sync completed: {} ({} records, {} conflicts)",
        summary.status, summary.records, summary.conflicts
    );
    for line in format_stats_lines(&result.stats) {
        println!("  {line}");
    }
    Ok(())
}

/// File sync records `file` as its backend unless the profile says otherwise.
pub fn build_cycle(config: &SyncConfig, cancel: CancelToken) -> SyncCycle {
    let history = config.history_context();
    config
        .configure(SyncCycle::new())
        .with_history_context(HistoryContext {
            backend: history.backend.or(Some(SyncBackend::File)),
            ..history
        })
        .with_cancel_token(cancel)
}

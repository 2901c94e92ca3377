use std::path::{Path, PathBuf};

use serde::Serialize;
use tasksync_core::sync::{EntityMergeStats, MergeStats, SnapshotSide, SyncHistoryEntry};
use tasksync_core::util::parse_timestamp_ms;
use tasksync_core::AppData;

use crate::config_profiles::{default_local_path, CliProfile, CliProfilesConfig};
use crate::error::CliError;
use crate::snapshot_file::read_app_data;

/// Profile selected by `--profile`, the environment, or the config file.
pub fn load_profile(explicit: Option<&str>) -> Result<(String, CliProfile), CliError> {
    let config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let name = config.resolve_profile_name(explicit);
    let profile = config.profile(&name).cloned().unwrap_or_default();
    Ok((name, profile))
}

pub fn resolve_local_path(
    explicit: Option<PathBuf>,
    profile: &CliProfile,
) -> Result<PathBuf, CliError> {
    match explicit.or_else(|| profile.local_path()) {
        Some(path) => Ok(path),
        None => default_local_path().map_err(CliError::Config),
    }
}

pub fn resolve_remote_path(
    explicit: Option<PathBuf>,
    profile: &CliProfile,
) -> Result<PathBuf, CliError> {
    explicit
        .or_else(|| profile.remote_path())
        .ok_or(CliError::RemoteNotConfigured)
}

/// Read a snapshot that must exist.
pub async fn read_existing(path: &Path, side: SnapshotSide) -> Result<AppData, CliError> {
    read_app_data(path, side)
        .await?
        .ok_or_else(|| CliError::SnapshotNotFound(path.display().to_string()))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityStatsItem {
    pub entity: &'static str,
    #[serde(flatten)]
    pub stats: EntityMergeStats,
}

pub fn stats_items(stats: &MergeStats) -> Vec<EntityStatsItem> {
    ["tasks", "projects", "sections", "areas"]
        .into_iter()
        .zip(stats.entities())
        .map(|(entity, stats)| EntityStatsItem {
            entity,
            stats: stats.clone(),
        })
        .collect()
}

pub fn format_stats_lines(stats: &MergeStats) -> Vec<String> {
    stats_items(stats)
        .iter()
        .map(|item| {
            format!(
                "{:<8}  merged={} local-only={} incoming-only={} conflicts={} deletions={}",
                item.entity,
                item.stats.merged_total,
                item.stats.local_only,
                item.stats.incoming_only,
                item.stats.conflicts,
                item.stats.deletions_won
            )
        })
        .collect()
}

pub fn format_history_lines(entries: &[SyncHistoryEntry]) -> Vec<String> {
    entries
        .iter()
        .map(|entry| {
            let mut line = format!(
                "{}  {:<8}  {:<5}  conflicts={} skew={}ms",
                format_sync_timestamp(&entry.at),
                entry.status,
                entry.cycle_type.map_or("", |cycle_type| cycle_type.as_str()),
                entry.conflicts,
                entry.max_clock_skew_ms
            );
            if let Some(error) = &entry.error {
                line.push_str(&format!("  error={error}"));
            }
            line
        })
        .collect()
}

pub fn format_sync_timestamp(at: &str) -> String {
    parse_timestamp_ms(at)
        .and_then(chrono::DateTime::from_timestamp_millis)
        .map_or_else(
            || at.to_string(),
            |date_time| date_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        )
}

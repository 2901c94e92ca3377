use std::path::PathBuf;

use tasksync_core::sync::{SnapshotSide, SyncHistoryEntry};

use crate::commands::common::{format_history_lines, load_profile, resolve_local_path};
use crate::error::CliError;
use crate::snapshot_file::read_app_data;

pub async fn run_history(
    local: Option<PathBuf>,
    limit: usize,
    as_json: bool,
    profile: Option<&str>,
) -> Result<(), CliError> {
    let (_, profile) = load_profile(profile)?;
    let local = resolve_local_path(local, &profile)?;
    let entries = read_app_data(&local, SnapshotSide::Local)
        .await?
        .and_then(|data| data.settings.last_sync_history)
        .unwrap_or_default()
        .into_iter()
        .take(limit)
        .collect::<Vec<SyncHistoryEntry>>();

    if as_json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No sync history recorded.");
        return Ok(());
    }

    for line in format_history_lines(&entries) {
        println!("{line}");
    }
    Ok(())
}

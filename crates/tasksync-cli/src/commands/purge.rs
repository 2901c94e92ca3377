use std::path::Path;

use tasksync_core::sync::{purge_expired_tombstones, resolve_retention_days, SnapshotSide};
use tasksync_core::util::now_iso;

use crate::commands::common::read_existing;
use crate::error::CliError;
use crate::snapshot_file::write_json_atomic;

pub async fn run_purge(
    path: &Path,
    retention_days: Option<i64>,
    write: bool,
) -> Result<(), CliError> {
    let data = read_existing(path, SnapshotSide::Local).await?;
    let outcome = purge_expired_tombstones(data, &now_iso(), retention_days);

    println!(
        "Expired tombstones (retention {} days): {} tasks, {} attachments",
        resolve_retention_days(retention_days),
        outcome.removed_task_tombstones,
        outcome.removed_attachment_tombstones
    );

    if !outcome.removed_any() {
        return Ok(());
    }
    if write {
        write_json_atomic(path, &outcome.data).await?;
        println!("Wrote {}", path.display());
    } else {
        println!("Dry run; pass --write to persist.");
    }
    Ok(())
}

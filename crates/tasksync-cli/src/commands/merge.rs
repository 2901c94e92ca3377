use std::io::{self, Write};
use std::path::Path;

use tasksync_core::sync::{merge_app_data, validate_merged, SnapshotSide};

use crate::commands::common::{format_stats_lines, read_existing};
use crate::error::CliError;
use crate::snapshot_file::write_json_atomic;

pub async fn run_merge(
    local: &Path,
    incoming: &Path,
    output_path: Option<&Path>,
    show_stats: bool,
) -> Result<(), CliError> {
    let local = read_existing(local, SnapshotSide::Local).await?;
    let incoming = read_existing(incoming, SnapshotSide::Remote).await?;
    let merged = merge_app_data(&local, &incoming);

    let issues = validate_merged(&merged.data);
    for issue in &issues {
        eprintln!("warning: {issue}");
    }

    if let Some(path) = output_path {
        write_json_atomic(path, &merged.data).await?;
        println!("{}", path.display());
    } else {
        let mut stdout = io::stdout().lock();
        serde_json::to_writer_pretty(&mut stdout, &merged.data)?;
        writeln!(stdout)?;
    }

    if show_stats {
        for line in format_stats_lines(&merged.stats) {
            eprintln!("{line}");
        }
    }
    Ok(())
}

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] tasksync_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Snapshot not found: {0}")]
    SnapshotNotFound(String),
    #[error(
        "Remote snapshot is not configured. Pass --remote or run `tasksync config init --remote <PATH>`."
    )]
    RemoteNotConfigured,
}

//! JSON snapshot files as sync stores.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use tasksync_core::sync::{normalize_app_data, sanitize_for_remote, SnapshotSide, SyncIo};
use tasksync_core::{AppData, Result};

/// A local and a remote snapshot file, e.g. a file in a synced folder.
#[derive(Debug, Clone)]
pub struct FileSyncIo {
    local: PathBuf,
    remote: PathBuf,
}

impl FileSyncIo {
    pub fn new(local: impl Into<PathBuf>, remote: impl Into<PathBuf>) -> Self {
        Self {
            local: local.into(),
            remote: remote.into(),
        }
    }
}

impl SyncIo for FileSyncIo {
    /// A local file that does not exist yet reads as an empty dataset.
    async fn read_local(&self) -> Result<Value> {
        Ok(read_json(&self.local)
            .await?
            .unwrap_or_else(|| Value::Object(serde_json::Map::new())))
    }

    async fn read_remote(&self) -> Result<Option<Value>> {
        read_json(&self.remote).await
    }

    async fn write_local(&self, data: &AppData) -> Result<()> {
        write_json_atomic(&self.local, data).await
    }

    async fn write_remote(&self, data: &AppData) -> Result<()> {
        write_json_atomic(&self.remote, &sanitize_for_remote(data)).await
    }
}

/// Read a snapshot file; `None` when it does not exist.
pub async fn read_json(path: &Path) -> Result<Option<Value>> {
    match tokio::fs::read_to_string(path).await {
        Ok(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(error) => Err(error.into()),
    }
}

/// Read and type a snapshot file; `None` when it does not exist.
pub async fn read_app_data(path: &Path, side: SnapshotSide) -> Result<Option<AppData>> {
    match read_json(path).await? {
        Some(raw) => normalize_app_data(Some(raw), side).map(Some),
        None => Ok(None),
    }
}

/// Write pretty JSON next to `path` and rename it into place.
pub async fn write_json_atomic<T: Serialize + Sync>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let temp = temp_path(path);
    let serialized = serde_json::to_vec_pretty(value)?;
    tokio::fs::write(&temp, serialized).await?;
    if let Err(error) = tokio::fs::rename(&temp, path).await {
        let _ = tokio::fs::remove_file(&temp).await;
        return Err(error.into());
    }
    tracing::debug!(path = %path.display(), "Wrote snapshot");
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(path.file_name().unwrap_or_default());
    name.push(format!(".{}.tmp", std::process::id()));
    path.with_file_name(name)
}

//! Error types for tasksync-core

use thiserror::Error;

use crate::sync::{SnapshotSide, SyncStep};

/// Result type alias using tasksync-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Number of issues quoted in shape/validation error messages.
const ISSUE_SAMPLE_SIZE: usize = 3;

/// Errors that can occur in tasksync-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// A snapshot read from one side has a malformed top-level structure
    #[error("Invalid {side} sync payload: {}", sample_issues(.issues))]
    InvalidPayload {
        side: SnapshotSide,
        issues: Vec<String>,
    },

    /// The merged snapshot failed deep validation and was not written
    #[error("Sync validation failed: {}", sample_issues(.issues))]
    Validation { issues: Vec<String> },

    /// Collaborator transport failure (remote store, network, ...)
    #[error("Transport error: {0}")]
    Transport(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Another sync cycle for the same dataset is already running
    #[error("A sync cycle is already in progress")]
    SyncInProgress,

    /// Cancellation was observed at a step boundary
    #[error("Sync cycle cancelled before {before}")]
    Cancelled { before: SyncStep },

    /// File attachments still need to be uploaded before a remote write
    #[error("Attachment upload incomplete: {0}")]
    PendingUploads(String),
}

impl Error {
    /// True for shape and validation failures, which never leave partial writes behind.
    pub const fn is_structural(&self) -> bool {
        matches!(self, Self::InvalidPayload { .. } | Self::Validation { .. })
    }
}

fn sample_issues(issues: &[String]) -> String {
    let sample = issues
        .iter()
        .take(ISSUE_SAMPLE_SIZE)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join("; ");
    if issues.len() > ISSUE_SAMPLE_SIZE {
        format!("{sample} (+{} more)", issues.len() - ISSUE_SAMPLE_SIZE)
    } else {
        sample
    }
}

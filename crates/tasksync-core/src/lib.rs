//! tasksync-core - Core library for tasksync
//!
//! Snapshot models, the deterministic merge engine, and the sync cycle that
//! reconciles a local replica with a remote one. Storage and transport are
//! supplied by callers through [`sync::SyncIo`].

pub mod config;
pub mod error;
pub mod models;
pub mod sync;
pub mod util;

pub use config::SyncConfig;
pub use error::{Error, Result};
pub use models::{AppData, Area, Attachment, Project, Record, RecordMeta, Section, Settings, Task};
pub use sync::{SyncCoordinator, SyncCycle, SyncCycleResult, SyncIo, SyncStatus};

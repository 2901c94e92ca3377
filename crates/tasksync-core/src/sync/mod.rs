//! Snapshot synchronization: merge engine, housekeeping and the cycle that
//! drives them against a pair of stores.

mod attachments;
mod cycle;
mod history;
mod merge;
mod remote;
mod settings;
mod tombstones;
mod validate;

pub use attachments::merge_attachments;
pub use cycle::{
    CancelToken, Clock, FixedClock, SyncCoordinator, SyncCycle, SyncCycleResult, SyncIo, SyncStep,
    SystemClock,
};
pub use history::{
    append_sync_history, HistoryContext, SyncBackend, SyncCycleType, SyncHistoryEntry,
    SyncStatus, DEFAULT_HISTORY_LIMIT,
};
pub use merge::{
    merge_app_data, merge_app_data_at, merge_entities, merge_entities_with, EntityMerge,
    EntityMergeStats, MergeResult, MergeStats, Resolution, Side, CLOCK_SKEW_THRESHOLD_MS,
};
pub use remote::{
    assert_no_pending_attachment_uploads, find_pending_attachment_uploads, payloads_equal,
    sanitize_for_remote, OwnerType, PendingAttachmentUpload,
};
pub use settings::{is_incoming_newer, merge_settings, sanitize_merged_settings};
pub use tombstones::{
    purge_expired_tombstones, resolve_retention_days, PurgeOutcome,
    DEFAULT_TOMBSTONE_RETENTION_DAYS, MAX_TOMBSTONE_RETENTION_DAYS, MIN_TOMBSTONE_RETENTION_DAYS,
};
pub use validate::{
    check_merged, normalize_app_data, validate_merged, validate_payload_shape, SnapshotSide,
};

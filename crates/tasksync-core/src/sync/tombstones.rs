//! Tombstone garbage collection.

use crate::models::{AppData, Attachment, Record};
use crate::util::{parse_timestamp_ms, DAY_MS};

pub const DEFAULT_TOMBSTONE_RETENTION_DAYS: i64 = 90;
pub const MIN_TOMBSTONE_RETENTION_DAYS: i64 = 1;
pub const MAX_TOMBSTONE_RETENTION_DAYS: i64 = 3650;

/// Result of a purge pass.
#[derive(Debug, Clone, PartialEq)]
pub struct PurgeOutcome {
    pub data: AppData,
    pub removed_task_tombstones: usize,
    pub removed_attachment_tombstones: usize,
}

impl PurgeOutcome {
    pub const fn removed_any(&self) -> bool {
        self.removed_task_tombstones > 0 || self.removed_attachment_tombstones > 0
    }
}

/// Apply the default and clamp to the supported range.
pub fn resolve_retention_days(value: Option<i64>) -> i64 {
    value.map_or(DEFAULT_TOMBSTONE_RETENTION_DAYS, |days| {
        days.clamp(MIN_TOMBSTONE_RETENTION_DAYS, MAX_TOMBSTONE_RETENTION_DAYS)
    })
}

/// Hard-remove tombstones older than the retention window.
///
/// A task goes only when it carries both `deletedAt` and `purgedAt` and the
/// `purgedAt` is at or before the cutoff. Attachments of surviving tasks and
/// projects go when their own `deletedAt` is at or before the cutoff. An
/// unparsable `now` leaves the snapshot untouched.
pub fn purge_expired_tombstones(
    data: AppData,
    now: &str,
    retention_days: Option<i64>,
) -> PurgeOutcome {
    let Some(now_ms) = parse_timestamp_ms(now) else {
        return PurgeOutcome {
            data,
            removed_task_tombstones: 0,
            removed_attachment_tombstones: 0,
        };
    };
    let cutoff = now_ms.saturating_sub(resolve_retention_days(retention_days) * DAY_MS);

    let mut data = data;
    let task_count = data.tasks.len();
    data.tasks.retain(|task| {
        let purged_at = task.meta.purged_at.as_deref().unwrap_or_default();
        !(task.is_deleted() && is_at_or_before(purged_at, cutoff))
    });
    let removed_task_tombstones = task_count - data.tasks.len();

    let mut removed_attachment_tombstones = 0;
    for attachments in data
        .tasks
        .iter_mut()
        .map(|task| &mut task.attachments)
        .chain(data.projects.iter_mut().map(|project| &mut project.attachments))
    {
        if let Some(attachments) = attachments.as_mut() {
            removed_attachment_tombstones += prune_attachments(attachments, cutoff);
        }
    }

    PurgeOutcome {
        data,
        removed_task_tombstones,
        removed_attachment_tombstones,
    }
}

fn prune_attachments(attachments: &mut Vec<Attachment>, cutoff: i64) -> usize {
    let before = attachments.len();
    attachments.retain(|attachment| {
        let deleted_at = attachment.meta.deleted_at.as_deref().unwrap_or_default();
        !is_at_or_before(deleted_at, cutoff)
    });
    before - attachments.len()
}

/// Unparsable and empty values never qualify.
fn is_at_or_before(value: &str, cutoff: i64) -> bool {
    parse_timestamp_ms(value).is_some_and(|ms| ms <= cutoff)
}

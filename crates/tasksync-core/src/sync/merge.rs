//! Entity merge engine
//!
//! Reconciles two lists of records of the same type into one. Every id in
//! the union of both lists survives; ids present on both sides are resolved
//! by deletion operation time, revision, `updatedAt`, `revBy`, and finally a
//! content signature, so two replicas merging the same pair always pick the
//! same winner.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::attachments::merge_attachments;
use super::settings::merge_settings;
use crate::models::{AppData, Area, Record};
use crate::util::{now_iso, parse_timestamp_ms};

/// Clock skew between replicas above which a merge is flagged.
pub const CLOCK_SKEW_THRESHOLD_MS: u64 = 5 * 60 * 1000;

const SAMPLE_ID_LIMIT: usize = 20;
const WARNING_LIMIT: usize = 5;

/// Keys that never participate in content comparison.
const SIGNATURE_IGNORED_KEYS: [&str; 6] = [
    "rev",
    "revBy",
    "updatedAt",
    "createdAt",
    "localStatus",
    "purgedAt",
];

/// Statistics for one entity list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EntityMergeStats {
    pub local_total: usize,
    pub incoming_total: usize,
    pub merged_total: usize,
    pub local_only: usize,
    pub incoming_only: usize,
    pub conflicts: usize,
    pub resolved_using_local: usize,
    pub resolved_using_incoming: usize,
    pub deletions_won: usize,
    /// First 20 conflicting ids.
    pub conflict_ids: Vec<String>,
    pub max_clock_skew_ms: u64,
    pub timestamp_adjustments: usize,
    /// First 20 ids whose `createdAt` was repaired.
    pub timestamp_adjustment_ids: Vec<String>,
}

impl EntityMergeStats {
    fn new(local_total: usize, incoming_total: usize) -> Self {
        Self {
            local_total,
            incoming_total,
            ..Self::default()
        }
    }
}

/// Statistics for a full snapshot merge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeStats {
    pub tasks: EntityMergeStats,
    pub projects: EntityMergeStats,
    pub sections: EntityMergeStats,
    pub areas: EntityMergeStats,
}

impl MergeStats {
    pub const fn entities(&self) -> [&EntityMergeStats; 4] {
        [&self.tasks, &self.projects, &self.sections, &self.areas]
    }

    pub fn total_conflicts(&self) -> usize {
        self.entities().iter().map(|stats| stats.conflicts).sum()
    }

    /// Conflict ids across all lists, tasks first, capped at `limit`.
    pub fn conflict_ids(&self, limit: usize) -> Vec<String> {
        self.entities()
            .iter()
            .flat_map(|stats| stats.conflict_ids.iter().cloned())
            .take(limit)
            .collect()
    }

    pub fn max_clock_skew_ms(&self) -> u64 {
        self.entities()
            .iter()
            .map(|stats| stats.max_clock_skew_ms)
            .max()
            .unwrap_or(0)
    }

    pub fn timestamp_adjustments(&self) -> usize {
        self.entities()
            .iter()
            .map(|stats| stats.timestamp_adjustments)
            .sum()
    }
}

/// Output of merging one entity list.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityMerge<T> {
    pub merged: Vec<T>,
    pub stats: EntityMergeStats,
}

/// Output of merging two snapshots.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeResult {
    pub data: AppData,
    pub stats: MergeStats,
}

/// Which replica a value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Local,
    Incoming,
}

/// A resolved pair handed to a refinement callback.
#[derive(Debug, Clone, Copy)]
pub struct Resolution<'a, T> {
    pub local: &'a T,
    pub incoming: &'a T,
    pub winner: Side,
}

impl<'a, T> Resolution<'a, T> {
    pub const fn winner(&self) -> &'a T {
        match self.winner {
            Side::Local => self.local,
            Side::Incoming => self.incoming,
        }
    }

    pub const fn loser(&self) -> &'a T {
        match self.winner {
            Side::Local => self.incoming,
            Side::Incoming => self.local,
        }
    }
}

/// Merge two lists, taking the winner of each colliding pair as-is.
pub fn merge_entities<T: Record>(local: &[T], incoming: &[T]) -> EntityMerge<T> {
    merge_entities_with(local, incoming, |resolution| resolution.winner().clone())
}

/// Merge two lists; `refine` builds the output record for every id present
/// on both sides.
///
/// Output order is local ids in local order followed by incoming-only ids in
/// incoming order. When an id repeats within one list the last entry counts.
pub fn merge_entities_with<T, F>(local: &[T], incoming: &[T], mut refine: F) -> EntityMerge<T>
where
    T: Record,
    F: FnMut(Resolution<'_, T>) -> T,
{
    let local_by_id = index_by_id(local);
    let incoming_by_id = index_by_id(incoming);
    let ids = ordered_ids(local, incoming);

    let mut merger = Merger::new(local.len(), incoming.len());
    let mut merged = Vec::with_capacity(ids.len());

    for id in ids {
        match (local_by_id.get(id).copied(), incoming_by_id.get(id).copied()) {
            (Some(local_item), None) => {
                merger.stats.local_only += 1;
                merger.stats.resolved_using_local += 1;
                merged.push(merger.normalize(local_item));
            }
            (None, Some(incoming_item)) => {
                merger.stats.incoming_only += 1;
                merger.stats.resolved_using_incoming += 1;
                merged.push(merger.normalize(incoming_item));
            }
            (Some(local_item), Some(incoming_item)) => {
                let local_item = merger.normalize(local_item);
                let incoming_item = merger.normalize(incoming_item);
                let winner = merger.resolve(id, &local_item, &incoming_item);
                let refined = refine(Resolution {
                    local: &local_item,
                    incoming: &incoming_item,
                    winner,
                });
                merged.push(merger.normalize(&refined));
            }
            (None, None) => {}
        }
    }

    merger.stats.merged_total = merged.len();
    EntityMerge {
        merged,
        stats: merger.stats,
    }
}

/// Merge two snapshots using the wall clock for area timestamp repair.
pub fn merge_app_data(local: &AppData, incoming: &AppData) -> MergeResult {
    merge_app_data_at(local, incoming, &now_iso())
}

/// Merge two snapshots; `now` fills in missing area timestamps.
///
/// Top-level keys outside the known lists are kept from the local snapshot.
pub fn merge_app_data_at(local: &AppData, incoming: &AppData, now: &str) -> MergeResult {
    let tasks = merge_entities_with(&local.tasks, &incoming.tasks, |resolution| {
        let mut task = resolution.winner().clone();
        task.attachments = merge_attachments(
            resolution.local.attachments.as_deref(),
            resolution.incoming.attachments.as_deref(),
        );
        task
    });
    let projects = merge_entities_with(&local.projects, &incoming.projects, |resolution| {
        let mut project = resolution.winner().clone();
        project.attachments = merge_attachments(
            resolution.local.attachments.as_deref(),
            resolution.incoming.attachments.as_deref(),
        );
        project
    });
    let sections = merge_entities(&local.sections, &incoming.sections);
    let areas = merge_areas(&local.areas, &incoming.areas, now);

    MergeResult {
        data: AppData {
            tasks: tasks.merged,
            projects: projects.merged,
            sections: sections.merged,
            areas: areas.merged,
            settings: merge_settings(&local.settings, &incoming.settings),
            extra: local.extra.clone(),
        },
        stats: MergeStats {
            tasks: tasks.stats,
            projects: projects.stats,
            sections: sections.stats,
            areas: areas.stats,
        },
    }
}

/// Areas may predate timestamps and ordering; both are repaired around the merge.
fn merge_areas(local: &[Area], incoming: &[Area], now: &str) -> EntityMerge<Area> {
    let local = local
        .iter()
        .map(|area| with_area_timestamps(area, now))
        .collect::<Vec<_>>();
    let incoming = incoming
        .iter()
        .map(|area| with_area_timestamps(area, now))
        .collect::<Vec<_>>();

    let mut result = merge_entities(&local, &incoming);
    let mut next_order = result
        .merged
        .iter()
        .filter_map(|area| area.order)
        .fold(-1, i64::max)
        .saturating_add(1);
    for area in &mut result.merged {
        if area.order.is_none() {
            area.order = Some(next_order);
            next_order = next_order.saturating_add(1);
        }
    }
    result
}

fn with_area_timestamps(area: &Area, now: &str) -> Area {
    let mut area = area.clone();
    let created = area
        .meta
        .created_at
        .clone()
        .filter(|value| !value.is_empty());
    let updated = Some(area.meta.updated_at.clone()).filter(|value| !value.is_empty());

    area.meta.created_at = Some(
        created
            .clone()
            .or_else(|| updated.clone())
            .unwrap_or_else(|| now.to_string()),
    );
    area.meta.updated_at = updated.or(created).unwrap_or_else(|| now.to_string());
    area
}

fn index_by_id<T: Record>(items: &[T]) -> HashMap<&str, &T> {
    items.iter().map(|item| (item.id(), item)).collect()
}

fn ordered_ids<'a, T: Record>(local: &'a [T], incoming: &'a [T]) -> Vec<&'a str> {
    let mut seen = HashSet::new();
    local
        .iter()
        .chain(incoming)
        .map(|item| item.id())
        .filter(|id| seen.insert(*id))
        .collect()
}

/// Per-list merge state: statistics plus warning throttles.
struct Merger {
    stats: EntityMergeStats,
    invalid_deleted_at: usize,
}

impl Merger {
    fn new(local_total: usize, incoming_total: usize) -> Self {
        Self {
            stats: EntityMergeStats::new(local_total, incoming_total),
            invalid_deleted_at: 0,
        }
    }

    /// Clamp `createdAt` to `updatedAt` when it lies in the future of it.
    fn normalize<T: Record>(&mut self, item: &T) -> T {
        let mut item = item.clone();
        let meta = item.meta();
        let Some(created_ms) = meta.created_at.as_deref().and_then(parse_timestamp_ms) else {
            return item;
        };
        let Some(updated_ms) = meta.updated_ms() else {
            return item;
        };
        if updated_ms >= created_ms {
            return item;
        }

        self.stats.timestamp_adjustments += 1;
        if self.stats.timestamp_adjustment_ids.len() < SAMPLE_ID_LIMIT {
            self.stats
                .timestamp_adjustment_ids
                .push(item.id().to_string());
        }
        if self.stats.timestamp_adjustments <= WARNING_LIMIT {
            tracing::warn!(
                id = item.id(),
                created_at = meta.created_at.as_deref().unwrap_or_default(),
                updated_at = %meta.updated_at,
                "Normalized createdAt after updatedAt"
            );
        }

        let meta = item.meta_mut();
        meta.created_at = Some(meta.updated_at.clone());
        item
    }

    fn resolve<T: Record>(&mut self, id: &str, local: &T, incoming: &T) -> Side {
        let (local_meta, incoming_meta) = (local.meta(), incoming.meta());
        let local_time = local_meta.updated_ms();
        let incoming_time = incoming_meta.updated_ms();
        let local_rev = local_meta.rev_or_zero();
        let incoming_rev = incoming_meta.rev_or_zero();
        let local_rev_by = local_meta.rev_by_or_empty();
        let incoming_rev_by = incoming_meta.rev_by_or_empty();
        let local_deleted = local_meta.is_deleted();
        let incoming_deleted = incoming_meta.is_deleted();

        let has_revision = local_rev > 0
            || incoming_rev > 0
            || !local_rev_by.is_empty()
            || !incoming_rev_by.is_empty();
        let deletion_differs = local_deleted != incoming_deleted;
        let rev_order = local_rev.cmp(&incoming_rev);
        let rev_by_differs = local_rev_by != incoming_rev_by;
        let content_differs = has_revision
            && rev_order == Ordering::Equal
            && !rev_by_differs
            && !deletion_differs
            && signature(local) != signature(incoming);

        let differs = if has_revision {
            rev_order != Ordering::Equal || rev_by_differs || deletion_differs || content_differs
        } else {
            local_time != incoming_time || deletion_differs
        };
        if differs {
            self.stats.conflicts += 1;
            if self.stats.conflict_ids.len() < SAMPLE_ID_LIMIT {
                self.stats.conflict_ids.push(id.to_string());
            }
        }

        if let (Some(local_ms), Some(incoming_ms)) = (local_time, incoming_time) {
            let skew = incoming_ms.abs_diff(local_ms);
            self.stats.max_clock_skew_ms = self.stats.max_clock_skew_ms.max(skew);
        }

        // Unparsable timestamps are None, which orders below every parsed value.
        let newer = if incoming_time > local_time {
            Side::Incoming
        } else {
            Side::Local
        };
        let winner = if deletion_differs {
            self.by_operation_time(local, incoming)
        } else if has_revision {
            match rev_order {
                Ordering::Greater => Side::Local,
                Ordering::Less => Side::Incoming,
                Ordering::Equal if local_time != incoming_time => newer,
                Ordering::Equal
                    if rev_by_differs
                        && !local_rev_by.is_empty()
                        && !incoming_rev_by.is_empty() =>
                {
                    if incoming_rev_by > local_rev_by {
                        Side::Incoming
                    } else {
                        Side::Local
                    }
                }
                Ordering::Equal => deterministic_winner(local, incoming),
            }
        } else if local_time == incoming_time {
            deterministic_winner(local, incoming)
        } else {
            newer
        };

        match winner {
            Side::Local => self.stats.resolved_using_local += 1,
            Side::Incoming => self.stats.resolved_using_incoming += 1,
        }
        let winner_deleted = match winner {
            Side::Local => local_deleted,
            Side::Incoming => incoming_deleted,
        };
        if winner_deleted && (!local_deleted || !incoming_deleted || differs) {
            self.stats.deletions_won += 1;
        }

        winner
    }

    /// Later operation wins; exact ties go to the deleted side.
    fn by_operation_time<T: Record>(&mut self, local: &T, incoming: &T) -> Side {
        let local_op = self.operation_time(local);
        let incoming_op = self.operation_time(incoming);
        match incoming_op.cmp(&local_op) {
            Ordering::Greater => Side::Incoming,
            Ordering::Less => Side::Local,
            Ordering::Equal if local.is_deleted() => Side::Local,
            Ordering::Equal => Side::Incoming,
        }
    }

    /// `max(updatedAt, deletedAt)`; an unparsable `deletedAt` falls back to `updatedAt`.
    fn operation_time<T: Record>(&mut self, item: &T) -> Option<i64> {
        let meta = item.meta();
        let updated = meta.updated_ms();
        if !meta.is_deleted() {
            return updated;
        }

        let deleted_at = meta.deleted_at.as_deref().unwrap_or_default();
        let Some(deleted) = parse_timestamp_ms(deleted_at) else {
            self.invalid_deleted_at += 1;
            if self.invalid_deleted_at <= WARNING_LIMIT {
                tracing::warn!(
                    id = item.id(),
                    deleted_at,
                    updated_at = %meta.updated_at,
                    "Invalid deletedAt timestamp during merge; using updatedAt fallback"
                );
            }
            return updated;
        };
        Some(updated.map_or(deleted, |updated| updated.max(deleted)))
    }
}

/// Greater signature wins. Equal signatures fall back to the full canonical
/// form, bookkeeping fields included; only identical records go to incoming.
fn deterministic_winner<T: Record>(local: &T, incoming: &T) -> Side {
    let order = signature(incoming)
        .cmp(&signature(local))
        .then_with(|| canonical(incoming).cmp(&canonical(local)));
    if order == Ordering::Less {
        Side::Local
    } else {
        Side::Incoming
    }
}

/// Canonical key-sorted JSON of a record, without bookkeeping fields.
pub(crate) fn signature<T: Serialize>(item: &T) -> String {
    serde_json::to_value(item)
        .map(|value| comparable(value, true).to_string())
        .unwrap_or_default()
}

/// Canonical key-sorted JSON of a record, every field included.
fn canonical<T: Serialize>(item: &T) -> String {
    serde_json::to_value(item)
        .map(|value| comparable(value, false).to_string())
        .unwrap_or_default()
}

fn comparable(value: Value, strip: bool) -> Value {
    match value {
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| comparable(item, strip))
                .collect(),
        ),
        Value::Object(map) => {
            let is_file = map.get("kind").and_then(Value::as_str) == Some("file");
            let mut entries = map
                .into_iter()
                .filter(|(key, _)| {
                    !strip
                        || !(SIGNATURE_IGNORED_KEYS.contains(&key.as_str())
                            || (is_file && key == "uri"))
                })
                .collect::<Vec<_>>();
            entries.sort_by(|(left, _), (right, _)| left.cmp(right));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, comparable(value, strip)))
                    .collect::<Map<_, _>>(),
            )
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Attachment, LocalStatus, RecordMeta, Section, Task};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    const DAY1: &str = "2025-01-01T00:00:00Z";
    const DAY2: &str = "2025-01-02T00:00:00Z";
    const DAY3: &str = "2025-01-03T00:00:00Z";

    fn task(id: &str, title: &str, meta: RecordMeta) -> Task {
        Task::new(id, title, DAY1).with_meta(meta)
    }

    #[test]
    fn one_sided_records_are_kept_in_order() {
        let local = vec![task("a", "a", RecordMeta::at(DAY1))];
        let incoming = vec![
            task("b", "b", RecordMeta::at(DAY1)),
            task("a", "a", RecordMeta::at(DAY1)),
        ];
        let result = merge_entities(&local, &incoming);
        let ids = result.merged.iter().map(|t| t.id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(result.stats.local_only, 0);
        assert_eq!(result.stats.incoming_only, 1);
        assert_eq!(result.stats.merged_total, 2);
        assert_eq!(result.stats.conflicts, 0);
    }

    #[test]
    fn higher_rev_beats_fresher_timestamp() {
        let local = vec![task("t1", "local", RecordMeta::at(DAY2).with_rev(2, "device-a"))];
        let incoming = vec![task(
            "t1",
            "incoming",
            RecordMeta::at(DAY3).with_rev(1, "device-b"),
        )];
        let result = merge_entities(&local, &incoming);
        assert_eq!(result.merged[0].meta.rev, Some(2));
        assert_eq!(result.merged[0].title.as_deref(), Some("local"));
        assert_eq!(result.stats.conflicts, 1);
        assert_eq!(result.stats.resolved_using_local, 1);
        assert_eq!(result.stats.max_clock_skew_ms, 86_400_000);
    }

    #[test]
    fn rev_five_defeats_rev_three_in_both_directions() {
        let five = task("t1", "five", RecordMeta::at(DAY1).with_rev(5, "device-a"));
        let three = task("t1", "three", RecordMeta::at(DAY3).with_rev(3, "device-b"));
        let forward = merge_entities(&[five.clone()], &[three.clone()]);
        let backward = merge_entities(&[three], &[five]);
        assert_eq!(forward.merged[0].title.as_deref(), Some("five"));
        assert_eq!(backward.merged[0].title.as_deref(), Some("five"));
    }

    #[test]
    fn deletion_wins_exact_operation_time_tie() {
        let live = task("t1", "x", RecordMeta::at(DAY2).with_rev(3, "device-a"));
        let deleted = task(
            "t1",
            "x",
            RecordMeta::at(DAY1).with_rev(3, "device-b").deleted(DAY2),
        );

        let forward = merge_entities(&[live.clone()], &[deleted.clone()]);
        let backward = merge_entities(&[deleted.clone()], &[live]);
        assert!(forward.merged[0].is_deleted());
        assert!(backward.merged[0].is_deleted());
        assert_eq!(forward.stats.deletions_won, 1);
        assert_eq!(forward.stats.conflicts, 1);
    }

    #[test]
    fn later_edit_beats_earlier_deletion() {
        let deleted = task("t1", "x", RecordMeta::at(DAY1).deleted(DAY2));
        let edited = task("t1", "edited", RecordMeta::at(DAY3));
        let result = merge_entities(&[deleted], &[edited]);
        assert_eq!(result.merged[0].title.as_deref(), Some("edited"));
        assert!(!result.merged[0].is_deleted());
        assert_eq!(result.stats.deletions_won, 0);
    }

    #[test]
    fn invalid_deleted_at_falls_back_to_updated_at() {
        let deleted = task("t1", "x", RecordMeta::at(DAY2).deleted("not a date"));
        let edited = task("t1", "edited", RecordMeta::at(DAY1));
        let result = merge_entities(&[edited], &[deleted]);
        assert!(result.merged[0].is_deleted());
    }

    #[test]
    fn equal_revisions_fall_back_to_updated_at_then_rev_by() {
        let a = task("t1", "a", RecordMeta::at(DAY1).with_rev(2, "device-a"));
        let b = task("t1", "b", RecordMeta::at(DAY2).with_rev(2, "device-a"));
        assert_eq!(
            merge_entities(&[b.clone()], &[a.clone()]).merged[0].title.as_deref(),
            Some("b")
        );

        let a = task("t1", "a", RecordMeta::at(DAY1).with_rev(2, "device-a"));
        let z = task("t1", "z", RecordMeta::at(DAY1).with_rev(2, "device-z"));
        assert_eq!(
            merge_entities(&[z.clone()], &[a.clone()]).merged[0].title.as_deref(),
            Some("z")
        );
        assert_eq!(
            merge_entities(&[a], &[z]).merged[0].title.as_deref(),
            Some("z")
        );
    }

    #[test]
    fn metadata_tie_uses_content_signature() {
        let apple = task("t1", "apple", RecordMeta::at(DAY1).with_rev(1, "device-a"));
        let pear = task("t1", "pear", RecordMeta::at(DAY1).with_rev(1, "device-a"));

        let forward = merge_entities(&[apple.clone()], &[pear.clone()]);
        let backward = merge_entities(&[pear], &[apple]);
        assert_eq!(forward.merged, backward.merged);
        assert_eq!(forward.stats.conflicts, 1);
    }

    #[test]
    fn without_revisions_newer_update_wins_and_unparsable_is_older() {
        let old = task("t1", "old", RecordMeta::at("garbage"));
        let new = task("t1", "new", RecordMeta::at(DAY1));
        let result = merge_entities(&[new], &[old]);
        assert_eq!(result.merged[0].title.as_deref(), Some("new"));
        assert_eq!(result.stats.conflicts, 1);
        assert_eq!(result.stats.max_clock_skew_ms, 0);
    }

    #[test]
    fn identical_records_are_not_conflicts() {
        let item = task("t1", "same", RecordMeta::at(DAY1).with_rev(4, "device-a"));
        let result = merge_entities(&[item.clone()], &[item.clone()]);
        assert_eq!(result.merged, vec![item]);
        assert_eq!(result.stats.conflicts, 0);
        assert_eq!(result.stats.resolved_using_incoming, 1);
    }

    #[test]
    fn created_after_updated_is_repaired() {
        let mut meta = RecordMeta::at(DAY1);
        meta.created_at = Some(DAY3.to_string());
        let result = merge_entities(&[task("t1", "x", meta)], &[]);
        assert_eq!(result.merged[0].meta.created_at.as_deref(), Some(DAY1));
        assert_eq!(result.stats.timestamp_adjustments, 1);
        assert_eq!(result.stats.timestamp_adjustment_ids, vec!["t1".to_string()]);
    }

    #[test]
    fn duplicate_ids_keep_the_last_entry() {
        let first = Section::new("s1", "p1", "first", DAY1);
        let second = Section::new("s1", "p1", "second", DAY1);
        let result = merge_entities(&[first, second], &[]);
        assert_eq!(result.merged.len(), 1);
        assert_eq!(result.merged[0].title.as_deref(), Some("second"));
    }

    #[test]
    fn refine_receives_winner_side() {
        let local = task("t1", "local", RecordMeta::at(DAY1));
        let incoming = task("t1", "incoming", RecordMeta::at(DAY2));
        let result = merge_entities_with(&[local], &[incoming], |resolution| {
            assert_eq!(resolution.winner, Side::Incoming);
            let mut task = resolution.winner().clone();
            task.project_id = resolution.loser().title.clone();
            task
        });
        assert_eq!(result.merged[0].project_id.as_deref(), Some("local"));
    }

    #[test]
    fn file_uri_and_local_status_do_not_affect_signature() {
        let mut here = Attachment::file("a1", "scan", "/home/me/scan.pdf", DAY1).unwrap();
        let mut there = here.clone();
        there.uri = "/Users/other/scan.pdf".to_string();
        there.local_status = None;
        here.meta.rev = Some(3);
        assert_eq!(signature(&here), signature(&there));

        let link = Attachment::link("a2", "docs", "https://a.example", DAY1).unwrap();
        let mut moved = link.clone();
        moved.uri = "https://b.example".to_string();
        assert_ne!(signature(&link), signature(&moved));
    }

    #[test]
    fn new_area_gets_order_after_existing_max() {
        let local = AppData {
            areas: vec![
                Area::new("work", "Work", Some(3), DAY1),
                Area::new("home", "Home", Some(7), DAY1),
            ],
            ..AppData::default()
        };
        let incoming = AppData {
            areas: vec![Area::new("hobby", "Hobby", None, DAY1)],
            ..AppData::default()
        };
        let result = merge_app_data_at(&local, &incoming, DAY2);
        let orders = result
            .data
            .areas
            .iter()
            .map(|area| (area.id.as_str(), area.order))
            .collect::<Vec<_>>();
        assert_eq!(
            orders,
            vec![("work", Some(3)), ("home", Some(7)), ("hobby", Some(8))]
        );
    }

    #[test]
    fn areas_without_timestamps_are_filled() {
        let mut area = Area::new("a1", "Inbox", Some(0), DAY1);
        area.meta = RecordMeta::default();
        let local = AppData {
            areas: vec![area],
            ..AppData::default()
        };
        let result = merge_app_data_at(&local, &AppData::default(), DAY2);
        assert_eq!(result.data.areas[0].meta.updated_at, DAY2);
        assert_eq!(result.data.areas[0].meta.created_at.as_deref(), Some(DAY2));
    }

    #[test]
    fn merge_stats_aggregate_across_lists() {
        let mut stats = MergeStats::default();
        stats.tasks.conflicts = 2;
        stats.tasks.conflict_ids = vec!["t1".into(), "t2".into()];
        stats.areas.conflicts = 1;
        stats.areas.conflict_ids = vec!["a1".into()];
        stats.sections.max_clock_skew_ms = 10;
        stats.projects.timestamp_adjustments = 3;
        assert_eq!(stats.total_conflicts(), 3);
        assert_eq!(stats.conflict_ids(2), vec!["t1".to_string(), "t2".to_string()]);
        assert_eq!(stats.max_clock_skew_ms(), 10);
        assert_eq!(stats.timestamp_adjustments(), 3);
    }

    const DAYS: [&str; 3] = [DAY1, DAY2, DAY3];

    fn arb_attachment() -> impl Strategy<Value = Attachment> {
        (
            0..3usize,
            any::<bool>(),
            prop::option::of(prop::sample::select(vec!["/home/me/scan.pdf", "/Users/me/scan.pdf"])),
            prop::option::of(prop::sample::select(vec!["attachments/a", "attachments/b"])),
            prop::option::of(prop::sample::select(vec!["hash-1", "hash-2"])),
            0..3usize,
            any::<bool>(),
        )
            .prop_map(|(id, is_file, uri, cloud_key, file_hash, updated, missing)| {
                let id = format!("a{id}");
                let mut attachment = if is_file {
                    Attachment::file(&id, "scan", uri.unwrap_or_default(), DAYS[updated])
                } else {
                    let url = uri.map_or("https://a.example", |_| "https://b.example");
                    Attachment::link(&id, "docs", url, DAYS[updated])
                }
                .unwrap();
                if is_file {
                    attachment.cloud_key = cloud_key.map(str::to_string);
                    attachment.file_hash = file_hash.map(str::to_string);
                    if missing && attachment.local_status.is_some() {
                        attachment.local_status = Some(LocalStatus::Missing);
                    }
                }
                attachment
            })
    }

    fn arb_attachments() -> impl Strategy<Value = Option<Vec<Attachment>>> {
        prop::option::of(prop::collection::vec(arb_attachment(), 0..3).prop_map(|attachments| {
            let mut seen = HashSet::new();
            attachments
                .into_iter()
                .filter(|attachment| seen.insert(attachment.id.clone()))
                .collect::<Vec<_>>()
        }))
    }

    fn arb_task(with_revision: bool) -> impl Strategy<Value = Task> {
        (
            (0..4usize, prop::sample::select(vec!["alpha", "beta"])),
            (0..3usize, 0..3usize, prop::option::of(0..3usize)),
            (0..4u64, prop::sample::select(vec!["device-a", "device-b"])),
            arb_attachments(),
        )
            .prop_map(
                move |((id, title), (created, updated, deleted), (rev, rev_by), attachments)| {
                    let mut meta = RecordMeta::at(DAYS[updated]);
                    meta.created_at = Some(DAYS[created].to_string());
                    if let Some(deleted) = deleted {
                        meta = meta.deleted(DAYS[deleted]);
                    }
                    if with_revision {
                        meta = meta.with_rev(rev, rev_by);
                    }
                    let mut task = task(&format!("t{id}"), title, meta);
                    task.attachments = attachments;
                    task
                },
            )
    }

    fn arb_list(with_revision: bool) -> impl Strategy<Value = Vec<Task>> {
        prop::collection::vec(arb_task(with_revision), 0..6).prop_map(|tasks| {
            let mut seen = HashSet::new();
            tasks
                .into_iter()
                .filter(|task| seen.insert(task.id.clone()))
                .collect()
        })
    }

    fn merged_tasks(local: &[Task], incoming: &[Task]) -> MergeResult {
        let snapshot = |tasks: &[Task]| AppData {
            tasks: tasks.to_vec(),
            ..AppData::default()
        };
        merge_app_data_at(&snapshot(local), &snapshot(incoming), DAY3)
    }

    /// Lists compared without regard to record or attachment order.
    fn sorted(mut tasks: Vec<Task>) -> Vec<Task> {
        tasks.sort_by(|left, right| left.id.cmp(&right.id));
        for task in &mut tasks {
            if let Some(attachments) = task.attachments.as_mut() {
                attachments.sort_by(|left, right| left.id.cmp(&right.id));
            }
        }
        tasks
    }

    #[test]
    fn created_at_only_difference_resolves_the_same_both_ways() {
        let mut early = RecordMeta::at(DAY3).with_rev(2, "device-a");
        early.created_at = Some(DAY1.to_string());
        let early = task("t1", "same", early);
        let late = task("t1", "same", RecordMeta::at(DAY3).with_rev(2, "device-a"));

        let forward = merge_entities(&[early.clone()], &[late.clone()]);
        let backward = merge_entities(&[late.clone()], &[early]);
        assert_eq!(forward.merged, backward.merged);
        assert_eq!(forward.merged, vec![late]);
        assert_eq!(forward.stats.conflicts, 0);
    }

    #[test]
    fn local_status_only_difference_resolves_the_same_both_ways() {
        let here = Attachment::file("a1", "scan", "/home/me/scan.pdf", DAY1).unwrap();
        let mut there = here.clone();
        there.local_status = Some(LocalStatus::Missing);

        let forward = merge_entities(&[here.clone()], &[there.clone()]);
        let backward = merge_entities(&[there], &[here]);
        assert_eq!(forward.merged, backward.merged);
    }

    proptest! {
        #[test]
        fn merge_converges_regardless_of_side(
            (a, b) in any::<bool>().prop_flat_map(|rev| (arb_list(rev), arb_list(rev))),
        ) {
            let forward = merged_tasks(&a, &b);
            let backward = merged_tasks(&b, &a);
            prop_assert_eq!(sorted(forward.data.tasks), sorted(backward.data.tasks));
            prop_assert_eq!(forward.stats.tasks.conflicts, backward.stats.tasks.conflicts);
        }

        #[test]
        fn merge_with_itself_is_identity(a in any::<bool>().prop_flat_map(arb_list)) {
            // createdAt repair is the only change a one-sided merge makes.
            let a = merged_tasks(&a, &[]).data.tasks;
            let result = merged_tasks(&a, &a);
            prop_assert_eq!(result.data.tasks, a);
            prop_assert_eq!(result.stats.tasks.conflicts, 0);
        }
    }
}

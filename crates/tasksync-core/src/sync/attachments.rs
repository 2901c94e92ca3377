//! Attachment reconciliation for tasks and projects.

use std::collections::HashMap;

use super::merge::{merge_entities_with, Resolution};
use crate::models::{Attachment, LocalStatus};
use crate::util::is_non_empty;

/// Merge the attachment lists of a task or project present on both sides.
///
/// Returns `None` only when neither side ever had a list; a list that exists
/// on either side (even empty) yields an explicit, possibly empty, list.
pub fn merge_attachments(
    local: Option<&[Attachment]>,
    incoming: Option<&[Attachment]>,
) -> Option<Vec<Attachment>> {
    let explicit = local.is_some() || incoming.is_some();
    let local = local.unwrap_or_default();
    let incoming = incoming.unwrap_or_default();
    if local.is_empty() && incoming.is_empty() {
        return explicit.then(Vec::new);
    }

    let local_files = files_by_id(local);
    let incoming_files = files_by_id(incoming);

    let merged = merge_entities_with(local, incoming, reconcile_file)
        .merged
        .into_iter()
        .map(|attachment| fill_from_sides(attachment, &local_files, &incoming_files))
        .collect();
    Some(merged)
}

/// Keep file access and upload provenance that the structural winner lacks.
fn reconcile_file(resolution: Resolution<'_, Attachment>) -> Attachment {
    let winner = resolution.winner();
    let (local, incoming) = (resolution.local, resolution.incoming);
    if !(winner.is_file() && local.is_file() && incoming.is_file()) {
        return winner.clone();
    }

    let other = resolution.loser();
    let mut merged = winner.clone();
    if winner.has_available_uri() {
        merged.local_status = Some(winner.local_status.unwrap_or(LocalStatus::Available));
    } else if other.has_available_uri() {
        merged.uri.clone_from(&other.uri);
        merged.local_status = Some(other.local_status.unwrap_or(LocalStatus::Available));
    } else if merged.local_status.is_none() && is_non_empty(&merged.uri) {
        merged.local_status = Some(LocalStatus::Available);
    }

    merged.cloud_key = winner
        .cloud_key
        .clone()
        .or_else(|| local.cloud_key.clone())
        .or_else(|| incoming.cloud_key.clone());
    merged.file_hash = winner
        .file_hash
        .clone()
        .or_else(|| local.file_hash.clone())
        .or_else(|| incoming.file_hash.clone());
    merged
}

/// Fill provenance on one-sided files and infer availability from the uri.
fn fill_from_sides(
    mut attachment: Attachment,
    local_files: &HashMap<&str, &Attachment>,
    incoming_files: &HashMap<&str, &Attachment>,
) -> Attachment {
    if !attachment.is_file() {
        return attachment;
    }

    let local = local_files.get(attachment.id.as_str()).copied();
    let incoming = incoming_files.get(attachment.id.as_str()).copied();
    if attachment.cloud_key.is_none() {
        attachment.cloud_key = local
            .and_then(|file| file.cloud_key.clone())
            .or_else(|| incoming.and_then(|file| file.cloud_key.clone()));
    }
    if attachment.file_hash.is_none() {
        attachment.file_hash = local
            .and_then(|file| file.file_hash.clone())
            .or_else(|| incoming.and_then(|file| file.file_hash.clone()));
    }
    if attachment.local_status.is_none() && attachment.has_available_uri() {
        attachment.local_status = Some(LocalStatus::Available);
    }
    attachment
}

fn files_by_id(attachments: &[Attachment]) -> HashMap<&str, &Attachment> {
    attachments
        .iter()
        .filter(|attachment| attachment.is_file())
        .map(|attachment| (attachment.id.as_str(), attachment))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecordMeta;
    use pretty_assertions::assert_eq;

    const DAY1: &str = "2025-01-01T00:00:00Z";
    const DAY2: &str = "2025-01-02T00:00:00Z";

    fn file(id: &str, uri: &str, at: &str) -> Attachment {
        Attachment::file(id, "scan.pdf", uri, at).unwrap()
    }

    #[test]
    fn absent_on_both_sides_stays_absent() {
        assert_eq!(merge_attachments(None, None), None);
        assert_eq!(merge_attachments(Some(&[]), None), Some(Vec::new()));
        assert_eq!(merge_attachments(None, Some(&[])), Some(Vec::new()));
    }

    #[test]
    fn winner_without_local_file_borrows_other_uri() {
        let local = file("a1", "/home/me/scan.pdf", DAY1);
        let mut incoming = file("a1", "", DAY2);
        incoming.local_status = None;
        incoming.cloud_key = Some("uploads/a1".to_string());

        let merged = merge_attachments(Some(&[local]), Some(&[incoming])).unwrap();
        assert_eq!(merged[0].uri, "/home/me/scan.pdf");
        assert_eq!(merged[0].local_status, Some(LocalStatus::Available));
        assert_eq!(merged[0].cloud_key.as_deref(), Some("uploads/a1"));
        assert_eq!(merged[0].meta.updated_at, DAY2);
    }

    #[test]
    fn missing_local_copy_is_not_borrowed() {
        let mut local = file("a1", "/home/me/scan.pdf", DAY1);
        local.local_status = Some(LocalStatus::Missing);
        let mut incoming = file("a1", "", DAY2);
        incoming.local_status = None;

        let merged = merge_attachments(Some(&[local]), Some(&[incoming])).unwrap();
        assert_eq!(merged[0].uri, "");
        assert_eq!(merged[0].local_status, None);
    }

    #[test]
    fn provenance_survives_a_losing_side() {
        let mut local = file("a1", "/a", DAY1);
        local.file_hash = Some("sha256:abc".to_string());
        let incoming = file("a1", "/b", DAY2);

        let merged = merge_attachments(Some(&[local]), Some(&[incoming])).unwrap();
        assert_eq!(merged[0].uri, "/b");
        assert_eq!(merged[0].file_hash.as_deref(), Some("sha256:abc"));
    }

    #[test]
    fn links_are_merged_structurally() {
        let local = Attachment::link("l1", "docs", "https://a.example", DAY1).unwrap();
        let incoming = Attachment::link("l1", "docs", "https://b.example", DAY2).unwrap();
        let merged = merge_attachments(Some(&[local]), Some(&[incoming.clone()])).unwrap();
        assert_eq!(merged, vec![incoming]);
    }

    #[test]
    fn one_sided_file_gets_available_status() {
        let mut only = file("a1", "/x", DAY1);
        only.local_status = None;
        let merged = merge_attachments(Some(&[only]), Some(&[])).unwrap();
        assert_eq!(merged[0].local_status, Some(LocalStatus::Available));
    }

    #[test]
    fn deleted_attachment_tombstone_propagates() {
        let live = file("a1", "/x", DAY1);
        let deleted = Attachment {
            meta: RecordMeta::at(DAY1).deleted(DAY2),
            ..file("a1", "", DAY1)
        };
        let merged = merge_attachments(Some(&[live]), Some(&[deleted])).unwrap();
        assert!(merged[0].meta.is_deleted());
        assert_eq!(merged[0].uri, "/x");
    }
}

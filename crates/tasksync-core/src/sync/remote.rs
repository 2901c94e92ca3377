//! Helpers for snapshots leaving this device.

use std::fmt;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::models::{
    AiSettings, AppData, Attachment, GroupValues, LocalStatus, Settings, SyncGroup,
};

const PENDING_SAMPLE_LIMIT: usize = 3;

/// Kind of record that owns an attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OwnerType {
    Task,
    Project,
}

impl OwnerType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Task => "task",
            Self::Project => "project",
        }
    }
}

impl fmt::Display for OwnerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file attachment whose bytes have not reached remote storage yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingAttachmentUpload {
    pub owner_type: OwnerType,
    pub owner_id: String,
    pub attachment_id: String,
    pub title: String,
}

/// Strip device-local state before a snapshot is written to a shared store.
///
/// File attachments lose `uri` and `localStatus`. Settings keep the sync
/// preferences, their markers and only the groups this replica opted into;
/// the AI API key and the offline speech model path never leave the device.
pub fn sanitize_for_remote(data: &AppData) -> AppData {
    let mut data = data.clone();
    for attachments in data
        .tasks
        .iter_mut()
        .filter_map(|task| task.attachments.as_mut())
        .chain(
            data.projects
                .iter_mut()
                .filter_map(|project| project.attachments.as_mut()),
        )
    {
        attachments
            .iter_mut()
            .filter(|attachment| attachment.is_file())
            .for_each(|attachment| {
                attachment.uri.clear();
                attachment.local_status = None;
            });
    }
    data.settings = remote_settings(&data.settings);
    data
}

fn remote_settings(settings: &Settings) -> Settings {
    let preferences = settings.sync_preferences.clone().unwrap_or_default();
    let mut remote = Settings {
        sync_preferences: Some(preferences.clone()),
        sync_preferences_updated_at: settings.sync_preferences_updated_at.clone(),
        ..Settings::default()
    };

    for group in SyncGroup::ALL {
        if !preferences.is_enabled(group) {
            continue;
        }
        match settings.group(group) {
            GroupValues::Ai(ai) => remote.set_group(GroupValues::Ai(ai.map(strip_ai_secrets))),
            values => remote.set_group(values),
        }
    }
    remote
}

fn strip_ai_secrets(mut ai: AiSettings) -> AiSettings {
    ai.api_key = None;
    if let Some(speech) = ai.speech_to_text.as_mut() {
        speech.offline_model_path = None;
    }
    ai
}

/// File attachments that still only exist on this device.
pub fn find_pending_attachment_uploads(data: &AppData) -> Vec<PendingAttachmentUpload> {
    let task_owned = data.tasks.iter().filter_map(|task| {
        task.attachments
            .as_deref()
            .map(|attachments| (OwnerType::Task, task.id.as_str(), attachments))
    });
    let project_owned = data.projects.iter().filter_map(|project| {
        project
            .attachments
            .as_deref()
            .map(|attachments| (OwnerType::Project, project.id.as_str(), attachments))
    });

    task_owned
        .chain(project_owned)
        .flat_map(|(owner_type, owner_id, attachments)| {
            attachments
                .iter()
                .filter(|attachment| is_pending_upload(attachment))
                .map(move |attachment| PendingAttachmentUpload {
                    owner_type,
                    owner_id: owner_id.to_string(),
                    attachment_id: attachment.id.clone(),
                    title: attachment.title.clone(),
                })
        })
        .collect()
}

fn is_pending_upload(attachment: &Attachment) -> bool {
    let uri = attachment.uri.trim();
    attachment.is_file()
        && !attachment.meta.is_deleted()
        && attachment.cloud_key.is_none()
        && attachment.local_status != Some(LocalStatus::Missing)
        && !uri.is_empty()
        && !uri.starts_with("http://")
        && !uri.starts_with("https://")
}

/// Refuse a remote write while file attachments are waiting for upload.
pub fn assert_no_pending_attachment_uploads(data: &AppData) -> Result<()> {
    let pending = find_pending_attachment_uploads(data);
    if pending.is_empty() {
        return Ok(());
    }

    let sample = pending
        .iter()
        .take(PENDING_SAMPLE_LIMIT)
        .map(|item| format!("{}:{}:{}", item.owner_type, item.owner_id, item.attachment_id))
        .collect::<Vec<_>>()
        .join(", ");
    let more = pending.len().saturating_sub(PENDING_SAMPLE_LIMIT);
    let suffix = if more > 0 {
        format!(", +{more} more")
    } else {
        String::new()
    };
    tracing::warn!(pending = pending.len(), "Remote write blocked by pending uploads");
    Err(Error::PendingUploads(format!(
        "{} file attachment(s) are still pending upload ({sample}{suffix}).",
        pending.len()
    )))
}

/// Compare two snapshots by content, ignoring JSON key order.
pub fn payloads_equal(left: &AppData, right: &AppData) -> Result<bool> {
    Ok(serde_json::to_value(left)? == serde_json::to_value(right)?)
}

//! Task model

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::attachment::Attachment;
use super::lenient;
use super::record::{Record, RecordMeta};

/// A task in the synchronized dataset.
///
/// Only the fields the sync core reasons about are typed; everything else
/// (status, due dates, checklists, recurrence, ...) rides along in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique identifier
    #[serde(default, deserialize_with = "lenient::string")]
    pub id: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::optional"
    )]
    pub title: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::optional"
    )]
    pub project_id: Option<String>,
    /// `None` means the task never had attachments; an empty list means it had
    /// some and all were removed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<Attachment>>,
    #[serde(flatten)]
    pub meta: RecordMeta,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Task {
    /// Create a task created and last updated at `at`.
    pub fn new(id: impl Into<String>, title: impl Into<String>, at: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: Some(title.into()),
            project_id: None,
            attachments: None,
            meta: RecordMeta::at(at),
            extra: Map::new(),
        }
    }

    /// Replace the sync metadata.
    #[must_use]
    pub fn with_meta(mut self, meta: RecordMeta) -> Self {
        self.meta = meta;
        self
    }

    #[must_use]
    pub fn with_attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = Some(attachments);
        self
    }
}

impl Record for Task {
    fn id(&self) -> &str {
        &self.id
    }

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut RecordMeta {
        &mut self.meta
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_new() {
        let task = Task::new("t1", "Write report", "2025-01-01T00:00:00Z");
        assert_eq!(task.id(), "t1");
        assert_eq!(task.title.as_deref(), Some("Write report"));
        assert_eq!(task.meta.created_at.as_deref(), Some("2025-01-01T00:00:00Z"));
        assert!(task.attachments.is_none());
        assert!(!task.is_deleted());
    }

    #[test]
    fn test_task_keeps_unmodelled_fields() {
        let raw = serde_json::json!({
            "id": "t1",
            "title": "Buy milk",
            "status": "next",
            "contexts": ["@errands"],
            "checklist": [{"id": "c1", "title": "2%", "isCompleted": false}],
            "createdAt": "2025-01-01T00:00:00Z",
            "updatedAt": "2025-01-02T00:00:00Z",
            "rev": 3,
            "revBy": "phone"
        });
        let task: Task = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(task.meta.rev, Some(3));
        assert_eq!(task.extra.get("status"), Some(&Value::String("next".into())));
        assert_eq!(serde_json::to_value(&task).unwrap(), raw);
    }
}

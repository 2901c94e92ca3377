//! The synchronization unit: a full dataset snapshot.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{Area, Project, Record, Section, Settings, Task};

/// A complete snapshot of one replica's dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppData {
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub sections: Vec<Section>,
    #[serde(default)]
    pub areas: Vec<Area>,
    #[serde(default)]
    pub settings: Settings,
    /// Top-level keys this crate does not interpret.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AppData {
    /// True when the snapshot holds no records (settings are not considered).
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
            && self.projects.is_empty()
            && self.sections.is_empty()
            && self.areas.is_empty()
    }

    /// Total number of records across all entity lists, tombstones included.
    pub fn record_count(&self) -> usize {
        self.tasks.len() + self.projects.len() + self.sections.len() + self.areas.len()
    }
}

/// Drop soft-deleted records, for display.
pub fn filter_deleted<T: Record>(items: &[T]) -> Vec<T> {
    items
        .iter()
        .filter(|item| !item.is_deleted())
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecordMeta;

    #[test]
    fn missing_lists_default_to_empty() {
        let data: AppData = serde_json::from_str(r#"{"tasks": []}"#).unwrap();
        assert!(data.is_empty());
        assert_eq!(data.settings, Settings::default());
    }

    #[test]
    fn filter_deleted_drops_tombstones() {
        let live = Task::new("t1", "live", "2025-01-01T00:00:00Z");
        let gone = Task::new("t2", "gone", "2025-01-01T00:00:00Z").with_meta(
            RecordMeta::at("2025-01-01T00:00:00Z").deleted("2025-01-02T00:00:00Z"),
        );
        let visible = filter_deleted(&[live.clone(), gone]);
        assert_eq!(visible, vec![live]);
    }
}

//! Section model

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::lenient;
use super::record::{Record, RecordMeta};

/// A named section inside a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    #[serde(default, deserialize_with = "lenient::string")]
    pub id: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::optional"
    )]
    pub project_id: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::optional"
    )]
    pub title: Option<String>,
    #[serde(flatten)]
    pub meta: RecordMeta,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Section {
    pub fn new(
        id: impl Into<String>,
        project_id: impl Into<String>,
        title: impl Into<String>,
        at: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            project_id: Some(project_id.into()),
            title: Some(title.into()),
            meta: RecordMeta::at(at),
            extra: Map::new(),
        }
    }
}

impl Record for Section {
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

//! Area model

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::lenient;
use super::record::{Record, RecordMeta};

/// A top-level area of responsibility, ordered in the sidebar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Area {
    #[serde(default, deserialize_with = "lenient::string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub name: String,
    /// Display position. Gaps are allowed; missing values are assigned on merge.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::optional"
    )]
    pub order: Option<i64>,
    #[serde(flatten)]
    pub meta: RecordMeta,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Area {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        order: Option<i64>,
        at: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            order,
            meta: RecordMeta::at(at),
            extra: Map::new(),
        }
    }
}

impl Record for Area {
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

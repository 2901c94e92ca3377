//! Attachment model

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::lenient;
use super::record::{Record, RecordMeta};
use crate::error::{Error, Result};

/// What an attachment points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AttachmentKind {
    /// A file stored on the device and optionally uploaded under `cloudKey`
    File,
    /// An external link
    Link,
    /// A kind written by a newer client; handled like a link and kept verbatim
    Other(String),
}

impl AttachmentKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::File => "file",
            Self::Link => "link",
            Self::Other(kind) => kind,
        }
    }
}

impl From<String> for AttachmentKind {
    fn from(kind: String) -> Self {
        match kind.as_str() {
            "file" => Self::File,
            "link" => Self::Link,
            _ => Self::Other(kind),
        }
    }
}

impl From<AttachmentKind> for String {
    fn from(kind: AttachmentKind) -> Self {
        match kind {
            AttachmentKind::Other(kind) => kind,
            known => known.as_str().to_string(),
        }
    }
}

/// Whether the file behind an attachment is present on this device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocalStatus {
    Available,
    Missing,
    Uploading,
    Downloading,
}

/// Attachment owned by a task or project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    /// Unique attachment identifier.
    #[serde(default, deserialize_with = "lenient::string")]
    pub id: String,
    pub kind: AttachmentKind,
    #[serde(default, deserialize_with = "lenient::string")]
    pub title: String,
    /// Device-local path for files, target URL for links.
    #[serde(default, deserialize_with = "lenient::string")]
    pub uri: String,
    /// Remote object key, set once uploaded.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::trimmed"
    )]
    pub cloud_key: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::trimmed"
    )]
    pub file_hash: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::optional"
    )]
    pub local_status: Option<LocalStatus>,
    #[serde(flatten)]
    pub meta: RecordMeta,
    /// Fields this crate does not interpret (mime type, size, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Attachment {
    /// Create a file attachment pointing at a device-local path.
    pub fn file(
        id: impl Into<String>,
        title: impl Into<String>,
        uri: impl Into<String>,
        at: impl Into<String>,
    ) -> Result<Self> {
        Self::build(AttachmentKind::File, id.into(), title.into(), uri.into(), at)
    }

    /// Create a link attachment.
    pub fn link(
        id: impl Into<String>,
        title: impl Into<String>,
        url: impl Into<String>,
        at: impl Into<String>,
    ) -> Result<Self> {
        Self::build(AttachmentKind::Link, id.into(), title.into(), url.into(), at)
    }

    fn build(
        kind: AttachmentKind,
        id: String,
        title: String,
        uri: String,
        at: impl Into<String>,
    ) -> Result<Self> {
        let id = id.trim().to_string();
        if id.is_empty() {
            return Err(Error::InvalidInput(
                "Attachment id cannot be empty".to_string(),
            ));
        }
        if kind == AttachmentKind::Link && uri.trim().is_empty() {
            return Err(Error::InvalidInput(
                "Link attachment uri cannot be empty".to_string(),
            ));
        }

        let local_status = (kind == AttachmentKind::File && !uri.trim().is_empty())
            .then_some(LocalStatus::Available);
        Ok(Self {
            id,
            kind,
            title: title.trim().to_string(),
            uri,
            cloud_key: None,
            file_hash: None,
            local_status,
            meta: RecordMeta::at(at),
            extra: Map::new(),
        })
    }

    pub const fn is_file(&self) -> bool {
        matches!(self.kind, AttachmentKind::File)
    }

    /// A file whose local copy can be opened on this device.
    pub fn has_available_uri(&self) -> bool {
        self.is_file()
            && self.local_status != Some(LocalStatus::Missing)
            && !self.uri.trim().is_empty()
    }
}

impl Record for Attachment {
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

    const AT: &str = "2025-01-01T00:00:00Z";

    #[test]
    fn test_file_attachment_new() {
        let attachment = Attachment::file("a1", " scan.pdf ", "/tmp/scan.pdf", AT).unwrap();
        assert_eq!(attachment.title, "scan.pdf");
        assert_eq!(attachment.local_status, Some(LocalStatus::Available));
        assert!(attachment.has_available_uri());
        assert!(!attachment.is_deleted());
    }

    #[test]
    fn test_attachment_validation() {
        assert!(Attachment::file(" ", "x", "/tmp/x", AT).is_err());
        assert!(Attachment::link("a1", "x", "  ", AT).is_err());
        assert!(Attachment::file("a1", "x", "", AT).is_ok());
    }

    #[test]
    fn missing_file_is_not_available() {
        let mut attachment = Attachment::file("a1", "x", "/tmp/x", AT).unwrap();
        attachment.local_status = Some(LocalStatus::Missing);
        assert!(!attachment.has_available_uri());

        let link = Attachment::link("a2", "docs", "https://example.com", AT).unwrap();
        assert!(!link.has_available_uri());
    }

    #[test]
    fn unknown_local_status_reads_as_unset_and_extra_fields_survive() {
        let attachment: Attachment = serde_json::from_str(
            r#"{"id": "a1", "kind": "file", "title": "x", "uri": "/x",
                "localStatus": "teleported", "mimeType": "image/png",
                "createdAt": "2025-01-01T00:00:00Z", "updatedAt": "2025-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(attachment.local_status, None);
        assert_eq!(
            attachment.extra.get("mimeType"),
            Some(&Value::String("image/png".to_string()))
        );
        let value = serde_json::to_value(&attachment).unwrap();
        assert_eq!(value["mimeType"], "image/png");
        assert!(value.get("localStatus").is_none());
    }

    #[test]
    fn unknown_kind_is_kept_and_handled_like_a_link() {
        let raw = serde_json::json!({
            "id": "a1", "kind": "image", "title": "photo", "uri": "https://cdn.example/p.png",
            "createdAt": AT, "updatedAt": AT
        });
        let attachment: Attachment = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(attachment.kind, AttachmentKind::Other("image".to_string()));
        assert_eq!(attachment.kind.as_str(), "image");
        assert!(!attachment.is_file());
        assert!(!attachment.has_available_uri());
        assert_eq!(serde_json::to_value(&attachment).unwrap(), raw);
    }
}

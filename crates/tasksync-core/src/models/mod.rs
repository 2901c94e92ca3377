//! Data models for tasksync

mod app_data;
mod area;
mod attachment;
pub(crate) mod lenient;
mod project;
mod record;
mod section;
mod settings;
mod task;

pub use app_data::{filter_deleted, AppData};
pub use area::Area;
pub use attachment::{Attachment, AttachmentKind, LocalStatus};
pub use project::Project;
pub use record::{Record, RecordMeta};
pub use section::Section;
pub use settings::{
    AiSettings, AppearanceGroup, AppearanceSettings, ExternalCalendar, GroupValues, LanguageGroup,
    Settings, SpeechToTextSettings, SyncGroup, SyncGroupTimestamps, SyncMarker, SyncPreferences,
};
pub use task::Task;

//! Application settings model
//!
//! Settings mix device-local fields (shortcuts, secrets, sync bookkeeping)
//! with fields that belong to a named sync group. Each group carries its own
//! last-modified marker in `syncPreferencesUpdatedAt`, so groups merge
//! independently of each other and of entity timestamps.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::lenient;
use crate::sync::{MergeStats, SyncHistoryEntry};

/// Settings groups that can be exchanged between replicas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SyncGroup {
    /// `theme`, `appearance.*`, `keybindingStyle`
    Appearance,
    /// `language`, `weekStart`, `dateFormat`
    Language,
    /// Calendar subscriptions
    ExternalCalendars,
    /// AI provider configuration, secrets excluded
    Ai,
}

impl SyncGroup {
    pub const ALL: [Self; 4] = [
        Self::Appearance,
        Self::Language,
        Self::ExternalCalendars,
        Self::Ai,
    ];

    /// Key used in `syncPreferences` and `syncPreferencesUpdatedAt`.
    pub const fn key(self) -> &'static str {
        match self {
            Self::Appearance => "appearance",
            Self::Language => "language",
            Self::ExternalCalendars => "externalCalendars",
            Self::Ai => "ai",
        }
    }
}

impl fmt::Display for SyncGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A last-modified marker slot: one per group plus the opt-in flags themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncMarker {
    Preferences,
    Group(SyncGroup),
}

impl SyncMarker {
    pub const ALL: [Self; 5] = [
        Self::Preferences,
        Self::Group(SyncGroup::Appearance),
        Self::Group(SyncGroup::Language),
        Self::Group(SyncGroup::ExternalCalendars),
        Self::Group(SyncGroup::Ai),
    ];
}

/// Which groups a replica wants to exchange at all.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncPreferences {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::optional"
    )]
    pub appearance: Option<bool>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::optional"
    )]
    pub language: Option<bool>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::optional"
    )]
    pub external_calendars: Option<bool>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::optional"
    )]
    pub ai: Option<bool>,
}

impl SyncPreferences {
    pub const fn get(&self, group: SyncGroup) -> Option<bool> {
        match group {
            SyncGroup::Appearance => self.appearance,
            SyncGroup::Language => self.language,
            SyncGroup::ExternalCalendars => self.external_calendars,
            SyncGroup::Ai => self.ai,
        }
    }

    pub fn set(&mut self, group: SyncGroup, enabled: Option<bool>) {
        match group {
            SyncGroup::Appearance => self.appearance = enabled,
            SyncGroup::Language => self.language = enabled,
            SyncGroup::ExternalCalendars => self.external_calendars = enabled,
            SyncGroup::Ai => self.ai = enabled,
        }
    }

    /// True only when the replica explicitly opted into the group.
    pub fn is_enabled(&self, group: SyncGroup) -> bool {
        self.get(group) == Some(true)
    }

    pub fn is_empty(&self) -> bool {
        SyncGroup::ALL.iter().all(|group| self.get(*group).is_none())
    }
}

/// Per-group last-modified markers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncGroupTimestamps {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::optional"
    )]
    pub preferences: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::optional"
    )]
    pub appearance: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::optional"
    )]
    pub language: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::optional"
    )]
    pub external_calendars: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::optional"
    )]
    pub ai: Option<String>,
}

impl SyncGroupTimestamps {
    pub fn get(&self, marker: SyncMarker) -> Option<&str> {
        match marker {
            SyncMarker::Preferences => self.preferences.as_deref(),
            SyncMarker::Group(SyncGroup::Appearance) => self.appearance.as_deref(),
            SyncMarker::Group(SyncGroup::Language) => self.language.as_deref(),
            SyncMarker::Group(SyncGroup::ExternalCalendars) => self.external_calendars.as_deref(),
            SyncMarker::Group(SyncGroup::Ai) => self.ai.as_deref(),
        }
    }

    pub fn set(&mut self, marker: SyncMarker, at: Option<String>) {
        match marker {
            SyncMarker::Preferences => self.preferences = at,
            SyncMarker::Group(SyncGroup::Appearance) => self.appearance = at,
            SyncMarker::Group(SyncGroup::Language) => self.language = at,
            SyncMarker::Group(SyncGroup::ExternalCalendars) => self.external_calendars = at,
            SyncMarker::Group(SyncGroup::Ai) => self.ai = at,
        }
    }

    pub fn is_empty(&self) -> bool {
        SyncMarker::ALL.iter().all(|marker| self.get(*marker).is_none())
    }
}

/// Nested appearance options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppearanceSettings {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::optional"
    )]
    pub density: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A calendar subscription (ICS feed).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalCalendar {
    #[serde(default, deserialize_with = "lenient::string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub url: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::optional"
    )]
    pub enabled: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Speech-to-text options nested under `ai`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechToTextSettings {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::optional"
    )]
    pub enabled: Option<bool>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::optional"
    )]
    pub provider: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::optional"
    )]
    pub model: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::optional"
    )]
    pub language: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::optional"
    )]
    pub mode: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::optional"
    )]
    pub field_strategy: Option<String>,
    /// Device-local model file path; never taken from another replica.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::optional"
    )]
    pub offline_model_path: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// AI provider configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiSettings {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::optional"
    )]
    pub enabled: Option<bool>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::optional"
    )]
    pub provider: Option<String>,
    /// Device-local secret; never taken from another replica.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::optional"
    )]
    pub api_key: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::optional"
    )]
    pub base_url: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::optional"
    )]
    pub model: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::optional"
    )]
    pub reasoning_effort: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::optional"
    )]
    pub thinking_budget: Option<f64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::optional"
    )]
    pub copilot_model: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::optional"
    )]
    pub speech_to_text: Option<SpeechToTextSettings>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Fields owned by the `appearance` group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppearanceGroup {
    pub theme: Option<String>,
    pub appearance: Option<AppearanceSettings>,
    pub keybinding_style: Option<String>,
}

/// Fields owned by the `language` group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LanguageGroup {
    pub language: Option<String>,
    pub week_start: Option<String>,
    pub date_format: Option<String>,
}

/// The values of one sync group, tagged by group.
#[derive(Debug, Clone, PartialEq)]
pub enum GroupValues {
    Appearance(AppearanceGroup),
    Language(LanguageGroup),
    ExternalCalendars(Option<Vec<ExternalCalendar>>),
    Ai(Option<AiSettings>),
}

impl GroupValues {
    pub const fn group(&self) -> SyncGroup {
        match self {
            Self::Appearance(_) => SyncGroup::Appearance,
            Self::Language(_) => SyncGroup::Language,
            Self::ExternalCalendars(_) => SyncGroup::ExternalCalendars,
            Self::Ai(_) => SyncGroup::Ai,
        }
    }
}

/// Settings snapshot carried in `AppData`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::optional"
    )]
    pub theme: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::optional"
    )]
    pub appearance: Option<AppearanceSettings>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::optional"
    )]
    pub keybinding_style: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::optional"
    )]
    pub language: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::optional"
    )]
    pub week_start: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::optional"
    )]
    pub date_format: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::filtered_list"
    )]
    pub external_calendars: Option<Vec<ExternalCalendar>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::optional"
    )]
    pub ai: Option<AiSettings>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::optional"
    )]
    pub sync_preferences: Option<SyncPreferences>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::optional"
    )]
    pub sync_preferences_updated_at: Option<SyncGroupTimestamps>,
    /// Desktop global shortcut; device-local, never part of a group.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::optional"
    )]
    pub global_quick_add_shortcut: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::optional"
    )]
    pub last_sync_at: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::optional"
    )]
    pub last_sync_status: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::optional"
    )]
    pub last_sync_error: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::optional"
    )]
    pub last_sync_stats: Option<MergeStats>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::filtered_list"
    )]
    pub last_sync_history: Option<Vec<SyncHistoryEntry>>,
    /// Everything else (GTD preferences, notifications, ...) stays device-local.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Settings {
    /// Marker recorded for `marker`, if any.
    pub fn marker(&self, marker: SyncMarker) -> Option<&str> {
        self.sync_preferences_updated_at
            .as_ref()
            .and_then(|timestamps| timestamps.get(marker))
    }

    /// Snapshot of the fields owned by `group`.
    pub fn group(&self, group: SyncGroup) -> GroupValues {
        match group {
            SyncGroup::Appearance => GroupValues::Appearance(AppearanceGroup {
                theme: self.theme.clone(),
                appearance: self.appearance.clone(),
                keybinding_style: self.keybinding_style.clone(),
            }),
            SyncGroup::Language => GroupValues::Language(LanguageGroup {
                language: self.language.clone(),
                week_start: self.week_start.clone(),
                date_format: self.date_format.clone(),
            }),
            SyncGroup::ExternalCalendars => {
                GroupValues::ExternalCalendars(self.external_calendars.clone())
            }
            SyncGroup::Ai => GroupValues::Ai(self.ai.clone()),
        }
    }

    /// Overwrite the fields owned by the group `values` belongs to.
    pub fn set_group(&mut self, values: GroupValues) {
        match values {
            GroupValues::Appearance(group) => {
                self.theme = group.theme;
                self.appearance = group.appearance;
                self.keybinding_style = group.keybinding_style;
            }
            GroupValues::Language(group) => {
                self.language = group.language;
                self.week_start = group.week_start;
                self.date_format = group.date_format;
            }
            GroupValues::ExternalCalendars(calendars) => self.external_calendars = calendars,
            GroupValues::Ai(ai) => self.ai = ai,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_default_is_empty_object() {
        let settings = Settings::default();
        assert_eq!(serde_json::to_value(&settings).unwrap(), serde_json::json!({}));
    }

    #[test]
    fn group_roundtrip_touches_only_group_fields() {
        let mut settings: Settings = serde_json::from_value(serde_json::json!({
            "theme": "dark",
            "language": "de",
            "weekStart": "monday",
            "notificationsEnabled": true
        }))
        .unwrap();

        let GroupValues::Language(mut language) = settings.group(SyncGroup::Language) else {
            panic!("expected language group");
        };
        language.language = Some("fr".to_string());
        settings.set_group(GroupValues::Language(language));

        assert_eq!(settings.language.as_deref(), Some("fr"));
        assert_eq!(settings.week_start.as_deref(), Some("monday"));
        assert_eq!(settings.theme.as_deref(), Some("dark"));
        assert_eq!(settings.extra.get("notificationsEnabled"), Some(&Value::Bool(true)));
    }

    #[test]
    fn markers_are_addressable_by_group() {
        let mut timestamps = SyncGroupTimestamps::default();
        assert!(timestamps.is_empty());
        timestamps.set(
            SyncMarker::Group(SyncGroup::ExternalCalendars),
            Some("2025-01-01T00:00:00Z".to_string()),
        );
        let value = serde_json::to_value(&timestamps).unwrap();
        assert_eq!(value["externalCalendars"], "2025-01-01T00:00:00Z");
        assert_eq!(
            timestamps.get(SyncMarker::Group(SyncGroup::ExternalCalendars)),
            Some("2025-01-01T00:00:00Z")
        );
    }

    #[test]
    fn mistyped_group_fields_read_as_absent() {
        let settings: Settings = serde_json::from_value(serde_json::json!({
            "theme": 7,
            "syncPreferences": {"appearance": "yes", "language": true},
            "ai": {"provider": "openai", "thinkingBudget": "lots"}
        }))
        .unwrap();
        assert_eq!(settings.theme, None);
        let prefs = settings.sync_preferences.unwrap();
        assert_eq!(prefs.appearance, None);
        assert!(prefs.is_enabled(SyncGroup::Language));
        let ai = settings.ai.unwrap();
        assert_eq!(ai.provider.as_deref(), Some("openai"));
        assert_eq!(ai.thinking_budget, None);
    }
}

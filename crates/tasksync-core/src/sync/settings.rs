//! Settings group merger
//!
//! Each sync group is resolved on its own last-modified marker. Fields outside
//! every group always come from the local side, and device-local secrets are
//! restored from local after the merge. The result is then checked against
//! the values this version understands; anything else falls back to local.

use std::collections::HashMap;

use serde_json::Map;

use crate::models::{
    AiSettings, AppearanceGroup, ExternalCalendar, GroupValues, LanguageGroup, Settings,
    SpeechToTextSettings, SyncGroup, SyncGroupTimestamps, SyncMarker, SyncPreferences,
};
use crate::util::{is_non_empty, is_valid_timestamp, parse_timestamp_ms};

const THEMES: &[&str] = &[
    "light",
    "dark",
    "system",
    "eink",
    "nord",
    "sepia",
    "material3-light",
    "material3-dark",
    "oled",
];
const LANGUAGES: &[&str] = &[
    "en", "zh", "es", "hi", "ar", "de", "ru", "ja", "fr", "pt", "pl", "ko", "it", "tr", "system",
];
const WEEK_STARTS: &[&str] = &["monday", "sunday"];
const KEYBINDING_STYLES: &[&str] = &["vim", "emacs"];
const DENSITIES: &[&str] = &["comfortable", "compact"];
const AI_PROVIDERS: &[&str] = &["gemini", "openai", "anthropic"];
const REASONING_EFFORTS: &[&str] = &["low", "medium", "high"];
const STT_PROVIDERS: &[&str] = &["openai", "gemini", "whisper"];
const STT_MODES: &[&str] = &["smart_parse", "transcribe_only"];
const STT_FIELD_STRATEGIES: &[&str] = &["smart", "title_only", "description_only"];

/// Merge `incoming` settings into `local` group by group.
pub fn merge_settings(local: &Settings, incoming: &Settings) -> Settings {
    let mut merged = local.clone();
    let mut markers = local.sync_preferences_updated_at.clone().unwrap_or_default();
    for marker in SyncMarker::ALL {
        if let Some(at) = incoming.marker(marker) {
            markers.set(marker, Some(at.to_string()));
        }
    }

    let incoming_wins = is_incoming_newer(
        local.marker(SyncMarker::Preferences),
        incoming.marker(SyncMarker::Preferences),
    );
    merged.sync_preferences = if incoming_wins {
        incoming.sync_preferences.clone()
    } else {
        local.sync_preferences.clone()
    };
    record_winner_marker(&mut markers, SyncMarker::Preferences, local, incoming, incoming_wins);

    for group in SyncGroup::ALL {
        let marker = SyncMarker::Group(group);
        let incoming_wins = is_incoming_newer(local.marker(marker), incoming.marker(marker));
        merged.set_group(resolve_group(
            local.group(group),
            incoming.group(group),
            incoming_wins,
        ));
        record_winner_marker(&mut markers, marker, local, incoming, incoming_wins);
    }

    if !markers.is_empty() {
        merged.sync_preferences_updated_at = Some(markers);
    }
    sanitize_merged_settings(merged, local)
}

/// An invalid incoming marker never wins; an invalid or absent local marker always loses.
pub fn is_incoming_newer(local_at: Option<&str>, incoming_at: Option<&str>) -> bool {
    let Some(incoming_ms) = incoming_at.and_then(parse_timestamp_ms) else {
        return false;
    };
    local_at
        .and_then(parse_timestamp_ms)
        .map_or(true, |local_ms| incoming_ms > local_ms)
}

fn record_winner_marker(
    markers: &mut SyncGroupTimestamps,
    marker: SyncMarker,
    local: &Settings,
    incoming: &Settings,
    incoming_wins: bool,
) {
    let winner_at = if incoming_wins {
        incoming.marker(marker)
    } else {
        local.marker(marker)
    };
    if let Some(at) = winner_at {
        markers.set(marker, Some(at.to_string()));
    }
}

fn resolve_group(local: GroupValues, incoming: GroupValues, incoming_wins: bool) -> GroupValues {
    match (local, incoming) {
        (GroupValues::Appearance(local), GroupValues::Appearance(incoming)) => {
            GroupValues::Appearance(AppearanceGroup {
                theme: choose_field(local.theme, incoming.theme, incoming_wins),
                appearance: choose_field(local.appearance, incoming.appearance, incoming_wins),
                keybinding_style: choose_field(
                    local.keybinding_style,
                    incoming.keybinding_style,
                    incoming_wins,
                ),
            })
        }
        (GroupValues::Language(local), GroupValues::Language(incoming)) => {
            GroupValues::Language(LanguageGroup {
                language: choose_field(local.language, incoming.language, incoming_wins),
                week_start: choose_field(local.week_start, incoming.week_start, incoming_wins),
                date_format: choose_field(local.date_format, incoming.date_format, incoming_wins),
            })
        }
        (GroupValues::ExternalCalendars(local), GroupValues::ExternalCalendars(incoming)) => {
            GroupValues::ExternalCalendars(if incoming_wins { incoming } else { local })
        }
        (GroupValues::Ai(local), GroupValues::Ai(incoming)) => {
            GroupValues::Ai(choose_field(local, incoming, incoming_wins))
        }
        (local, _) => local,
    }
}

/// A field defined on one side only is taken from that side; equal values and
/// true ties keep local.
fn choose_field<T: PartialEq>(local: Option<T>, incoming: Option<T>, incoming_wins: bool) -> Option<T> {
    match (local, incoming) {
        (local, None) => local,
        (None, incoming) => incoming,
        (Some(local), Some(incoming)) if local == incoming || !incoming_wins => Some(local),
        (Some(_), incoming) => incoming,
    }
}

/// `ai.apiKey` and `ai.speechToText.offlineModelPath` never come from another replica.
fn keep_local_secrets(ai: Option<AiSettings>, local: Option<&AiSettings>) -> Option<AiSettings> {
    let mut ai = ai?;
    ai.api_key = local.and_then(|local| local.api_key.clone());
    if let Some(speech) = ai.speech_to_text.as_mut() {
        speech.offline_model_path = local
            .and_then(|local| local.speech_to_text.as_ref())
            .and_then(|speech| speech.offline_model_path.clone());
    }
    Some(ai)
}

/// Replace values this version does not understand with the local ones.
pub fn sanitize_merged_settings(mut merged: Settings, local: &Settings) -> Settings {
    merged.theme = allowed_or(merged.theme, THEMES, local.theme.as_ref());
    merged.language = allowed_or(merged.language, LANGUAGES, local.language.as_ref());
    merged.week_start = allowed_or(merged.week_start, WEEK_STARTS, local.week_start.as_ref());
    merged.keybinding_style = allowed_or(
        merged.keybinding_style,
        KEYBINDING_STYLES,
        local.keybinding_style.as_ref(),
    );

    if let Some(appearance) = merged.appearance.as_mut() {
        let density_known = appearance
            .density
            .as_deref()
            .map_or(true, |density| DENSITIES.contains(&density));
        if !density_known {
            let local_appearance = local.appearance.clone().unwrap_or_default();
            let mut extra = local_appearance.extra;
            extra.append(&mut appearance.extra);
            appearance.extra = extra;
            appearance.density = local_appearance.density;
        }
    }

    merged.sync_preferences =
        sanitize_sync_preferences(merged.sync_preferences, local.sync_preferences.as_ref());
    merged.sync_preferences_updated_at = sanitize_markers(
        merged.sync_preferences_updated_at,
        local.sync_preferences_updated_at.as_ref(),
    );
    merged.external_calendars = sanitize_external_calendars(
        merged.external_calendars,
        local.external_calendars.as_ref(),
    );
    merged.ai = sanitize_ai(merged.ai, local.ai.as_ref());
    merged
}

fn allowed_or(value: Option<String>, allowed: &[&str], fallback: Option<&String>) -> Option<String> {
    match value {
        Some(value) if !allowed.contains(&value.as_str()) => fallback.cloned(),
        value => value,
    }
}

fn non_empty_or(value: Option<String>, fallback: Option<&String>) -> Option<String> {
    match value {
        Some(value) if !is_non_empty(&value) => fallback.cloned(),
        value => value,
    }
}

fn sanitize_sync_preferences(
    value: Option<SyncPreferences>,
    fallback: Option<&SyncPreferences>,
) -> Option<SyncPreferences> {
    value
        .filter(|preferences| !preferences.is_empty())
        .or_else(|| fallback.cloned())
}

fn sanitize_markers(
    value: Option<SyncGroupTimestamps>,
    fallback: Option<&SyncGroupTimestamps>,
) -> Option<SyncGroupTimestamps> {
    let Some(value) = value else {
        return fallback.cloned();
    };
    let mut next = SyncGroupTimestamps::default();
    for marker in SyncMarker::ALL {
        if let Some(at) = value.get(marker).filter(|at| is_valid_timestamp(at)) {
            next.set(marker, Some(at.to_string()));
        }
    }
    if next.is_empty() {
        fallback.cloned()
    } else {
        Some(next)
    }
}

/// Keep complete subscriptions, trimmed and deduplicated by id (last wins).
fn sanitize_external_calendars(
    value: Option<Vec<ExternalCalendar>>,
    fallback: Option<&Vec<ExternalCalendar>>,
) -> Option<Vec<ExternalCalendar>> {
    let Some(calendars) = value else {
        return fallback.cloned();
    };

    let mut order = Vec::new();
    let mut by_id = HashMap::new();
    for calendar in &calendars {
        let Some(enabled) = calendar.enabled else {
            continue;
        };
        if !(is_non_empty(&calendar.id) && is_non_empty(&calendar.name) && is_non_empty(&calendar.url))
        {
            continue;
        }
        let id = calendar.id.trim().to_string();
        let cleaned = ExternalCalendar {
            id: id.clone(),
            name: calendar.name.trim().to_string(),
            url: calendar.url.trim().to_string(),
            enabled: Some(enabled),
            extra: Map::new(),
        };
        if by_id.insert(id.clone(), cleaned).is_none() {
            order.push(id);
        }
    }

    if !calendars.is_empty() && by_id.is_empty() {
        if let Some(fallback) = fallback {
            return Some(fallback.clone());
        }
    }
    Some(
        order
            .into_iter()
            .filter_map(|id| by_id.remove(&id))
            .collect(),
    )
}

fn sanitize_ai(value: Option<AiSettings>, fallback: Option<&AiSettings>) -> Option<AiSettings> {
    let Some(mut ai) = value else {
        return keep_local_secrets(fallback.cloned(), fallback);
    };

    ai.provider = allowed_or(
        ai.provider,
        AI_PROVIDERS,
        fallback.and_then(|local| local.provider.as_ref()),
    );
    ai.base_url = non_empty_or(ai.base_url, fallback.and_then(|local| local.base_url.as_ref()));
    ai.model = non_empty_or(ai.model, fallback.and_then(|local| local.model.as_ref()));
    ai.reasoning_effort = allowed_or(
        ai.reasoning_effort,
        REASONING_EFFORTS,
        fallback.and_then(|local| local.reasoning_effort.as_ref()),
    );
    if ai
        .thinking_budget
        .is_some_and(|budget| !budget.is_finite() || budget < 0.0)
    {
        ai.thinking_budget = fallback.and_then(|local| local.thinking_budget);
    }
    ai.copilot_model = non_empty_or(
        ai.copilot_model,
        fallback.and_then(|local| local.copilot_model.as_ref()),
    );
    if let Some(speech) = ai.speech_to_text.take() {
        let speech_fallback = fallback.and_then(|local| local.speech_to_text.as_ref());
        ai.speech_to_text = Some(sanitize_speech_to_text(speech, speech_fallback));
    }

    keep_local_secrets(Some(ai), fallback)
}

fn sanitize_speech_to_text(
    mut speech: SpeechToTextSettings,
    fallback: Option<&SpeechToTextSettings>,
) -> SpeechToTextSettings {
    speech.provider = allowed_or(
        speech.provider,
        STT_PROVIDERS,
        fallback.and_then(|local| local.provider.as_ref()),
    );
    speech.model = non_empty_or(speech.model, fallback.and_then(|local| local.model.as_ref()));
    speech.language = non_empty_or(
        speech.language,
        fallback.and_then(|local| local.language.as_ref()),
    );
    speech.mode = allowed_or(
        speech.mode,
        STT_MODES,
        fallback.and_then(|local| local.mode.as_ref()),
    );
    speech.field_strategy = allowed_or(
        speech.field_strategy,
        STT_FIELD_STRATEGIES,
        fallback.and_then(|local| local.field_strategy.as_ref()),
    );
    speech
}

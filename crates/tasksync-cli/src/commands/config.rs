use serde::Serialize;
use tasksync_core::util::normalize_text_option;

use crate::cli::{BackendArg, ConfigCommands, CycleTypeArg};
use crate::config_profiles::{CliProfile, CliProfilesConfig};
use crate::error::CliError;

/// Fields `config init` may set; `None` keeps the stored value.
#[derive(Debug, Default)]
pub struct ProfileUpdate {
    pub local: Option<String>,
    pub remote: Option<String>,
    pub retention_days: Option<i64>,
    pub history_limit: Option<usize>,
    pub backend: Option<BackendArg>,
    pub cycle_type: Option<CycleTypeArg>,
}

#[derive(Debug, Serialize)]
struct ProfileView<'a> {
    name: &'a str,
    active: bool,
    #[serde(flatten)]
    profile: &'a CliProfile,
    effective_retention_days: i64,
}

pub fn run_config(command: ConfigCommands, global_profile: Option<&str>) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            profile,
            local,
            remote,
            retention_days,
            history_limit,
            backend,
            cycle_type,
            no_activate,
        } => run_config_init(
            profile.as_deref().or(global_profile),
            ProfileUpdate {
                local,
                remote,
                retention_days,
                history_limit,
                backend,
                cycle_type,
            },
            no_activate,
        ),
        ConfigCommands::Show { json } => run_config_show(global_profile, json),
    }
}

pub fn run_config_init(
    profile_name: Option<&str>,
    update: ProfileUpdate,
    no_activate: bool,
) -> Result<(), CliError> {
    let mut config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(profile_name);
    apply_profile_update(config.profile_mut_or_default(&profile_name), update)?;

    if !no_activate {
        config.active_profile = Some(profile_name.clone());
    }

    let path = config.save().map_err(CliError::Config)?;
    println!(
        "Profile '{}' initialized at {}",
        profile_name,
        path.display()
    );

    let profile = config
        .profile(&profile_name)
        .ok_or_else(|| CliError::Config("Failed to persist profile".to_string()))?;
    if profile.remote_path().is_none() {
        println!("Profile '{profile_name}' is missing: remote_path");
    }
    Ok(())
}

pub fn apply_profile_update(profile: &mut CliProfile, update: ProfileUpdate) -> Result<(), CliError> {
    if let Some(local) = normalize_text_option(update.local) {
        profile.local_path = Some(local);
    }
    if let Some(remote) = normalize_text_option(update.remote) {
        profile.remote_path = Some(remote);
    }

    let mut sync = profile.sync.clone();
    if update.retention_days.is_some() {
        sync.tombstone_retention_days = update.retention_days;
    }
    if let Some(limit) = update.history_limit {
        sync.history_limit = limit;
    }
    if let Some(backend) = update.backend {
        sync.backend = Some(backend.into());
    }
    if let Some(cycle_type) = update.cycle_type {
        sync.cycle_type = Some(cycle_type.into());
    }
    sync.validate()?;
    profile.sync = sync;
    Ok(())
}

fn run_config_show(global_profile: Option<&str>, as_json: bool) -> Result<(), CliError> {
    let config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let name = config.resolve_profile_name(global_profile);
    let profile = config.profile(&name).cloned().unwrap_or_default();
    let active = config.active_profile.as_deref() == Some(name.as_str());

    if as_json {
        let view = ProfileView {
            name: &name,
            active,
            profile: &profile,
            effective_retention_days: profile.sync.retention_days(),
        };
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    println!("profile         {name}{}", if active { " (active)" } else { "" });
    println!(
        "local           {}",
        profile.local_path.as_deref().unwrap_or("(default)")
    );
    println!(
        "remote          {}",
        profile.remote_path.as_deref().unwrap_or("(unset)")
    );
    println!("retention days  {}", profile.sync.retention_days());
    println!("history limit   {}", profile.sync.history_limit);
    if let Some(backend) = profile.sync.backend {
        println!("backend         {}", backend.as_str());
    }
    Ok(())
}

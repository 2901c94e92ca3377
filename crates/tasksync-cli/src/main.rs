//! tasksync CLI - Command-line front end for snapshot synchronization
//!
//! Runs sync cycles between JSON snapshot files and inspects their results.

mod cli;
mod commands;
mod config_profiles;
mod error;
mod snapshot_file;


use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::commands::completions::run_completions;
use crate::commands::config::run_config;
use crate::commands::history::run_history;
use crate::commands::merge::run_merge;
use crate::commands::purge::run_purge;
use crate::commands::sync::run_sync;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    if let Ok(directive) = "tasksync=info".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let profile = cli.profile.as_deref();

    match cli.command {
        Commands::Sync {
            local,
            remote,
            retention_days,
            json,
        } => run_sync(local, remote, retention_days, json, profile).await?,
        Commands::Merge {
            local,
            incoming,
            output,
            stats,
        } => run_merge(&local, &incoming, output.as_deref(), stats).await?,
        Commands::Purge {
            path,
            retention_days,
            write,
        } => run_purge(&path, retention_days, write).await?,
        Commands::History { local, limit, json } => {
            run_history(local, limit, json, profile).await?;
        }
        Commands::Config { command } => run_config(command, profile)?,
        Commands::Completions { shell, output } => {
            run_completions(shell, output.as_deref())?;
        }
    }

    Ok(())
}

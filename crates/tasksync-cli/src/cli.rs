use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tasksync_core::sync::{SyncBackend, SyncCycleType};

#[derive(Parser)]
#[command(name = "tasksync")]
#[command(about = "Synchronize task snapshots between a local and a remote replica")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// CLI profile name
    #[arg(long, global = true, value_name = "NAME")]
    pub profile: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one sync cycle between the local and remote snapshot files
    Sync {
        /// Local snapshot file
        #[arg(long, value_name = "PATH")]
        local: Option<PathBuf>,
        /// Remote snapshot file (absent file means first sync)
        #[arg(long, value_name = "PATH")]
        remote: Option<PathBuf>,
        /// Tombstone retention in days
        #[arg(long, value_name = "DAYS")]
        retention_days: Option<i64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Merge two snapshot files without writing either
    Merge {
        /// Local snapshot file
        local: PathBuf,
        /// Incoming snapshot file
        incoming: PathBuf,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
        /// Print merge statistics to stderr
        #[arg(long)]
        stats: bool,
    },
    /// Remove expired tombstones from a snapshot file
    Purge {
        /// Snapshot file
        path: PathBuf,
        /// Tombstone retention in days
        #[arg(long, value_name = "DAYS")]
        retention_days: Option<i64>,
        /// Persist the purged snapshot
        #[arg(long)]
        write: bool,
    },
    /// Show recorded sync history
    History {
        /// Local snapshot file
        #[arg(long, value_name = "PATH")]
        local: Option<PathBuf>,
        /// Number of entries to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Configure CLI profiles
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum BackendArg {
    File,
    Webdav,
    Cloud,
    Off,
}

impl From<BackendArg> for SyncBackend {
    fn from(value: BackendArg) -> Self {
        match value {
            BackendArg::File => Self::File,
            BackendArg::Webdav => Self::Webdav,
            BackendArg::Cloud => Self::Cloud,
            BackendArg::Off => Self::Off,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CycleTypeArg {
    Push,
    Pull,
    Merge,
}

impl From<CycleTypeArg> for SyncCycleType {
    fn from(value: CycleTypeArg) -> Self {
        match value {
            CycleTypeArg::Push => Self::Push,
            CycleTypeArg::Pull => Self::Pull,
            CycleTypeArg::Merge => Self::Merge,
        }
    }
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Initialize or update profile config
    Init {
        /// Profile name to initialize
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
        /// Local snapshot file
        #[arg(long, value_name = "PATH")]
        local: Option<String>,
        /// Remote snapshot file
        #[arg(long, value_name = "PATH")]
        remote: Option<String>,
        /// Tombstone retention in days
        #[arg(long, value_name = "DAYS")]
        retention_days: Option<i64>,
        /// Number of sync history entries to keep
        #[arg(long, value_name = "N")]
        history_limit: Option<usize>,
        /// Backend label recorded in sync history
        #[arg(long, value_enum)]
        backend: Option<BackendArg>,
        /// Cycle type recorded in sync history
        #[arg(long, value_enum)]
        cycle_type: Option<CycleTypeArg>,
        /// Keep current active profile instead of activating this one
        #[arg(long)]
        no_activate: bool,
    },
    /// Print the resolved profile
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod commands;
mod helpers;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{load_settings_with_options, LoadOptions};
use commands::{init, resources, settings, update};

#[derive(Parser)]
#[command(name = "ttsync")]
#[command(about = "Harvest, fingerprint and catalog published schedule files")]
#[command(version)]
pub struct Cli {
    /// Data directory or database file (overrides config file).
    #[arg(long, short = 'd', global = true, env = "TTSYNC_DATA")]
    data: Option<PathBuf>,

    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true, env = "TTSYNC_CONFIG")]
    config: Option<PathBuf>,

    /// Resolve relative paths from current working directory instead of config file location
    #[arg(long, global = true)]
    cwd: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the data directory and catalog database
    Init,

    /// Run one update pass
    Update {
        /// Read file descriptors from a JSON manifest instead of crawling the site
        #[arg(short, long)]
        manifest: Option<PathBuf>,
        /// Number of concurrent file workers (default: from config)
        #[arg(short, long)]
        workers: Option<usize>,
    },

    /// Run update passes periodically (interval from the time_update setting)
    Daemon {
        /// Read file descriptors from a JSON manifest instead of crawling the site
        #[arg(short, long)]
        manifest: Option<PathBuf>,
        /// Skip the pass normally run at startup
        #[arg(long)]
        no_initial: bool,
    },

    /// List catalogued resources
    Resources {
        /// Include deprecated resources
        #[arg(short, long)]
        all: bool,
    },

    /// Show the version history of a resource
    Versions {
        /// Resource ID
        id: i32,
    },

    /// Inspect or change catalog settings
    Settings {
        #[command(subcommand)]
        command: SettingsCommands,
    },
}

#[derive(Subcommand)]
enum SettingsCommands {
    /// List all stored settings
    List,
    /// Print one setting
    Get { key: String },
    /// Store a setting
    Set { key: String, value: String },
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let options = LoadOptions {
        config_path: cli.config,
        use_cwd: cli.cwd,
        data: cli.data,
    };
    let (settings, _config) = load_settings_with_options(options).await;

    match cli.command {
        Commands::Init => init::cmd_init(&settings).await,
        Commands::Update { manifest, workers } => {
            update::cmd_update(&settings, manifest.as_deref(), workers).await
        }
        Commands::Daemon {
            manifest,
            no_initial,
        } => update::cmd_daemon(&settings, manifest.as_deref(), !no_initial).await,
        Commands::Resources { all } => resources::cmd_resources(&settings, all).await,
        Commands::Versions { id } => resources::cmd_versions(&settings, id).await,
        Commands::Settings { command } => match command {
            SettingsCommands::List => settings::cmd_settings_list(&settings).await,
            SettingsCommands::Get { key } => settings::cmd_settings_get(&settings, &key).await,
            SettingsCommands::Set { key, value } => {
                settings::cmd_settings_set(&settings, &key, &value).await
            }
        },
    }
}

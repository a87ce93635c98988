//! FragVault CLI
//!
//! Command-line client for erasure-coded file storage.
//!
//! # Commands
//! - `upload` - Encode a file and store its fragments
//! - `download` - Reconstruct a stored file
//! - `profile` - Show what a redundancy profile resolves to
//! - `inspect` - Encode a file locally and print its fragment table
//!
//! # Configuration
//! Config file: ~/.fragvault/config.toml

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fragvault_client::FileStore;
use fragvault_core::ProfileId;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod symbols;

use commands::{download, upload};

#[derive(Parser)]
#[command(name = "fragvault")]
#[command(about = "FragVault erasure-coded storage CLI")]
#[command(version)]
struct Cli {
    /// Config file (defaults to ~/.fragvault/config.toml)
    #[arg(long, global = true, env = "FRAGVAULT_CONFIG")]
    config: Option<PathBuf>,

    /// Directory service URL (overrides config file)
    #[arg(long, global = true)]
    directory: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a file and push its fragments
    Upload {
        /// Path to the file
        path: PathBuf,

        /// File identifier (random if omitted)
        #[arg(long)]
        file_id: Option<String>,

        /// Version identifier
        #[arg(long)]
        version_id: Option<String>,

        /// Redundancy profile: LOW, MEDIUM or HIGH
        #[arg(short, long)]
        profile: Option<ProfileId>,
    },

    /// Reconstruct a stored file
    Download {
        /// File identifier
        file_id: String,

        /// Output path (defaults to the file id)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the parameters a profile resolves to
    Profile {
        /// Profile id: LOW, MEDIUM or HIGH
        id: ProfileId,
    },

    /// Encode a file locally and print its fragments
    Inspect {
        /// Path to the file
        path: PathBuf,

        /// Redundancy profile: LOW, MEDIUM or HIGH
        #[arg(short, long)]
        profile: Option<ProfileId>,
    },
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.json);

    let mut cfg = config::load_config(cli.config.as_deref())?;
    if let Some(url) = cli.directory {
        cfg.client.directory_url = url;
    }
    let default_profile = cfg.cli.default_profile;

    // Inspect never touches the network
    if let Commands::Inspect { path, profile } = &cli.command {
        return commands::inspect(path, profile.unwrap_or(default_profile)).await;
    }

    let store = FileStore::connect(&cfg.client).context("Invalid client configuration")?;

    match cli.command {
        Commands::Upload {
            path,
            file_id,
            version_id,
            profile,
        } => {
            let config = upload::UploadConfig {
                path,
                file_id,
                version_id,
                profile: profile.unwrap_or(default_profile),
            };
            commands::upload(&store, config).await?;
        }

        Commands::Download { file_id, output } => {
            let config = download::DownloadConfig { file_id, output };
            commands::download(&store, config).await?;
        }

        Commands::Profile { id } => {
            commands::profile(&store, id).await?;
        }

        Commands::Inspect { .. } => {}
    }

    Ok(())
}

//! Download Command
//!
//! Fetches a file's fragments and reconstructs it locally.

use super::{format_bytes, spinner};
use crate::symbols;
use anyhow::{Context, Result};
use console::style;
use fragvault_client::FileStore;
use std::path::PathBuf;

/// Download configuration
pub struct DownloadConfig {
    pub file_id: String,
    pub output: Option<PathBuf>,
}

/// Run download command
pub async fn run(store: &FileStore, config: DownloadConfig) -> Result<()> {
    let output = config
        .output
        .unwrap_or_else(|| PathBuf::from(&config.file_id));

    let pb = spinner(format!("Downloading {}", config.file_id));
    let result = store.download(&config.file_id).await;
    pb.finish_and_clear();

    let data = match result {
        Ok(data) => data,
        Err(e) if e.is_insufficient_fragments() => {
            println!(
                "{} {} cannot be reconstructed right now",
                style(symbols::CROSS).red(),
                config.file_id
            );
            return Err(e).context("Too many storage endpoints unavailable");
        }
        Err(e) => return Err(e).context("Download failed"),
    };

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&output, &data)
        .await
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!(
        "{} Downloaded {} ({}) to {}",
        style(symbols::CHECK).green(),
        config.file_id,
        format_bytes(data.len() as u64),
        output.display()
    );
    Ok(())
}

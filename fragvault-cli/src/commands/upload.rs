//! Upload Command
//!
//! Encodes a local file and pushes its fragments to the storage endpoints.

use super::{format_bytes, spinner};
use crate::symbols;
use anyhow::{Context, Result};
use bytes::Bytes;
use console::style;
use fragvault_client::{FileStore, UploadStatus};
use fragvault_core::ProfileId;
use std::path::PathBuf;

/// Upload configuration
pub struct UploadConfig {
    pub path: PathBuf,
    pub file_id: Option<String>,
    pub version_id: Option<String>,
    pub profile: ProfileId,
}

/// Run upload command
pub async fn run(store: &FileStore, config: UploadConfig) -> Result<()> {
    let data = tokio::fs::read(&config.path)
        .await
        .with_context(|| format!("Failed to read {}", config.path.display()))?;
    let file_id = config
        .file_id
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let pb = spinner(format!(
        "Uploading {} ({})",
        config.path.display(),
        format_bytes(data.len() as u64)
    ));
    let result = store
        .upload(
            &file_id,
            config.version_id.as_deref(),
            Bytes::from(data),
            config.profile,
        )
        .await;
    pb.finish_and_clear();
    let receipt = result.context("Upload failed")?;

    let marker = match receipt.status {
        UploadStatus::Complete => style(symbols::CHECK).green(),
        UploadStatus::Partial if receipt.recoverable => style(symbols::WARN).yellow(),
        _ => style(symbols::CROSS).red(),
    };
    println!(
        "{} {} {} ({}/{} fragments stored, profile {})",
        marker,
        style(&file_id).bold(),
        receipt.status,
        receipt.push.stored_count,
        receipt.push.total_count,
        receipt.profile
    );

    for outcome in receipt.push.outcomes.iter().filter(|o| !o.stored) {
        let endpoint = outcome
            .location
            .as_ref()
            .map(|l| l.endpoint.as_str())
            .unwrap_or("-");
        println!(
            "  {} fragment {:>3} {} {}",
            style(symbols::CROSS).red(),
            outcome.fragment_index,
            style(endpoint).dim(),
            outcome.error.as_deref().unwrap_or("")
        );
    }

    if !receipt.recoverable {
        anyhow::bail!(
            "only {} fragments stored, {} needed to recover the file",
            receipt.push.stored_count,
            receipt.profile.data_fragments()
        );
    }
    Ok(())
}

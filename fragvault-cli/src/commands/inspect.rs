//! Inspect Command
//!
//! Encodes a local file with a fallback profile and prints the fragment
//! table. Nothing is sent over the network.

use super::format_bytes;
use anyhow::{Context, Result};
use console::style;
use fragvault_core::{ProfileId, RedundancyProfile};
use std::path::Path;

/// Run inspect command
pub async fn run(path: &Path, id: ProfileId) -> Result<()> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let profile = RedundancyProfile::fallback(id);
    let encoder = profile.encoder()?;
    let fragments = encoder.encode(&data)?;

    println!(
        "{} {} with {} ({})",
        style("Encoded").bold(),
        path.display(),
        profile,
        format_bytes(data.len() as u64)
    );
    println!("  {}", profile.erasure.describe());
    println!();
    println!(
        "  {:>5}  {:<6}  {:>8}  {:>8}  {}",
        "INDEX", "KIND", "SIZE", "CONTENT", "HASH"
    );
    for fragment in &fragments {
        println!(
            "  {:>5}  {:<6}  {:>8}  {:>8}  {}",
            fragment.index,
            if fragment.is_parity { "parity" } else { "data" },
            fragment.size(),
            fragment.content_len,
            style(fragment.content_hash.to_hex()).dim()
        );
    }

    if !encoder.verify_fragments(&fragments)? {
        anyhow::bail!("fragment set failed verification");
    }
    Ok(())
}

//! Profile Command
//!
//! Shows the coding parameters a profile resolves to.

use anyhow::Result;
use console::style;
use fragvault_client::FileStore;
use fragvault_core::ProfileId;

/// Run profile command
pub async fn run(store: &FileStore, id: ProfileId) -> Result<()> {
    let resolved = store.profile(id).await?;
    let info = resolved.profile.erasure.describe();

    println!("{}", style(format!("Profile {}", id)).bold());
    println!("  data fragments (k):    {}", info.k);
    println!("  parity fragments (m):  {}", info.m);
    println!("  total fragments (n):   {}", info.n);
    println!("  tolerates losses:      {}", info.fault_tolerance);
    println!("  storage overhead:      {:.1}%", info.storage_overhead * 100.0);
    if let Some(bytes) = resolved.profile.fragment_byte_budget {
        println!("  fragment byte budget:  {}", bytes);
    }
    println!("  encoding:              {}", info.encoding_type);
    println!("  source:                {}", style(resolved.source).cyan());
    Ok(())
}

//! CLI configuration
//!
//! Config directory: ~/.fragvault/
//!
//! Config file format (~/.fragvault/config.toml):
//! ```toml
//! [client]
//! directory_url = "http://localhost:8000"
//! fragment_timeout_secs = 30
//!
//! [cli]
//! default_profile = "MEDIUM"
//! ```

use anyhow::{Context, Result};
use fragvault_client::ClientConfig;
use fragvault_core::ProfileId;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Structure of ~/.fragvault/config.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FragVaultConfig {
    #[serde(default)]
    pub client: ClientConfig,

    #[serde(default)]
    pub cli: CliSettings,
}

/// CLI-specific settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliSettings {
    /// Profile used when `--profile` is not given
    #[serde(default)]
    pub default_profile: ProfileId,
}

/// Get the config directory path (~/.fragvault/)
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".fragvault"))
}

/// Get the config file path (~/.fragvault/config.toml)
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// Load configuration
///
/// An explicit path must exist; the default path is optional. Environment
/// overrides are applied on top of whatever was loaded.
pub fn load_config(explicit: Option<&Path>) -> Result<FragVaultConfig> {
    let mut config = match explicit {
        Some(path) => read_config(path)?,
        None => match config_file_path() {
            Ok(path) if path.exists() => read_config(&path)?,
            _ => FragVaultConfig::default(),
        },
    };

    config.client = config.client.with_env_overrides();
    Ok(config)
}

fn read_config(path: &Path) -> Result<FragVaultConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_read_config_sections() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[client]\ndirectory_url = \"http://dir:8000\"\nmax_per_endpoint = 3\n\n[cli]\ndefault_profile = \"high\""
        )
        .unwrap();

        let config = read_config(file.path()).unwrap();
        assert_eq!(config.client.directory_url, "http://dir:8000");
        assert_eq!(config.client.max_per_endpoint, 3);
        assert_eq!(config.client.fragment_timeout_secs, 30);
        assert_eq!(config.cli.default_profile, ProfileId::High);
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let config = read_config(file.path()).unwrap();
        assert_eq!(config.cli.default_profile, ProfileId::Medium);
        assert!(config.client.validate().is_ok());
    }

    #[test]
    fn test_missing_explicit_path_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(&dir.path().join("nope.toml"))).is_err());
    }

    #[test]
    fn test_unknown_profile_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[cli]\ndefault_profile = \"ULTRA\"").unwrap();
        assert!(read_config(file.path()).is_err());
    }
}

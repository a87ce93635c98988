//! Client configuration
//!
//! Loaded from TOML, with environment overrides applied on top.

use fragvault_core::{CircuitBreakerConfig, FragVaultError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default directory service URL
pub const DEFAULT_DIRECTORY_URL: &str = "http://localhost:8000";

/// Configuration for directory and storage-endpoint access
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the directory service
    pub directory_url: String,

    /// Per-fragment push/pull timeout in seconds
    pub fragment_timeout_secs: u64,

    /// Directory request timeout in seconds
    pub directory_timeout_secs: u64,

    /// TCP connect timeout in seconds
    pub connect_timeout_secs: u64,

    /// Maximum fragment transfers in flight across all endpoints
    pub max_concurrent_transfers: usize,

    /// Maximum fragment transfers in flight against a single endpoint
    pub max_per_endpoint: usize,

    /// Check content hashes of retrieved fragments
    pub verify_hashes: bool,

    /// Inputs at least this large are encoded on the rayon pool
    pub parallel_encode_threshold: usize,

    /// Consecutive directory failures before the breaker opens
    pub breaker_failure_threshold: u32,

    /// Seconds the breaker stays open before probing again
    pub breaker_recovery_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            directory_url: DEFAULT_DIRECTORY_URL.to_string(),
            fragment_timeout_secs: 30,
            directory_timeout_secs: 10,
            connect_timeout_secs: 10,
            max_concurrent_transfers: 8,
            max_per_endpoint: 2,
            verify_hashes: true,
            parallel_encode_threshold: 1024 * 1024, // 1 MiB
            breaker_failure_threshold: 3,
            breaker_recovery_secs: 30,
        }
    }
}

impl ClientConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ClientConfig = toml::from_str(&content)
            .map_err(|e| FragVaultError::Serialization(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `FRAGVAULT_*` environment overrides
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup("FRAGVAULT_DIRECTORY_URL").or_else(|| lookup("MASTER_NODE_URL")) {
            self.directory_url = url;
        }
        if let Some(secs) = lookup("FRAGVAULT_FRAGMENT_TIMEOUT").and_then(|v| v.parse().ok()) {
            self.fragment_timeout_secs = secs;
        }
        if let Some(secs) = lookup("FRAGVAULT_DIRECTORY_TIMEOUT").and_then(|v| v.parse().ok()) {
            self.directory_timeout_secs = secs;
        }
        if let Some(n) = lookup("FRAGVAULT_MAX_CONCURRENT").and_then(|v| v.parse().ok()) {
            self.max_concurrent_transfers = n;
        }
        if let Some(n) = lookup("FRAGVAULT_MAX_PER_ENDPOINT").and_then(|v| v.parse().ok()) {
            self.max_per_endpoint = n;
        }
        self
    }

    /// Reject values that would stall or disable transfers
    pub fn validate(&self) -> Result<()> {
        if self.directory_url.trim().is_empty() {
            return Err(FragVaultError::Configuration(
                "directory_url must not be empty".to_string(),
            ));
        }
        for (name, value) in [
            ("fragment_timeout_secs", self.fragment_timeout_secs),
            ("directory_timeout_secs", self.directory_timeout_secs),
            ("connect_timeout_secs", self.connect_timeout_secs),
        ] {
            if value == 0 {
                return Err(FragVaultError::Configuration(format!(
                    "{} must be greater than 0",
                    name
                )));
            }
        }
        if self.max_concurrent_transfers == 0 || self.max_per_endpoint == 0 {
            return Err(FragVaultError::Configuration(
                "transfer concurrency limits must be greater than 0".to_string(),
            ));
        }
        if self.breaker_failure_threshold == 0 {
            return Err(FragVaultError::Configuration(
                "breaker_failure_threshold must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn fragment_timeout(&self) -> Duration {
        Duration::from_secs(self.fragment_timeout_secs)
    }

    pub fn directory_timeout(&self) -> Duration {
        Duration::from_secs(self.directory_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Circuit breaker settings for the directory service
    pub fn breaker_config(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: self.breaker_failure_threshold,
            recovery_timeout: Duration::from_secs(self.breaker_recovery_secs),
            name: "directory".to_string(),
        }
    }
}

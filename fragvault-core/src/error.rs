//! Error types for FragVault
//!
//! One error type covers the whole durability layer. Per-fragment transport
//! failures never surface here directly; the coordinators fold them into
//! "fragment unavailable" and only escalate aggregate conditions.

use thiserror::Error;

/// Result type alias for FragVault operations
pub type Result<T> = std::result::Result<T, FragVaultError>;

/// Unified error type for FragVault
#[derive(Error, Debug)]
pub enum FragVaultError {
    // ===== Configuration Errors =====
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Unknown redundancy profile: {0}")]
    UnknownProfile(String),

    // ===== Erasure Coding Errors =====
    #[error("Cannot encode empty input")]
    EmptyInput,

    #[error("Insufficient fragments: need {required}, got {available}")]
    InsufficientFragments { required: usize, available: usize },

    #[error("Fragment size mismatch: expected {expected}, got {actual}")]
    FragmentSizeMismatch { expected: usize, actual: usize },

    #[error("Invalid fragment index: {index} (total fragments: {total})")]
    InvalidFragmentIndex { index: usize, total: usize },

    #[error("Erasure coding error: {0}")]
    ErasureCoding(String),

    // ===== Integrity Errors =====
    #[error("Integrity error: {0}")]
    Integrity(String),

    // ===== Collaborator Errors =====
    #[error("Directory service error: {0}")]
    Directory(String),

    #[error("Network error: {0}")]
    Network(String),

    // ===== I/O Errors =====
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // ===== Generic Errors =====
    #[error("Internal error: {0}")]
    Internal(String),
}

impl FragVaultError {
    /// True for the expected failure mode under endpoint outages.
    ///
    /// Callers may retry these later; every other variant is either fatal
    /// configuration or a bug in the stored data.
    pub fn is_insufficient_fragments(&self) -> bool {
        matches!(self, FragVaultError::InsufficientFragments { .. })
    }

    /// True for errors that no retry can fix.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            FragVaultError::Configuration(_)
                | FragVaultError::UnknownProfile(_)
                | FragVaultError::EmptyInput
                | FragVaultError::InvalidFragmentIndex { .. }
        )
    }
}

impl From<reed_solomon_erasure::Error> for FragVaultError {
    fn from(err: reed_solomon_erasure::Error) -> Self {
        FragVaultError::ErasureCoding(err.to_string())
    }
}

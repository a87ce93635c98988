//! Transport error types
//!
//! Each collaborator gets its own error enum; coordinators convert them into
//! [`FragVaultError`] (or swallow them per fragment) at their boundary.

use fragvault_core::FragVaultError;
use std::time::Duration;
use thiserror::Error;

/// Storage endpoint errors
#[derive(Error, Debug)]
pub enum EndpointError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Fragment not found: {0}")]
    NotFound(String),

    #[error("Endpoint rejected fragment {fragment_id}: {message}")]
    Rejected { fragment_id: String, message: String },

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Endpoint unavailable: {0}")]
    Unavailable(String),
}

/// Directory service errors
#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Directory unavailable: {0}")]
    Unavailable(String),
}

impl From<EndpointError> for FragVaultError {
    fn from(err: EndpointError) -> Self {
        FragVaultError::Network(err.to_string())
    }
}

impl From<DirectoryError> for FragVaultError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::Malformed(msg) => FragVaultError::Serialization(msg),
            other => FragVaultError::Directory(other.to_string()),
        }
    }
}

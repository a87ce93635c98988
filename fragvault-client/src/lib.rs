//! FragVault Client
//!
//! Moves erasure-coded fragments between the caller, the directory service
//! and the storage endpoints:
//! - Profile resolution with a local fallback table
//! - Fragment push according to a directory placement plan
//! - Fragment pull with per-fragment timeouts, verification and reconstruction
//! - [`FileStore`] orchestration of the full write and read paths

pub mod config;
pub mod directory;
pub mod endpoint;
pub mod error;
pub mod limiter;
#[cfg(test)]
mod memory;
pub mod pull;
pub mod push;
pub mod resolver;
pub mod store;

pub use config::ClientConfig;
pub use directory::{
    DirectoryService, FileLayout, HttpDirectoryClient, PlacementPlan, PlacementRequest,
    ProfileDescriptor,
};
pub use endpoint::{HttpEndpointClient, StorageEndpoint};
pub use error::{DirectoryError, EndpointError};
pub use limiter::TransferLimiter;
pub use pull::{FragmentFailure, PullCoordinator, PullReport};
pub use push::{FragmentOutcome, PushCoordinator, PushResult, UploadStatus};
pub use resolver::{ProfileResolver, ProfileSource, ResolvedProfile};
pub use store::{FileStore, UploadReceipt};

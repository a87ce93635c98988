//! File store
//!
//! Ties resolution, encoding, placement and transfer together. Every download
//! flow (owner, shared link, user share) reads through [`FileStore::download`].

use crate::config::ClientConfig;
use crate::directory::{DirectoryService, FileLayout, HttpDirectoryClient, PlacementRequest};
use crate::endpoint::{HttpEndpointClient, StorageEndpoint};
use crate::limiter::TransferLimiter;
use crate::pull::PullCoordinator;
use crate::push::{PushCoordinator, PushResult, UploadStatus};
use crate::resolver::{ProfileResolver, ResolvedProfile};
use bytes::Bytes;
use fragvault_core::{EncodedFile, FragVaultError, ProfileId, RedundancyProfile, Result};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Outcome of an upload
#[derive(Debug, Clone)]
pub struct UploadReceipt {
    pub file: EncodedFile,
    pub profile: RedundancyProfile,
    pub push: PushResult,
    pub status: UploadStatus,
    /// At least `k` fragments were stored
    pub recoverable: bool,
}

/// Write and read orchestration over a directory and storage endpoints
pub struct FileStore {
    directory: Arc<dyn DirectoryService>,
    resolver: ProfileResolver,
    push: PushCoordinator,
    pull: PullCoordinator,
    parallel_encode_threshold: usize,
}

impl FileStore {
    /// Build a store over explicit collaborators
    pub fn new(
        directory: Arc<dyn DirectoryService>,
        endpoints: Arc<dyn StorageEndpoint>,
        config: &ClientConfig,
    ) -> Result<Self> {
        config.validate()?;

        let limiter = Arc::new(TransferLimiter::from_config(config));
        let resolver = ProfileResolver::new(
            directory.clone(),
            config.breaker_config(),
            config.directory_timeout(),
        );
        let push = PushCoordinator::new(
            endpoints.clone(),
            limiter.clone(),
            config.fragment_timeout(),
        );
        let pull = PullCoordinator::new(endpoints, limiter, config.fragment_timeout())
            .with_hash_verification(config.verify_hashes);

        Ok(Self {
            directory,
            resolver,
            push,
            pull,
            parallel_encode_threshold: config.parallel_encode_threshold,
        })
    }

    /// Build a store speaking HTTP to the configured directory
    pub fn connect(config: &ClientConfig) -> Result<Self> {
        let directory = HttpDirectoryClient::from_config(config)?;
        let endpoints = HttpEndpointClient::from_config(config)?;
        Self::new(Arc::new(directory), Arc::new(endpoints), config)
    }

    pub fn resolver(&self) -> &ProfileResolver {
        &self.resolver
    }

    /// Resolve a profile, reporting where the answer came from
    pub async fn profile(&self, id: ProfileId) -> Result<ResolvedProfile> {
        self.resolver.resolve_detailed(id).await
    }

    /// Encode `data`, obtain a placement plan and push every fragment
    ///
    /// Partial and failed pushes are reported in the receipt, not as errors.
    #[instrument(skip(self, data), fields(size = data.len()))]
    pub async fn upload(
        &self,
        file_id: &str,
        version_id: Option<&str>,
        data: Bytes,
        profile_id: ProfileId,
    ) -> Result<UploadReceipt> {
        if data.is_empty() {
            return Err(FragVaultError::EmptyInput);
        }

        let profile = self.resolver.resolve(profile_id).await?;
        let encoder = profile.encoder()?;

        let original_size = data.len() as u64;
        let fragments = if data.len() >= self.parallel_encode_threshold {
            tokio::task::spawn_blocking(move || encoder.encode_parallel(&data))
                .await
                .map_err(|e| FragVaultError::Internal(format!("encode task failed: {}", e)))??
        } else {
            encoder.encode(&data)?
        };

        let file = EncodedFile::new(
            file_id,
            version_id.map(str::to_string),
            &profile,
            original_size,
            &fragments,
        );
        info!(
            profile = %profile,
            fragments = file.fragment_count(),
            fragment_size = file.fragment_size,
            "Encoded file"
        );

        let plan = self
            .directory
            .plan_placement(&PlacementRequest::for_file(&file))
            .await?;
        if plan.len() < fragments.len() {
            warn!(
                assigned = plan.len(),
                fragments = fragments.len(),
                "Placement plan does not cover every fragment"
            );
        }

        let push = self.push.push(&fragments, &plan).await;
        let status = push.status();
        let recoverable = push.is_recoverable(profile.data_fragments());

        match status {
            UploadStatus::Complete => info!(file_id, "Upload complete"),
            UploadStatus::Partial if recoverable => {
                warn!(file_id, stored = push.stored_count, "Upload partially stored")
            }
            _ => error!(
                file_id,
                stored = push.stored_count,
                required = profile.data_fragments(),
                "Upload not recoverable"
            ),
        }

        Ok(UploadReceipt {
            file,
            profile,
            push,
            status,
            recoverable,
        })
    }

    /// Fetch a file's layout and rebuild its bytes
    #[instrument(skip(self))]
    pub async fn download(&self, file_id: &str) -> Result<Bytes> {
        let layout = self.layout(file_id).await?;
        let profile = self.decode_profile(&layout).await?;
        self.pull
            .pull_and_reconstruct(&layout.fragments, &profile, layout.original_size)
            .await
    }

    /// Coding parameters a stored file was encoded with
    ///
    /// Recorded `(k, m)` win. Older layouts without them are resolved against
    /// the directory only, never the fallback table.
    async fn decode_profile(&self, layout: &FileLayout) -> Result<RedundancyProfile> {
        let profile = match (layout.k, layout.m) {
            (Some(k), Some(m)) => RedundancyProfile::new(layout.profile_id, k, m).map_err(|e| {
                FragVaultError::Integrity(format!(
                    "layout for {} records invalid parameters: {}",
                    layout.file_id, e
                ))
            })?,
            (None, None) => self.resolver.resolve_from_directory(layout.profile_id).await?,
            _ => {
                return Err(FragVaultError::Integrity(format!(
                    "layout for {} records only one of k and m",
                    layout.file_id
                )))
            }
        };

        let n = profile.total_fragments();
        if let Some(index) = layout
            .fragments
            .iter()
            .map(|location| location.fragment_index)
            .find(|&index| index >= n)
        {
            return Err(FragVaultError::Integrity(format!(
                "layout for {} lists fragment {} but {} has only {} fragments",
                layout.file_id, index, profile, n
            )));
        }
        Ok(profile)
    }

    /// Fragment layout as recorded by the directory
    pub async fn layout(&self, file_id: &str) -> Result<FileLayout> {
        Ok(self.directory.get_file_layout(file_id).await?)
    }
}

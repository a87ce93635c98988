//! Fragment pull and reconstruction
//!
//! The single read path for stored files. Fetches every listed fragment
//! concurrently, drops anything unreachable, malformed or corrupted, then
//! decodes once at least `k` fragments survived.

use crate::endpoint::StorageEndpoint;
use crate::error::EndpointError;
use crate::limiter::TransferLimiter;
use bytes::Bytes;
use fragvault_core::{
    expected_content_len, fragment_size, FragVaultError, FragmentLocation, RedundancyProfile,
    Result,
};
use futures::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, error, info, instrument, warn};

/// Why a fragment did not contribute to reconstruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentFailure {
    pub fragment_index: usize,
    pub fragment_id: String,
    pub endpoint: String,
    pub reason: String,
}

/// What a pull saw
#[derive(Debug, Clone, Default)]
pub struct PullReport {
    /// Locations listed by the caller
    pub requested: usize,
    /// Distinct fragment indices retrieved and verified
    pub retrieved: usize,
    pub failures: Vec<FragmentFailure>,
    /// Locations with an index outside `0..n`
    pub invalid: usize,
    pub duration: Duration,
}

impl PullReport {
    pub fn summary(&self) -> String {
        format!(
            "{}/{} fragments retrieved, {} failed, {} invalid in {:?}",
            self.retrieved,
            self.requested,
            self.failures.len(),
            self.invalid,
            self.duration
        )
    }
}

/// Retrieves fragments and reconstructs the original bytes
pub struct PullCoordinator {
    endpoints: Arc<dyn StorageEndpoint>,
    limiter: Arc<TransferLimiter>,
    fragment_timeout: Duration,
    verify_hashes: bool,
}

impl PullCoordinator {
    pub fn new(
        endpoints: Arc<dyn StorageEndpoint>,
        limiter: Arc<TransferLimiter>,
        fragment_timeout: Duration,
    ) -> Self {
        Self {
            endpoints,
            limiter,
            fragment_timeout,
            verify_hashes: true,
        }
    }

    /// Enable or disable content-hash checks on retrieved fragments
    pub fn with_hash_verification(mut self, verify: bool) -> Self {
        self.verify_hashes = verify;
        self
    }

    /// Fetch fragments and return exactly `original_size` bytes
    pub async fn pull_and_reconstruct(
        &self,
        locations: &[FragmentLocation],
        profile: &RedundancyProfile,
        original_size: u64,
    ) -> Result<Bytes> {
        let (data, _) = self.pull_with_report(locations, profile, original_size).await?;
        Ok(data)
    }

    /// Same as [`pull_and_reconstruct`](Self::pull_and_reconstruct), also returning the report
    #[instrument(skip_all, fields(profile = %profile, original_size = original_size, locations = locations.len()))]
    pub async fn pull_with_report(
        &self,
        locations: &[FragmentLocation],
        profile: &RedundancyProfile,
        original_size: u64,
    ) -> Result<(Bytes, PullReport)> {
        let start = Instant::now();
        let original_size = usize::try_from(original_size).map_err(|_| {
            FragVaultError::Integrity(format!("original size {} exceeds address space", original_size))
        })?;
        if original_size == 0 {
            return Err(FragVaultError::Integrity(
                "recorded original size is zero".to_string(),
            ));
        }

        let k = profile.data_fragments();
        let n = profile.total_fragments();
        let expected_len = fragment_size(original_size, k);

        let mut report = PullReport {
            requested: locations.len(),
            ..Default::default()
        };

        // Stable sort keeps caller order among duplicates of one index
        let mut sorted: Vec<&FragmentLocation> = Vec::with_capacity(locations.len());
        for location in locations {
            if location.fragment_index >= n {
                warn!(
                    fragment_index = location.fragment_index,
                    total = n,
                    "Skipping location with out-of-range fragment index"
                );
                report.invalid += 1;
                continue;
            }
            sorted.push(location);
        }
        sorted.sort_by_key(|location| location.fragment_index);

        let results = join_all(
            sorted
                .iter()
                .map(|location| self.fetch_one(location, original_size, k, expected_len)),
        )
        .await;

        let mut slots: Vec<Option<Bytes>> = vec![None; n];
        for (location, result) in sorted.iter().zip(results) {
            match result {
                Ok(payload) => {
                    let slot = &mut slots[location.fragment_index];
                    if slot.is_none() {
                        *slot = Some(payload);
                    }
                }
                Err(reason) => report.failures.push(FragmentFailure {
                    fragment_index: location.fragment_index,
                    fragment_id: location.fragment_id.clone(),
                    endpoint: location.endpoint.clone(),
                    reason,
                }),
            }
        }

        let available: Vec<(usize, Bytes)> = slots
            .into_iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.map(|payload| (index, payload)))
            .collect();
        report.retrieved = available.len();
        report.duration = start.elapsed();

        if !profile.can_reconstruct(available.len()) {
            error!(
                required = k,
                available = available.len(),
                summary = %report.summary(),
                "Not enough fragments to reconstruct"
            );
            return Err(FragVaultError::InsufficientFragments {
                required: k,
                available: available.len(),
            });
        }

        let data = profile.encoder()?.reconstruct(&available, original_size)?;
        info!(summary = %report.summary(), "File reconstructed");
        Ok((data, report))
    }

    async fn fetch_one(
        &self,
        location: &FragmentLocation,
        original_size: usize,
        k: usize,
        expected_len: usize,
    ) -> std::result::Result<Bytes, String> {
        let _permit = self
            .limiter
            .acquire(&location.endpoint)
            .await
            .map_err(|e| e.to_string())?;

        let call = self
            .endpoints
            .get_fragment(&location.endpoint, &location.fragment_id);
        let payload = match timeout(self.fragment_timeout, call).await {
            Ok(Ok(payload)) => payload,
            Ok(Err(e)) => {
                warn!(
                    fragment_index = location.fragment_index,
                    endpoint = %location.endpoint,
                    error = %e,
                    "Fragment unavailable"
                );
                return Err(e.to_string());
            }
            Err(_) => {
                warn!(
                    fragment_index = location.fragment_index,
                    endpoint = %location.endpoint,
                    timeout = ?self.fragment_timeout,
                    "Fragment retrieval timed out"
                );
                return Err(EndpointError::Timeout(self.fragment_timeout).to_string());
            }
        };

        if payload.len() != expected_len {
            warn!(
                fragment_index = location.fragment_index,
                expected = expected_len,
                actual = payload.len(),
                "Fragment has unexpected length"
            );
            return Err(format!(
                "length {} does not match fragment size {}",
                payload.len(),
                expected_len
            ));
        }

        // Data fragments must be zero past their content; the hash does not cover padding
        let content_len = expected_content_len(location.fragment_index, original_size, k);
        if location.fragment_index < k && payload[content_len..].iter().any(|&b| b != 0) {
            warn!(
                fragment_index = location.fragment_index,
                endpoint = %location.endpoint,
                "Fragment padding is not zero"
            );
            return Err("nonzero padding".to_string());
        }

        if self.verify_hashes {
            if let Some(hash) = &location.content_hash {
                if !hash.verify(&payload[..content_len]) {
                    warn!(
                        fragment_index = location.fragment_index,
                        endpoint = %location.endpoint,
                        "Fragment content hash mismatch"
                    );
                    return Err("content hash mismatch".to_string());
                }
            }
        }

        debug!(
            fragment_index = location.fragment_index,
            endpoint = %location.endpoint,
            "Fragment retrieved"
        );
        Ok(payload)
    }
}

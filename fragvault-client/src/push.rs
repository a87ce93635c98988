//! Fragment push coordinator
//!
//! Sends each fragment to the endpoint named in the placement plan. Failures
//! are isolated per fragment; the aggregate result decides the upload status.

use crate::directory::PlacementPlan;
use crate::endpoint::StorageEndpoint;
use crate::error::EndpointError;
use crate::limiter::TransferLimiter;
use fragvault_core::{Fragment, FragmentLocation};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, error, info, instrument, warn};

/// Upload status derived from stored vs. total fragments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    /// Every fragment stored
    Complete,
    /// Some fragments stored
    Partial,
    /// Nothing stored
    Failed,
}

impl UploadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadStatus::Complete => "complete",
            UploadStatus::Partial => "partial",
            UploadStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of pushing a single fragment
#[derive(Debug, Clone)]
pub struct FragmentOutcome {
    pub fragment_index: usize,
    /// Assignment from the plan, if there was one
    pub location: Option<FragmentLocation>,
    pub stored: bool,
    pub error: Option<String>,
}

/// Aggregate push result
#[derive(Debug, Clone, Default)]
pub struct PushResult {
    pub stored_count: usize,
    pub total_count: usize,
    /// One entry per fragment, in fragment order
    pub outcomes: Vec<FragmentOutcome>,
    pub duration: Duration,
}

impl PushResult {
    pub fn status(&self) -> UploadStatus {
        if self.stored_count == 0 {
            UploadStatus::Failed
        } else if self.stored_count == self.total_count {
            UploadStatus::Complete
        } else {
            UploadStatus::Partial
        }
    }

    /// Whether the stored set still holds at least `k` fragments
    pub fn is_recoverable(&self, data_fragments: usize) -> bool {
        self.stored_count >= data_fragments
    }

    /// Locations of the fragments that were stored
    pub fn stored_locations(&self) -> Vec<FragmentLocation> {
        self.outcomes
            .iter()
            .filter(|o| o.stored)
            .filter_map(|o| o.location.clone())
            .collect()
    }

    /// Summary string
    pub fn summary(&self) -> String {
        format!(
            "{}/{} fragments stored in {:?} ({})",
            self.stored_count,
            self.total_count,
            self.duration,
            self.status()
        )
    }
}

/// Pushes encoded fragments to their assigned endpoints
pub struct PushCoordinator {
    endpoints: Arc<dyn StorageEndpoint>,
    limiter: Arc<TransferLimiter>,
    fragment_timeout: Duration,
}

impl PushCoordinator {
    pub fn new(
        endpoints: Arc<dyn StorageEndpoint>,
        limiter: Arc<TransferLimiter>,
        fragment_timeout: Duration,
    ) -> Self {
        Self {
            endpoints,
            limiter,
            fragment_timeout,
        }
    }

    /// Push every fragment according to `plan`
    ///
    /// Never fails as a whole; inspect [`PushResult::status`].
    #[instrument(skip_all, fields(fragments = fragments.len(), assigned = plan.len()))]
    pub async fn push(&self, fragments: &[Fragment], plan: &PlacementPlan) -> PushResult {
        let start = Instant::now();

        let outcomes = join_all(
            fragments
                .iter()
                .map(|fragment| self.push_one(fragment, plan.lookup(fragment.index))),
        )
        .await;

        let result = PushResult {
            stored_count: outcomes.iter().filter(|o| o.stored).count(),
            total_count: fragments.len(),
            outcomes,
            duration: start.elapsed(),
        };

        if result.status() == UploadStatus::Failed {
            error!(summary = %result.summary(), "No fragments stored");
        } else {
            info!(summary = %result.summary(), "Fragment push complete");
        }
        result
    }

    async fn push_one(
        &self,
        fragment: &Fragment,
        location: Option<&FragmentLocation>,
    ) -> FragmentOutcome {
        let Some(location) = location else {
            warn!(fragment_index = fragment.index, "No placement for fragment");
            return FragmentOutcome {
                fragment_index: fragment.index,
                location: None,
                stored: false,
                error: Some("no placement assigned".to_string()),
            };
        };

        let failed = |reason: String| FragmentOutcome {
            fragment_index: fragment.index,
            location: Some(location.clone()),
            stored: false,
            error: Some(reason),
        };

        let _permit = match self.limiter.acquire(&location.endpoint).await {
            Ok(permit) => permit,
            Err(e) => return failed(e.to_string()),
        };

        let call = self
            .endpoints
            .put_fragment(&location.endpoint, &location.fragment_id, fragment);
        match timeout(self.fragment_timeout, call).await {
            Ok(Ok(())) => {
                debug!(
                    fragment_index = fragment.index,
                    endpoint = %location.endpoint,
                    "Fragment stored"
                );
                FragmentOutcome {
                    fragment_index: fragment.index,
                    location: Some(location.clone()),
                    stored: true,
                    error: None,
                }
            }
            Ok(Err(e)) => {
                warn!(
                    fragment_index = fragment.index,
                    endpoint = %location.endpoint,
                    error = %e,
                    "Fragment push failed"
                );
                failed(e.to_string())
            }
            Err(_) => {
                warn!(
                    fragment_index = fragment.index,
                    endpoint = %location.endpoint,
                    timeout = ?self.fragment_timeout,
                    "Fragment push timed out"
                );
                failed(EndpointError::Timeout(self.fragment_timeout).to_string())
            }
        }
    }
}

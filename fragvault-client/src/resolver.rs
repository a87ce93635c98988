//! Profile resolution
//!
//! Asks the directory for a profile's `(k, m)` and falls back to the local
//! table on any connectivity or protocol failure. Write and read paths both
//! go through here, so a fallback on either side picks the same values.

use crate::directory::{DirectoryService, ProfileDescriptor};
use crate::error::DirectoryError;
use fragvault_core::{
    CircuitBreaker, CircuitBreakerConfig, FragVaultError, ProfileId, RedundancyProfile, Result,
};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Where a resolved profile came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileSource {
    Directory,
    Cache,
    Fallback,
}

impl fmt::Display for ProfileSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProfileSource::Directory => "directory",
            ProfileSource::Cache => "cache",
            ProfileSource::Fallback => "fallback",
        };
        f.write_str(s)
    }
}

/// A profile together with its provenance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedProfile {
    pub profile: RedundancyProfile,
    pub source: ProfileSource,
}

/// Resolves profile ids to coding parameters
pub struct ProfileResolver {
    directory: Arc<dyn DirectoryService>,
    breaker: CircuitBreaker,
    timeout: Duration,
    cache: RwLock<HashMap<ProfileId, RedundancyProfile>>,
}

impl ProfileResolver {
    pub fn new(
        directory: Arc<dyn DirectoryService>,
        breaker: CircuitBreakerConfig,
        timeout: Duration,
    ) -> Self {
        Self {
            directory,
            breaker: CircuitBreaker::new(breaker),
            timeout,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Resolve a profile id to `(k, m)`
    pub async fn resolve(&self, id: ProfileId) -> Result<RedundancyProfile> {
        Ok(self.resolve_detailed(id).await?.profile)
    }

    /// Parse and resolve a profile name; unknown names fail immediately
    pub async fn resolve_name(&self, name: &str) -> Result<RedundancyProfile> {
        let id: ProfileId = name.parse()?;
        self.resolve(id).await
    }

    /// Resolve and report where the answer came from
    #[instrument(skip(self), fields(profile = %id))]
    pub async fn resolve_detailed(&self, id: ProfileId) -> Result<ResolvedProfile> {
        let cached = self.cache.read().get(&id).copied();
        if let Some(profile) = cached {
            return Ok(ResolvedProfile {
                profile,
                source: ProfileSource::Cache,
            });
        }

        if !self.breaker.allow_request() {
            debug!("Directory circuit open, using fallback profile");
            return Ok(Self::fallback(id));
        }

        let descriptor = match self.query_directory(id).await {
            Ok(descriptor) => descriptor,
            Err(e) => {
                warn!(error = %e, "Directory profile lookup failed, using fallback");
                return Ok(Self::fallback(id));
            }
        };

        Ok(ResolvedProfile {
            profile: self.accept(id, descriptor)?,
            source: ProfileSource::Directory,
        })
    }

    /// Resolve using directory answers only
    ///
    /// Skips the breaker and the fallback table. Used on the read path when a
    /// layout carries no recorded `(k, m)`, where a guessed profile would
    /// decode under the wrong geometry.
    #[instrument(skip(self), fields(profile = %id))]
    pub async fn resolve_from_directory(&self, id: ProfileId) -> Result<RedundancyProfile> {
        let cached = self.cache.read().get(&id).copied();
        if let Some(profile) = cached {
            return Ok(profile);
        }
        let descriptor = self.query_directory(id).await?;
        self.accept(id, descriptor)
    }

    async fn query_directory(&self, id: ProfileId) -> std::result::Result<ProfileDescriptor, DirectoryError> {
        match tokio::time::timeout(self.timeout, self.directory.get_profile(id)).await {
            Ok(Ok(descriptor)) => {
                self.breaker.record_success();
                Ok(descriptor)
            }
            Ok(Err(e)) => {
                self.breaker.record_failure();
                Err(e)
            }
            Err(_) => {
                self.breaker.record_failure();
                Err(DirectoryError::Timeout(self.timeout))
            }
        }
    }

    /// Validate a directory answer and cache it
    fn accept(&self, id: ProfileId, descriptor: ProfileDescriptor) -> Result<RedundancyProfile> {
        if descriptor.k < 1 {
            return Err(FragVaultError::Configuration(format!(
                "directory returned k={} for profile {}",
                descriptor.k, id
            )));
        }
        let profile =
            RedundancyProfile::new(id, descriptor.k, descriptor.m)?.with_byte_budget(descriptor.bytes);

        if !profile.matches_fallback() {
            let canonical = RedundancyProfile::fallback(id);
            warn!(
                k = profile.data_fragments(),
                m = profile.parity_fragments(),
                fallback_k = canonical.data_fragments(),
                fallback_m = canonical.parity_fragments(),
                "Directory profile differs from fallback table"
            );
        }

        self.cache.write().insert(id, profile);
        Ok(profile)
    }

    /// Drop cached directory answers
    pub fn clear_cache(&self) {
        self.cache.write().clear();
    }

    fn fallback(id: ProfileId) -> ResolvedProfile {
        ResolvedProfile {
            profile: RedundancyProfile::fallback(id),
            source: ProfileSource::Fallback,
        }
    }
}

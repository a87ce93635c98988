//! Transfer concurrency limits
//!
//! A global cap on in-flight fragment transfers plus a per-endpoint cap, so
//! one upload or download never floods a single storage node.

use crate::config::ClientConfig;
use fragvault_core::{FragVaultError, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, RwLock, Semaphore};

/// Permit for one fragment transfer; released on drop
#[derive(Debug)]
pub struct TransferPermit {
    _endpoint: OwnedSemaphorePermit,
    _global: OwnedSemaphorePermit,
}

/// Shared limiter for push and pull
#[derive(Debug)]
pub struct TransferLimiter {
    global: Arc<Semaphore>,
    per_endpoint: RwLock<HashMap<String, Arc<Semaphore>>>,
    max_per_endpoint: usize,
}

impl TransferLimiter {
    pub fn new(max_concurrent: usize, max_per_endpoint: usize) -> Self {
        Self {
            global: Arc::new(Semaphore::new(max_concurrent)),
            per_endpoint: RwLock::new(HashMap::new()),
            max_per_endpoint,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.max_concurrent_transfers, config.max_per_endpoint)
    }

    /// Wait for a transfer slot against `endpoint`
    ///
    /// The endpoint permit is taken first so a busy endpoint never holds
    /// global slots while it waits.
    pub async fn acquire(&self, endpoint: &str) -> Result<TransferPermit> {
        let endpoint_sem = self.endpoint_semaphore(endpoint).await;
        let endpoint_permit = endpoint_sem
            .acquire_owned()
            .await
            .map_err(|e| FragVaultError::Internal(format!("endpoint limiter closed: {}", e)))?;
        let global_permit = self
            .global
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| FragVaultError::Internal(format!("transfer limiter closed: {}", e)))?;

        Ok(TransferPermit {
            _endpoint: endpoint_permit,
            _global: global_permit,
        })
    }

    /// Free global slots
    pub fn available(&self) -> usize {
        self.global.available_permits()
    }

    async fn endpoint_semaphore(&self, endpoint: &str) -> Arc<Semaphore> {
        let semaphores = self.per_endpoint.read().await;
        if let Some(sem) = semaphores.get(endpoint) {
            return sem.clone();
        }
        drop(semaphores);

        let mut semaphores = self.per_endpoint.write().await;
        semaphores
            .entry(endpoint.to_string())
            .or_insert_with(|| Arc::new(Semaphore::new(self.max_per_endpoint)))
            .clone()
    }
}

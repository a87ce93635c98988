//! In-process directory and storage endpoints for unit tests
//!
//! Both sides support fault injection so outage scenarios run without a
//! network.

use crate::directory::{
    DirectoryService, FileLayout, PlacementPlan, PlacementRequest, ProfileDescriptor,
};
use crate::endpoint::StorageEndpoint;
use crate::error::{DirectoryError, EndpointError};
use bytes::Bytes;
use fragvault_core::{Fragment, FragmentLocation, ProfileId, FALLBACK_PROFILES};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Directory that assigns fragments round-robin across a fixed endpoint list
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    profiles: RwLock<HashMap<ProfileId, ProfileDescriptor>>,
    layouts: RwLock<HashMap<String, FileLayout>>,
    endpoints: Vec<String>,
    unreachable: AtomicBool,
    profile_requests: AtomicUsize,
}

impl MemoryDirectory {
    /// Directory serving the canonical profile values
    pub fn new(endpoints: Vec<String>) -> Self {
        let profiles = FALLBACK_PROFILES
            .iter()
            .map(|&(id, k, m)| (id, ProfileDescriptor { k, m, bytes: None }))
            .collect();
        Self {
            profiles: RwLock::new(profiles),
            endpoints,
            ..Default::default()
        }
    }

    pub fn set_profile(&self, id: ProfileId, descriptor: ProfileDescriptor) {
        self.profiles.write().insert(id, descriptor);
    }

    /// Fail every call while set
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Number of profile lookups received, including failed ones
    pub fn profile_requests(&self) -> usize {
        self.profile_requests.load(Ordering::SeqCst)
    }

    pub fn insert_layout(&self, layout: FileLayout) {
        self.layouts.write().insert(layout.file_id.clone(), layout);
    }

    pub fn layout(&self, file_id: &str) -> Option<FileLayout> {
        self.layouts.read().get(file_id).cloned()
    }

    fn check_reachable(&self) -> Result<(), DirectoryError> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(DirectoryError::Unavailable("directory offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl DirectoryService for MemoryDirectory {
    async fn get_profile(&self, id: ProfileId) -> Result<ProfileDescriptor, DirectoryError> {
        self.profile_requests.fetch_add(1, Ordering::SeqCst);
        self.check_reachable()?;
        self.profiles
            .read()
            .get(&id)
            .copied()
            .ok_or_else(|| DirectoryError::NotFound(id.to_string()))
    }

    async fn plan_placement(
        &self,
        request: &PlacementRequest,
    ) -> Result<PlacementPlan, DirectoryError> {
        self.check_reachable()?;
        if self.endpoints.is_empty() {
            return Err(DirectoryError::Unavailable("no storage endpoints".to_string()));
        }

        let fragments: Vec<FragmentLocation> = request
            .fragments
            .iter()
            .map(|descriptor| {
                let endpoint = &self.endpoints[descriptor.index % self.endpoints.len()];
                FragmentLocation::new(descriptor.index, uuid::Uuid::new_v4().to_string(), endpoint.as_str())
                    .with_content_hash(descriptor.content_hash)
            })
            .collect();

        self.insert_layout(FileLayout {
            file_id: request.file_id.clone(),
            profile_id: request.profile_id,
            k: Some(request.k),
            m: Some(request.m),
            original_size: request.original_size,
            fragments: fragments.clone(),
        });

        Ok(PlacementPlan::new(fragments))
    }

    async fn get_file_layout(&self, file_id: &str) -> Result<FileLayout, DirectoryError> {
        self.check_reachable()?;
        self.layout(file_id)
            .ok_or_else(|| DirectoryError::NotFound(file_id.to_string()))
    }
}

/// Storage nodes keyed by endpoint URL
#[derive(Debug, Default)]
pub struct MemoryEndpoints {
    stores: RwLock<HashMap<String, HashMap<String, Bytes>>>,
    offline: RwLock<HashSet<String>>,
    hanging: RwLock<HashSet<String>>,
}

impl MemoryEndpoints {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every request to `endpoint`
    pub fn set_offline(&self, endpoint: &str) {
        self.offline.write().insert(endpoint.to_string());
    }

    /// Never answer requests to `endpoint`
    pub fn set_hanging(&self, endpoint: &str) {
        self.hanging.write().insert(endpoint.to_string());
    }

    /// Flip the first byte of a stored fragment
    pub fn corrupt(&self, endpoint: &str, fragment_id: &str) -> bool {
        let mut stores = self.stores.write();
        let Some(payload) = stores
            .get_mut(endpoint)
            .and_then(|store| store.get_mut(fragment_id))
        else {
            return false;
        };
        let mut bytes = payload.to_vec();
        if let Some(first) = bytes.first_mut() {
            *first ^= 0xFF;
        }
        *payload = Bytes::from(bytes);
        true
    }

    /// Store a payload directly, bypassing the write path
    pub fn insert(&self, endpoint: &str, fragment_id: &str, payload: Bytes) {
        self.stores
            .write()
            .entry(endpoint.to_string())
            .or_default()
            .insert(fragment_id.to_string(), payload);
    }

    /// Fragments held by `endpoint`
    pub fn fragment_count(&self, endpoint: &str) -> usize {
        self.stores.read().get(endpoint).map_or(0, HashMap::len)
    }

    async fn check(&self, endpoint: &str) -> Result<(), EndpointError> {
        let hanging = self.hanging.read().contains(endpoint);
        if hanging {
            std::future::pending::<()>().await;
        }
        if self.offline.read().contains(endpoint) {
            return Err(EndpointError::Unavailable(endpoint.to_string()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl StorageEndpoint for MemoryEndpoints {
    async fn put_fragment(
        &self,
        endpoint: &str,
        fragment_id: &str,
        fragment: &Fragment,
    ) -> Result<(), EndpointError> {
        self.check(endpoint).await?;
        self.insert(endpoint, fragment_id, fragment.payload.clone());
        Ok(())
    }

    async fn get_fragment(&self, endpoint: &str, fragment_id: &str) -> Result<Bytes, EndpointError> {
        self.check(endpoint).await?;
        self.stores
            .read()
            .get(endpoint)
            .and_then(|store| store.get(fragment_id))
            .cloned()
            .ok_or_else(|| EndpointError::NotFound(fragment_id.to_string()))
    }
}

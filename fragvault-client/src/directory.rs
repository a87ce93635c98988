//! Directory service client
//!
//! The directory owns profile definitions, fragment placement and the
//! per-file fragment layout. This module defines the wire records, the
//! [`DirectoryService`] seam, and its HTTP implementation.

use crate::config::ClientConfig;
use crate::error::DirectoryError;
use fragvault_core::{EncodedFile, FragmentDescriptor, FragmentLocation, ProfileId};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

/// Profile parameters as reported by the directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileDescriptor {
    pub k: usize,
    pub m: usize,
    /// Per-fragment byte budget (informational)
    #[serde(default, alias = "fragment_byte_budget")]
    pub bytes: Option<u64>,
}

/// Placement request for a freshly encoded file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementRequest {
    pub file_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_id: Option<String>,
    pub profile_id: ProfileId,
    /// Coding parameters used for this file; the directory stores them with the layout
    pub k: usize,
    pub m: usize,
    pub original_size: u64,
    pub fragment_count: usize,
    pub fragments: Vec<FragmentDescriptor>,
}

impl PlacementRequest {
    pub fn for_file(file: &EncodedFile) -> Self {
        Self {
            file_id: file.file_id.clone(),
            version_id: file.version_id.clone(),
            profile_id: file.profile_id,
            k: file.data_fragments,
            m: file.parity_fragments,
            original_size: file.original_size,
            fragment_count: file.fragment_count(),
            fragments: file.fragments.clone(),
        }
    }
}

/// Endpoint and fragment id assigned to each fragment index
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementPlan {
    pub fragments: Vec<FragmentLocation>,
}

impl PlacementPlan {
    pub fn new(fragments: Vec<FragmentLocation>) -> Self {
        Self { fragments }
    }

    /// Assignment for a fragment index (first entry wins)
    pub fn lookup(&self, fragment_index: usize) -> Option<&FragmentLocation> {
        self.fragments
            .iter()
            .find(|loc| loc.fragment_index == fragment_index)
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}

/// Where a stored file's fragments live, plus what is needed to decode it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileLayout {
    pub file_id: String,
    #[serde(alias = "erasure_id")]
    pub profile_id: ProfileId,
    /// `k` recorded at upload; absent in layouts written before it was stored
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub k: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub m: Option<usize>,
    #[serde(alias = "file_size")]
    pub original_size: u64,
    pub fragments: Vec<FragmentLocation>,
}

/// Directory service operations
#[async_trait::async_trait]
pub trait DirectoryService: Send + Sync {
    /// Coding parameters for a profile
    async fn get_profile(&self, id: ProfileId) -> Result<ProfileDescriptor, DirectoryError>;

    /// Assign endpoints and fragment ids for a new file
    async fn plan_placement(
        &self,
        request: &PlacementRequest,
    ) -> Result<PlacementPlan, DirectoryError>;

    /// Fragment locations for a stored file
    async fn get_file_layout(&self, file_id: &str) -> Result<FileLayout, DirectoryError>;
}

/// JSON-over-HTTP directory client
pub struct HttpDirectoryClient {
    client: Client,
    base_url: String,
}

impl HttpDirectoryClient {
    /// Create a client with request and connect timeouts
    pub fn new(
        base_url: &str,
        timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self, DirectoryError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, DirectoryError> {
        Self::new(
            &config.directory_url,
            config.directory_timeout(),
            config.connect_timeout(),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait::async_trait]
impl DirectoryService for HttpDirectoryClient {
    #[instrument(skip(self), fields(directory = %self.base_url))]
    async fn get_profile(&self, id: ProfileId) -> Result<ProfileDescriptor, DirectoryError> {
        let url = format!("{}/erasure-profiles/{}", self.base_url, id);
        let response = self.client.get(&url).send().await?;
        let profile: ProfileDescriptor = read_json(response, &url).await?;
        debug!(profile = %id, k = profile.k, m = profile.m, "Fetched profile");
        Ok(profile)
    }

    #[instrument(skip(self, request), fields(file_id = %request.file_id))]
    async fn plan_placement(
        &self,
        request: &PlacementRequest,
    ) -> Result<PlacementPlan, DirectoryError> {
        let url = format!("{}/file-fragments", self.base_url);
        let response = self.client.post(&url).json(request).send().await?;
        let plan: PlacementPlan = read_json(response, &url).await?;
        debug!(assigned = plan.len(), "Received placement plan");
        Ok(plan)
    }

    #[instrument(skip(self))]
    async fn get_file_layout(&self, file_id: &str) -> Result<FileLayout, DirectoryError> {
        let url = format!("{}/fragments/{}", self.base_url, file_id);
        let response = self.client.get(&url).send().await?;
        read_json(response, &url).await
    }
}

async fn read_json<T: DeserializeOwned>(response: Response, url: &str) -> Result<T, DirectoryError> {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(DirectoryError::NotFound(url.to_string()));
    }
    if !status.is_success() {
        return Err(DirectoryError::Api {
            status: status.as_u16(),
            message: response.text().await.unwrap_or_default(),
        });
    }

    let body = response.bytes().await?;
    serde_json::from_slice(&body).map_err(|e| DirectoryError::Malformed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_descriptor_wire() {
        let profile: ProfileDescriptor =
            serde_json::from_str(r#"{"k": 5, "m": 2, "bytes": 1048576}"#).unwrap();
        assert_eq!(profile.k, 5);
        assert_eq!(profile.bytes, Some(1_048_576));

        let profile: ProfileDescriptor = serde_json::from_str(r#"{"k": 4, "m": 3}"#).unwrap();
        assert_eq!(profile.bytes, None);
    }

    #[test]
    fn test_layout_accepts_legacy_names() {
        let json = r#"{
            "file_id": "f1",
            "erasure_id": "high",
            "file_size": 37,
            "fragments": [
                {"num_fragment": 1, "fragmentId": "a", "nodeEndpoint": "http://n1"},
                {"fragment_index": 0, "fragment_id": "b", "endpoint": "http://n2"}
            ]
        }"#;
        let layout: FileLayout = serde_json::from_str(json).unwrap();
        assert_eq!(layout.profile_id, ProfileId::High);
        assert_eq!((layout.k, layout.m), (None, None));
        assert_eq!(layout.original_size, 37);
        assert_eq!(layout.fragments[0].fragment_index, 1);
        assert_eq!(layout.fragments[1].endpoint, "http://n2");
    }

    #[test]
    fn test_layout_with_recorded_parameters() {
        let json = r#"{"file_id": "f2", "profile_id": "MEDIUM", "k": 8, "m": 4, "original_size": 9, "fragments": []}"#;
        let layout: FileLayout = serde_json::from_str(json).unwrap();
        assert_eq!((layout.k, layout.m), (Some(8), Some(4)));
    }

    #[test]
    fn test_plan_lookup_first_wins() {
        let plan = PlacementPlan::new(vec![
            FragmentLocation::new(2, "first", "http://a"),
            FragmentLocation::new(2, "second", "http://b"),
        ]);
        assert_eq!(plan.lookup(2).map(|l| l.fragment_id.as_str()), Some("first"));
        assert!(plan.lookup(0).is_none());
    }

    #[test]
    fn test_base_url_trimmed() {
        let client = HttpDirectoryClient::new(
            "http://localhost:8000/",
            Duration::from_secs(1),
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(client.base_url(), "http://localhost:8000");
    }
}

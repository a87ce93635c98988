//! Storage endpoint client
//!
//! Fragments travel as base64 inside JSON bodies. A single client talks to
//! every endpoint; reqwest pools connections per host.

use crate::config::ClientConfig;
use crate::error::EndpointError;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;
use fragvault_core::{ContentHash, Fragment};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

/// Body of a fragment write
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreFragmentRequest {
    #[serde(alias = "fragmentId")]
    pub fragment_id: String,
    /// Base64 payload
    pub data: String,
    #[serde(alias = "contentHash")]
    pub content_hash: ContentHash,
    #[serde(alias = "bytes")]
    pub size: usize,
}

impl StoreFragmentRequest {
    pub fn new(fragment_id: &str, fragment: &Fragment) -> Self {
        Self {
            fragment_id: fragment_id.to_string(),
            data: BASE64.encode(&fragment.payload),
            content_hash: fragment.content_hash,
            size: fragment.size(),
        }
    }
}

/// Reply to a fragment write
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreFragmentResponse {
    pub success: bool,
    #[serde(default, alias = "fragmentId")]
    pub fragment_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Reply to a fragment read
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetFragmentResponse {
    pub success: bool,
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Storage endpoint operations
///
/// `endpoint` is the base URL of the node holding the fragment.
#[async_trait::async_trait]
pub trait StorageEndpoint: Send + Sync {
    /// Store one fragment under the directory-assigned id
    async fn put_fragment(
        &self,
        endpoint: &str,
        fragment_id: &str,
        fragment: &Fragment,
    ) -> Result<(), EndpointError>;

    /// Fetch one fragment's payload
    async fn get_fragment(&self, endpoint: &str, fragment_id: &str) -> Result<Bytes, EndpointError>;
}

/// JSON-over-HTTP storage endpoint client
pub struct HttpEndpointClient {
    client: Client,
}

impl HttpEndpointClient {
    /// Create a client; per-fragment deadlines are enforced by the coordinators
    pub fn new(connect_timeout: Duration) -> Result<Self, EndpointError> {
        let client = Client::builder().connect_timeout(connect_timeout).build()?;
        Ok(Self { client })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, EndpointError> {
        Self::new(config.connect_timeout())
    }
}

fn fragment_url(endpoint: &str, fragment_id: Option<&str>) -> String {
    let base = endpoint.trim_end_matches('/');
    match fragment_id {
        Some(id) => format!("{}/fragments/{}", base, id),
        None => format!("{}/fragments", base),
    }
}

#[async_trait::async_trait]
impl StorageEndpoint for HttpEndpointClient {
    #[instrument(skip(self, fragment), fields(fragment_index = fragment.index, size = fragment.size()))]
    async fn put_fragment(
        &self,
        endpoint: &str,
        fragment_id: &str,
        fragment: &Fragment,
    ) -> Result<(), EndpointError> {
        let url = fragment_url(endpoint, None);
        let request = StoreFragmentRequest::new(fragment_id, fragment);

        let response = self.client.post(&url).json(&request).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(EndpointError::Api {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let body = response.bytes().await?;
        let reply: StoreFragmentResponse =
            serde_json::from_slice(&body).map_err(|e| EndpointError::Malformed(e.to_string()))?;
        if !reply.success {
            return Err(EndpointError::Rejected {
                fragment_id: fragment_id.to_string(),
                message: reply.message.unwrap_or_else(|| "success=false".to_string()),
            });
        }

        debug!("Fragment stored");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_fragment(&self, endpoint: &str, fragment_id: &str) -> Result<Bytes, EndpointError> {
        let url = fragment_url(endpoint, Some(fragment_id));

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(EndpointError::NotFound(fragment_id.to_string()));
        }
        if !status.is_success() {
            return Err(EndpointError::Api {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let body = response.bytes().await?;
        let reply: GetFragmentResponse =
            serde_json::from_slice(&body).map_err(|e| EndpointError::Malformed(e.to_string()))?;
        if !reply.success {
            return Err(EndpointError::NotFound(fragment_id.to_string()));
        }

        let encoded = reply
            .data
            .ok_or_else(|| EndpointError::Malformed("missing data field".to_string()))?;
        let payload = BASE64
            .decode(encoded.as_bytes())
            .map_err(|e| EndpointError::Malformed(format!("invalid base64: {}", e)))?;

        Ok(Bytes::from(payload))
    }
}

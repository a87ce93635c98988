//! Fragment data model
//!
//! - [`Fragment`]: one encoded piece, produced by the erasure engine
//! - [`FragmentDescriptor`]: the metadata of a fragment sent to the directory
//! - [`FragmentLocation`]: where a stored fragment lives (directory-supplied)
//! - [`EncodedFile`]: the immutable record needed to decode a file later

use crate::hash::ContentHash;
use crate::profile::{ProfileId, RedundancyProfile};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single erasure-coded fragment
#[derive(Debug, Clone)]
pub struct Fragment {
    /// Position in `0..n`; `0..k` are data, `k..n` parity
    pub index: usize,
    /// Payload, padded to the fragment size of its encode operation
    pub payload: Bytes,
    /// Hash of `payload[..content_len]`
    pub content_hash: ContentHash,
    /// Unpadded length covered by the hash
    pub content_len: usize,
    /// Whether this is a parity fragment
    pub is_parity: bool,
}

impl Fragment {
    /// Create a fragment, hashing its unpadded prefix
    pub fn new(index: usize, payload: Bytes, content_len: usize, is_parity: bool) -> Self {
        let content_hash = ContentHash::compute(&payload[..content_len]);
        Self {
            index,
            payload,
            content_hash,
            content_len,
            is_parity,
        }
    }

    /// Transmitted size (includes padding)
    pub fn size(&self) -> usize {
        self.payload.len()
    }

    /// Check the payload still matches its content hash and, for data
    /// fragments, that the padding is zero
    pub fn verify(&self) -> bool {
        if self.content_len > self.payload.len() {
            return false;
        }
        let (content, padding) = self.payload.split_at(self.content_len);
        self.content_hash.verify(content) && (self.is_parity || padding.iter().all(|&b| b == 0))
    }

    /// Metadata-only view for placement requests
    pub fn descriptor(&self) -> FragmentDescriptor {
        FragmentDescriptor {
            index: self.index,
            size: self.size(),
            content_hash: self.content_hash,
        }
    }
}

/// Fragment metadata without the payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FragmentDescriptor {
    #[serde(alias = "num_fragment")]
    pub index: usize,
    #[serde(alias = "bytes")]
    pub size: usize,
    pub content_hash: ContentHash,
}

/// Where a stored fragment can be fetched from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FragmentLocation {
    #[serde(alias = "num_fragment")]
    pub fragment_index: usize,
    #[serde(alias = "fragmentId")]
    pub fragment_id: String,
    /// Base URL of the storage endpoint
    #[serde(alias = "api_endpoint", alias = "nodeEndpoint")]
    pub endpoint: String,
    /// Hash recorded at upload time, if the directory keeps it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<ContentHash>,
}

impl FragmentLocation {
    pub fn new(fragment_index: usize, fragment_id: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            fragment_index,
            fragment_id: fragment_id.into(),
            endpoint: endpoint.into(),
            content_hash: None,
        }
    }

    pub fn with_content_hash(mut self, hash: ContentHash) -> Self {
        self.content_hash = Some(hash);
        self
    }
}

/// Everything needed to decode a file after upload
///
/// Created once per upload and never mutated; a re-upload is a new record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodedFile {
    pub file_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_id: Option<String>,
    pub profile_id: ProfileId,
    /// `k` the file was encoded with
    pub data_fragments: usize,
    /// `m` the file was encoded with
    pub parity_fragments: usize,
    /// Exact pre-encoding length; decode output is fragment-aligned
    pub original_size: u64,
    /// Padded fragment size `F`
    pub fragment_size: usize,
    pub fragments: Vec<FragmentDescriptor>,
    pub created_at: DateTime<Utc>,
}

impl EncodedFile {
    pub fn new(
        file_id: impl Into<String>,
        version_id: Option<String>,
        profile: &RedundancyProfile,
        original_size: u64,
        fragments: &[Fragment],
    ) -> Self {
        Self {
            file_id: file_id.into(),
            version_id,
            profile_id: profile.id,
            data_fragments: profile.data_fragments(),
            parity_fragments: profile.parity_fragments(),
            original_size,
            fragment_size: fragments.first().map(Fragment::size).unwrap_or(0),
            fragments: fragments.iter().map(Fragment::descriptor).collect(),
            created_at: Utc::now(),
        }
    }

    /// Total fragments produced at upload
    pub fn fragment_count(&self) -> usize {
        self.fragments.len()
    }
}

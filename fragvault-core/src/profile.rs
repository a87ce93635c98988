//! Redundancy profiles
//!
//! A profile names a `(k, m)` trade-off between storage overhead and fault
//! tolerance. The set of profile ids is closed; anything else is rejected at
//! parse time rather than mapped to a default.

use crate::erasure::{ErasureConfig, ErasureEncoder};
use crate::error::{FragVaultError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Redundancy tier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProfileId {
    Low,
    #[default]
    Medium,
    High,
}

impl ProfileId {
    pub const ALL: [ProfileId; 3] = [ProfileId::Low, ProfileId::Medium, ProfileId::High];

    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileId::Low => "LOW",
            ProfileId::Medium => "MEDIUM",
            ProfileId::High => "HIGH",
        }
    }
}

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProfileId {
    type Err = FragVaultError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LOW" => Ok(ProfileId::Low),
            "MEDIUM" => Ok(ProfileId::Medium),
            "HIGH" => Ok(ProfileId::High),
            _ => Err(FragVaultError::UnknownProfile(s.to_string())),
        }
    }
}

impl Serialize for ProfileId {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ProfileId {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Local profile table used whenever the directory service is unreachable.
///
/// Write and read paths both fall back to this table; changing an entry
/// makes files encoded under the old value undecodable on fallback.
pub const FALLBACK_PROFILES: [(ProfileId, usize, usize); 3] = [
    (ProfileId::Low, 6, 1),
    (ProfileId::Medium, 5, 2),
    (ProfileId::High, 4, 3),
];

/// A resolved profile: id plus coding parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedundancyProfile {
    pub id: ProfileId,
    #[serde(flatten)]
    pub erasure: ErasureConfig,
    /// Per-fragment byte budget reported by the directory (informational)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fragment_byte_budget: Option<u64>,
}

impl RedundancyProfile {
    /// Build a profile from directory-supplied values
    pub fn new(id: ProfileId, data_fragments: usize, parity_fragments: usize) -> Result<Self> {
        Ok(Self {
            id,
            erasure: ErasureConfig::new(data_fragments, parity_fragments)?,
            fragment_byte_budget: None,
        })
    }

    /// Canonical values from [`FALLBACK_PROFILES`]
    pub fn fallback(id: ProfileId) -> Self {
        let (data_fragments, parity_fragments) = fallback_values(id);
        Self {
            id,
            erasure: ErasureConfig {
                data_fragments,
                parity_fragments,
            },
            fragment_byte_budget: None,
        }
    }

    pub fn with_byte_budget(mut self, bytes: Option<u64>) -> Self {
        self.fragment_byte_budget = bytes;
        self
    }

    /// k
    pub fn data_fragments(&self) -> usize {
        self.erasure.data_fragments
    }

    /// m
    pub fn parity_fragments(&self) -> usize {
        self.erasure.parity_fragments
    }

    /// n = k + m
    pub fn total_fragments(&self) -> usize {
        self.erasure.total_fragments()
    }

    pub fn can_reconstruct(&self, available: usize) -> bool {
        self.erasure.can_reconstruct(available)
    }

    /// Whether (k, m) agree with the local fallback table
    pub fn matches_fallback(&self) -> bool {
        fallback_values(self.id) == (self.data_fragments(), self.parity_fragments())
    }

    /// Build an encoder for this profile
    pub fn encoder(&self) -> Result<ErasureEncoder> {
        ErasureEncoder::with_config(self.erasure)
    }
}

impl fmt::Display for RedundancyProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (k={}, m={})",
            self.id,
            self.data_fragments(),
            self.parity_fragments()
        )
    }
}

fn fallback_values(id: ProfileId) -> (usize, usize) {
    FALLBACK_PROFILES
        .iter()
        .find(|(pid, _, _)| *pid == id)
        .map(|(_, k, m)| (*k, *m))
        // every ProfileId variant has a table row
        .unwrap_or((5, 2))
}

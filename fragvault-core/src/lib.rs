//! FragVault Core Library
//!
//! Data-durability primitives for the FragVault file-sharing service.
//! This crate provides:
//! - Reed-Solomon erasure coding over GF(256) with any-k-of-n recovery
//! - Redundancy profiles and the local fallback profile table
//! - Fragment, fragment-location and encoded-file records
//! - Blake3 content hashing
//! - Common error handling
//!
//! Nothing here performs I/O; transport lives in `fragvault-client`.

pub mod circuit_breaker;
pub mod erasure;
pub mod error;
pub mod fragment;
pub mod hash;
pub mod profile;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use erasure::{
    data_fragment_lengths, expected_content_len, fragment_size, ErasureConfig, ErasureEncoder,
    ErasureInfo,
};
pub use error::{FragVaultError, Result};
pub use fragment::{EncodedFile, Fragment, FragmentDescriptor, FragmentLocation};
pub use hash::ContentHash;
pub use profile::{ProfileId, RedundancyProfile, FALLBACK_PROFILES};

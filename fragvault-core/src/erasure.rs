//! Reed-Solomon Erasure Coding
//!
//! Systematic (k, m) coding over GF(256):
//! - k data fragments carry the input, split as evenly as possible
//! - m parity fragments are computed from the zero-padded data fragments
//! - any k of the n = k + m fragments recover the data fragments exactly
//!
//! The split is fixed: with `base = len / k` and `rem = len % k`, the first
//! `rem` data fragments hold `base + 1` bytes and the rest hold `base`.
//! Every data fragment is then right-padded with zeros to `F = ceil(len / k)`.
//! Padding therefore sits at the tail of each short fragment, not only at the
//! end of the stream; [`ErasureEncoder::reconstruct`] strips it using the
//! recorded original size.

use crate::error::{FragVaultError, Result};
use crate::fragment::Fragment;
use bytes::Bytes;
use rayon::prelude::*;
use reed_solomon_erasure::galois_8::ReedSolomon;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Upper bound on k + m for an 8-bit Galois field
pub const MAX_TOTAL_FRAGMENTS: usize = 256;

/// Erasure coding configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ErasureConfig {
    /// Number of data fragments (k)
    pub data_fragments: usize,
    /// Number of parity fragments (m)
    pub parity_fragments: usize,
}

impl ErasureConfig {
    /// Create a new erasure config
    pub fn new(data_fragments: usize, parity_fragments: usize) -> Result<Self> {
        let config = Self {
            data_fragments,
            parity_fragments,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the GF(256) constraints
    pub fn validate(&self) -> Result<()> {
        if self.data_fragments == 0 {
            return Err(FragVaultError::Configuration(
                "data_fragments (k) must be >= 1".to_string(),
            ));
        }
        if self.total_fragments() > MAX_TOTAL_FRAGMENTS {
            return Err(FragVaultError::Configuration(format!(
                "k + m must be <= {}, got {}",
                MAX_TOTAL_FRAGMENTS,
                self.total_fragments()
            )));
        }
        Ok(())
    }

    /// Total number of fragments (n)
    pub fn total_fragments(&self) -> usize {
        self.data_fragments + self.parity_fragments
    }

    /// Storage overhead ratio (parity/data)
    pub fn overhead_ratio(&self) -> f64 {
        self.parity_fragments as f64 / self.data_fragments as f64
    }

    /// Maximum number of lost fragments that can be tolerated
    pub fn max_failures(&self) -> usize {
        self.parity_fragments
    }

    /// Whether `available` fragments are enough to rebuild the data
    pub fn can_reconstruct(&self, available: usize) -> bool {
        available >= self.data_fragments
    }

    /// Summary of the coding parameters
    pub fn describe(&self) -> ErasureInfo {
        ErasureInfo {
            k: self.data_fragments,
            m: self.parity_fragments,
            n: self.total_fragments(),
            min_fragments_needed: self.data_fragments,
            fault_tolerance: self.parity_fragments,
            redundancy_ratio: self.overhead_ratio(),
            storage_overhead: self.total_fragments() as f64 / self.data_fragments as f64 - 1.0,
            encoding_type: "Reed-Solomon GF(256), systematic",
        }
    }
}

/// Human-facing description of an erasure configuration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErasureInfo {
    pub k: usize,
    pub m: usize,
    pub n: usize,
    pub min_fragments_needed: usize,
    pub fault_tolerance: usize,
    pub redundancy_ratio: f64,
    pub storage_overhead: f64,
    pub encoding_type: &'static str,
}

impl fmt::Display for ErasureInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}+{}={} fragments, survives {} losses, {:.1}% overhead",
            self.k,
            self.m,
            self.n,
            self.fault_tolerance,
            self.storage_overhead * 100.0
        )
    }
}

/// Unpadded lengths of the k data fragments for an input of `len` bytes
pub fn data_fragment_lengths(len: usize, k: usize) -> Vec<usize> {
    (0..k).map(|i| data_fragment_len(len, k, i)).collect()
}

/// Padded fragment size `F` for an input of `len` bytes
pub fn fragment_size(len: usize, k: usize) -> usize {
    len.div_ceil(k)
}

/// Number of leading payload bytes covered by a fragment's content hash
///
/// Data fragments hash their unpadded content; parity fragments hash the
/// whole payload.
pub fn expected_content_len(index: usize, original_size: usize, k: usize) -> usize {
    if index < k {
        data_fragment_len(original_size, k, index)
    } else {
        fragment_size(original_size, k)
    }
}

fn data_fragment_len(len: usize, k: usize, index: usize) -> usize {
    let base = len / k;
    let remainder = len % k;
    base + usize::from(index < remainder)
}

/// Reed-Solomon encoder/decoder
///
/// Stateless apart from the precomputed coding matrix, so one encoder can be
/// shared across threads.
pub struct ErasureEncoder {
    config: ErasureConfig,
    /// `None` when m = 0: there is no parity to compute or invert
    codec: Option<ReedSolomon>,
}

impl ErasureEncoder {
    /// Create a new encoder with custom configuration
    pub fn with_config(config: ErasureConfig) -> Result<Self> {
        config.validate()?;
        let codec = if config.parity_fragments > 0 {
            Some(ReedSolomon::new(
                config.data_fragments,
                config.parity_fragments,
            )?)
        } else {
            None
        };
        Ok(Self { config, codec })
    }

    /// Create an encoder for (k, m)
    pub fn new(data_fragments: usize, parity_fragments: usize) -> Result<Self> {
        Self::with_config(ErasureConfig::new(data_fragments, parity_fragments)?)
    }

    /// Get the erasure configuration
    pub fn config(&self) -> &ErasureConfig {
        &self.config
    }

    /// Whether `available` fragments are enough to attempt a decode
    pub fn can_reconstruct(&self, available: usize) -> bool {
        self.config.can_reconstruct(available)
    }

    /// Encode data into fragments
    ///
    /// Returns n fragments in index order: data `0..k`, then parity `k..n`.
    pub fn encode(&self, data: &[u8]) -> Result<Vec<Fragment>> {
        let lengths = self.checked_lengths(data)?;
        let mut shards = self.split_padded(data, &lengths);
        self.fill_parity(&mut shards)?;

        let k = self.config.data_fragments;
        let fragments = shards
            .into_iter()
            .enumerate()
            .map(|(i, shard)| {
                let content_len = if i < k { lengths[i] } else { shard.len() };
                Fragment::new(i, Bytes::from(shard), content_len, i >= k)
            })
            .collect();

        Ok(fragments)
    }

    /// Encode data into fragments using parallel processing
    ///
    /// Produces the same fragments as [`encode`](Self::encode); splitting
    /// and hashing run on the rayon pool. Worth it for inputs above ~1 MB.
    pub fn encode_parallel(&self, data: &[u8]) -> Result<Vec<Fragment>> {
        let lengths = self.checked_lengths(data)?;
        let shard_size = fragment_size(data.len(), self.config.data_fragments);

        let offsets: Vec<usize> = lengths
            .iter()
            .scan(0usize, |offset, len| {
                let start = *offset;
                *offset += len;
                Some(start)
            })
            .collect();

        let mut shards: Vec<Vec<u8>> = offsets
            .par_iter()
            .zip(lengths.par_iter())
            .map(|(&start, &len)| {
                let mut shard = Vec::with_capacity(shard_size);
                shard.extend_from_slice(&data[start..start + len]);
                shard.resize(shard_size, 0);
                shard
            })
            .collect();
        shards.extend((0..self.config.parity_fragments).map(|_| vec![0u8; shard_size]));

        self.fill_parity(&mut shards)?;

        let k = self.config.data_fragments;
        let fragments = shards
            .into_par_iter()
            .enumerate()
            .map(|(i, shard)| {
                let content_len = if i < k { lengths[i] } else { shard.len() };
                Fragment::new(i, Bytes::from(shard), content_len, i >= k)
            })
            .collect();

        Ok(fragments)
    }

    /// Decode fragments back into the padded data stream
    ///
    /// Input is `(fragment_index, payload)` pairs in any order. The output is
    /// the k padded data fragments concatenated (`k * F` bytes); callers that
    /// know the original size should use [`reconstruct`](Self::reconstruct).
    pub fn decode(&self, fragments: &[(usize, Bytes)]) -> Result<Bytes> {
        let (data_fragments, shard_size) = self.recover_data_fragments(fragments)?;

        let mut result = Vec::with_capacity(shard_size * self.config.data_fragments);
        for shard in &data_fragments {
            result.extend_from_slice(shard);
        }
        Ok(Bytes::from(result))
    }

    /// Decode fragments and strip padding, returning exactly `original_size` bytes
    pub fn reconstruct(&self, fragments: &[(usize, Bytes)], original_size: usize) -> Result<Bytes> {
        let (data_fragments, shard_size) = self.recover_data_fragments(fragments)?;
        let k = self.config.data_fragments;

        let decoded_len = shard_size * k;
        if original_size > decoded_len {
            return Err(FragVaultError::Integrity(format!(
                "decoded {} bytes, shorter than recorded original size {}",
                decoded_len, original_size
            )));
        }

        let mut result = Vec::with_capacity(original_size);
        for (shard, len) in data_fragments
            .iter()
            .zip(data_fragment_lengths(original_size, k))
        {
            result.extend_from_slice(&shard[..len]);
        }
        Ok(Bytes::from(result))
    }

    /// Verify that a full fragment set is consistent (for health checking)
    ///
    /// Checks every content hash, then recomputes parity.
    pub fn verify_fragments(&self, fragments: &[Fragment]) -> Result<bool> {
        if fragments.len() != self.config.total_fragments() {
            return Ok(false);
        }

        let expected_size = fragments.first().map(|f| f.size()).unwrap_or(0);
        if !fragments.iter().all(|f| f.size() == expected_size) {
            return Ok(false);
        }
        if !fragments.iter().enumerate().all(|(i, f)| f.index == i && f.verify()) {
            return Ok(false);
        }

        match &self.codec {
            Some(codec) => {
                let refs: Vec<&[u8]> = fragments.iter().map(|f| f.payload.as_ref()).collect();
                Ok(codec.verify(&refs)?)
            }
            None => Ok(true),
        }
    }

    fn checked_lengths(&self, data: &[u8]) -> Result<Vec<usize>> {
        if data.is_empty() {
            return Err(FragVaultError::EmptyInput);
        }
        Ok(data_fragment_lengths(data.len(), self.config.data_fragments))
    }

    /// Split into k padded data shards followed by m zeroed parity shards
    fn split_padded(&self, data: &[u8], lengths: &[usize]) -> Vec<Vec<u8>> {
        let shard_size = fragment_size(data.len(), self.config.data_fragments);
        let mut shards = Vec::with_capacity(self.config.total_fragments());

        let mut offset = 0;
        for &len in lengths {
            let mut shard = Vec::with_capacity(shard_size);
            shard.extend_from_slice(&data[offset..offset + len]);
            shard.resize(shard_size, 0);
            shards.push(shard);
            offset += len;
        }

        for _ in 0..self.config.parity_fragments {
            shards.push(vec![0u8; shard_size]);
        }

        shards
    }

    fn fill_parity(&self, shards: &mut [Vec<u8>]) -> Result<()> {
        if let Some(codec) = &self.codec {
            codec.encode(shards)?;
        }
        Ok(())
    }

    /// Rebuild the k padded data fragments from any k distinct fragments
    fn recover_data_fragments(&self, fragments: &[(usize, Bytes)]) -> Result<(Vec<Vec<u8>>, usize)> {
        let k = self.config.data_fragments;
        let n = self.config.total_fragments();

        if fragments.len() < k {
            return Err(FragVaultError::InsufficientFragments {
                required: k,
                available: fragments.len(),
            });
        }

        // Slot per index; the first payload seen for an index wins
        let mut slots: Vec<Option<&Bytes>> = vec![None; n];
        for (index, payload) in fragments {
            if *index >= n {
                return Err(FragVaultError::InvalidFragmentIndex {
                    index: *index,
                    total: n,
                });
            }
            slots[*index].get_or_insert(payload);
        }

        let available = slots.iter().filter(|s| s.is_some()).count();
        if available < k {
            return Err(FragVaultError::InsufficientFragments {
                required: k,
                available,
            });
        }

        let shard_size = slots
            .iter()
            .flatten()
            .map(|p| p.len())
            .next()
            .unwrap_or(0);
        if shard_size == 0 {
            return Err(FragVaultError::Integrity("empty fragment payload".to_string()));
        }
        if let Some(bad) = slots.iter().flatten().find(|p| p.len() != shard_size) {
            return Err(FragVaultError::FragmentSizeMismatch {
                expected: shard_size,
                actual: bad.len(),
            });
        }

        // Every data fragment present: pure gather, no field arithmetic
        if slots[..k].iter().all(Option::is_some) {
            let data = slots[..k]
                .iter()
                .flatten()
                .map(|p| p.to_vec())
                .collect();
            return Ok((data, shard_size));
        }

        let codec = self.codec.as_ref().ok_or_else(|| {
            // Unreachable in practice: with m = 0, k distinct indices are all data
            FragVaultError::Internal("missing data fragment with no parity configured".to_string())
        })?;

        let mut shards: Vec<Option<Vec<u8>>> = slots
            .iter()
            .map(|slot| slot.map(|p| p.to_vec()))
            .collect();
        codec.reconstruct_data(&mut shards)?;

        let mut data = Vec::with_capacity(k);
        for shard in shards.into_iter().take(k) {
            match shard {
                Some(shard) => data.push(shard),
                None => {
                    return Err(FragVaultError::Internal(
                        "reconstruction left a data fragment empty".to_string(),
                    ))
                }
            }
        }
        Ok((data, shard_size))
    }
}

impl fmt::Debug for ErasureEncoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErasureEncoder")
            .field("config", &self.config)
            .finish()
    }
}

/// Convenience function to encode with a one-off encoder
pub fn encode(data_fragments: usize, parity_fragments: usize, data: &[u8]) -> Result<Vec<Fragment>> {
    ErasureEncoder::new(data_fragments, parity_fragments)?.encode(data)
}

/// Convenience function to reconstruct with a one-off encoder
pub fn reconstruct(
    data_fragments: usize,
    parity_fragments: usize,
    fragments: &[(usize, Bytes)],
    original_size: usize,
) -> Result<Bytes> {
    ErasureEncoder::new(data_fragments, parity_fragments)?.reconstruct(fragments, original_size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, RngCore, SeedableRng};

    fn random_bytes(len: usize, seed: u64) -> Vec<u8> {
        let mut data = vec![0u8; len];
        StdRng::seed_from_u64(seed).fill_bytes(&mut data);
        data
    }

    fn pick(fragments: &[Fragment], indices: &[usize]) -> Vec<(usize, Bytes)> {
        indices
            .iter()
            .map(|&i| (fragments[i].index, fragments[i].payload.clone()))
            .collect()
    }

    #[test]
    fn test_erasure_config() {
        let config = ErasureConfig::new(5, 2).unwrap();
        assert_eq!(config.total_fragments(), 7);
        assert_eq!(config.max_failures(), 2);
        assert!((config.overhead_ratio() - 0.4).abs() < 0.001);

        let info = config.describe();
        assert_eq!(info.min_fragments_needed, 5);
        assert!((info.storage_overhead - 0.4).abs() < 0.001);
    }

    #[test]
    fn test_config_rejects_zero_k() {
        assert!(matches!(
            ErasureConfig::new(0, 2),
            Err(FragVaultError::Configuration(_))
        ));
        assert!(ErasureConfig::new(200, 57).is_err());
        assert!(ErasureConfig::new(200, 56).is_ok());
    }

    #[test]
    fn test_split_layout() {
        assert_eq!(data_fragment_lengths(9, 6), vec![2, 2, 2, 1, 1, 1]);
        assert_eq!(data_fragment_lengths(37, 4), vec![10, 9, 9, 9]);
        assert_eq!(data_fragment_lengths(3, 5), vec![1, 1, 1, 0, 0]);
        assert_eq!(fragment_size(9, 6), 2);
        assert_eq!(expected_content_len(4, 9, 6), 1);
        assert_eq!(expected_content_len(7, 9, 6), 2);
    }

    #[test]
    fn test_k4_m2_decode_from_mixed_subset() {
        let encoder = ErasureEncoder::new(4, 2).unwrap();
        let original = random_bytes(37, 7);

        let fragments = encoder.encode(&original).unwrap();
        assert_eq!(fragments.len(), 6);

        let decoded = encoder
            .reconstruct(&pick(&fragments, &[1, 3, 4, 5]), original.len())
            .unwrap();
        assert_eq!(decoded.as_ref(), original.as_slice());
    }

    #[test]
    fn test_k6_m3_data_fragments_only() {
        let encoder = ErasureEncoder::new(6, 3).unwrap();
        let original = b"hello-fyp";

        let fragments = encoder.encode(original).unwrap();
        assert_eq!(fragments.len(), 9);
        assert!(fragments.iter().all(|f| f.size() == 2));

        let subset = pick(&fragments, &[0, 1, 2, 3, 4, 5]);
        let padded = encoder.decode(&subset).unwrap();
        assert_eq!(padded.len(), 12);

        let decoded = encoder.reconstruct(&subset, original.len()).unwrap();
        assert_eq!(decoded.as_ref(), original);
    }

    #[test]
    fn test_empty_input_rejected() {
        let encoder = ErasureEncoder::new(6, 1).unwrap();
        assert!(matches!(encoder.encode(b""), Err(FragVaultError::EmptyInput)));
        assert!(matches!(
            encoder.encode_parallel(b""),
            Err(FragVaultError::EmptyInput)
        ));
    }

    #[test]
    fn test_k8_m4_insufficient_fragments() {
        let encoder = ErasureEncoder::new(8, 4).unwrap();
        let original = random_bytes(100, 3);
        let fragments = encoder.encode(&original).unwrap();
        assert_eq!(fragments.len(), 12);

        assert!(!encoder.can_reconstruct(7));
        assert!(encoder.can_reconstruct(8));

        let err = encoder
            .reconstruct(&pick(&fragments, &[0, 2, 4, 6, 8, 10, 11]), original.len())
            .unwrap_err();
        assert!(matches!(
            err,
            FragVaultError::InsufficientFragments {
                required: 8,
                available: 7
            }
        ));
        assert!(err.to_string().contains("need 8, got 7"));
    }

    #[test]
    fn test_duplicate_indices_do_not_count_twice() {
        let encoder = ErasureEncoder::new(3, 2).unwrap();
        let fragments = encoder.encode(b"duplicates").unwrap();

        let mut subset = pick(&fragments, &[0, 1]);
        subset.push((1, fragments[1].payload.clone()));

        assert!(matches!(
            encoder.decode(&subset),
            Err(FragVaultError::InsufficientFragments {
                required: 3,
                available: 2
            })
        ));
    }

    #[test]
    fn test_out_of_range_index() {
        let encoder = ErasureEncoder::new(2, 1).unwrap();
        let fragments = encoder.encode(b"abcd").unwrap();
        let mut subset = pick(&fragments, &[0, 1]);
        subset.push((9, fragments[2].payload.clone()));

        assert!(matches!(
            encoder.decode(&subset),
            Err(FragVaultError::InvalidFragmentIndex { index: 9, total: 3 })
        ));
    }

    #[test]
    fn test_mismatched_fragment_sizes() {
        let encoder = ErasureEncoder::new(2, 1).unwrap();
        let fragments = encoder.encode(b"abcdef").unwrap();
        let subset = vec![
            (0, fragments[0].payload.clone()),
            (2, Bytes::from_static(b"x")),
        ];
        assert!(matches!(
            encoder.decode(&subset),
            Err(FragVaultError::FragmentSizeMismatch { .. })
        ));
    }

    #[test]
    fn test_original_size_larger_than_decoded() {
        let encoder = ErasureEncoder::new(2, 1).unwrap();
        let fragments = encoder.encode(b"abcd").unwrap();
        let err = encoder
            .reconstruct(&pick(&fragments, &[0, 1]), 5)
            .unwrap_err();
        assert!(matches!(err, FragVaultError::Integrity(_)));
    }

    #[test]
    fn test_no_parity_profile() {
        let encoder = ErasureEncoder::new(3, 0).unwrap();
        let original = b"no parity at all";
        let fragments = encoder.encode(original).unwrap();
        assert_eq!(fragments.len(), 3);

        let decoded = encoder
            .reconstruct(&pick(&fragments, &[2, 0, 1]), original.len())
            .unwrap();
        assert_eq!(decoded.as_ref(), original);
        assert!(encoder.verify_fragments(&fragments).unwrap());
    }

    #[test]
    fn test_encode_parallel_matches_sequential() {
        let encoder = ErasureEncoder::new(5, 2).unwrap();
        let original = random_bytes(3 * 1024 * 1024 + 3, 11);

        let sequential = encoder.encode(&original).unwrap();
        let parallel = encoder.encode_parallel(&original).unwrap();

        assert_eq!(sequential.len(), parallel.len());
        for (a, b) in sequential.iter().zip(parallel.iter()) {
            assert_eq!(a.index, b.index);
            assert_eq!(a.payload, b.payload);
            assert_eq!(a.content_hash, b.content_hash);
            assert_eq!(a.content_len, b.content_len);
        }
    }

    #[test]
    fn test_verify_fragments() {
        let encoder = ErasureEncoder::new(4, 3).unwrap();
        let fragments = encoder.encode(b"verify test payload").unwrap();
        assert!(encoder.verify_fragments(&fragments).unwrap());

        let mut corrupted = fragments.clone();
        let mut payload = corrupted[5].payload.to_vec();
        payload[0] ^= 0xFF;
        corrupted[5].payload = Bytes::from(payload);
        assert!(!encoder.verify_fragments(&corrupted).unwrap());
    }

    #[test]
    fn test_fragment_indices_and_parity_flags() {
        let encoder = ErasureEncoder::new(6, 1).unwrap();
        let fragments = encoder.encode(b"index test").unwrap();

        for (i, fragment) in fragments.iter().enumerate() {
            assert_eq!(fragment.index, i);
            assert_eq!(fragment.is_parity, i >= 6);
            assert!(fragment.verify());
        }
    }
}

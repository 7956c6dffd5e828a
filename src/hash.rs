//! Keyed 32-bit hashing and flow-key decoding.
//!
//! Flow keys are decoded big-endian from their first four bytes, and a flow id is
//! always hashed as its four big-endian bytes, so fingerprints and bucket placement
//! do not depend on the host byte order.

use murmurhash3::murmurhash3_x86_32 as mmh3;

use crate::error::{Error, Result};

/// Seed used for the fingerprint of a flow id.
pub const FINGERPRINT_SEED: u32 = 0;

/// A deterministic keyed hash, assumed uniform for distinct seeds.
pub trait HashOracle {
    fn hash(&self, bytes: &[u8], seed: u32) -> u32;

    fn hash_flow(&self, flow_id: u32, seed: u32) -> u32 {
        self.hash(&flow_id.to_be_bytes(), seed)
    }
}

impl<H: HashOracle + ?Sized> HashOracle for &H {
    fn hash(&self, bytes: &[u8], seed: u32) -> u32 {
        (**self).hash(bytes, seed)
    }
}

/// MurmurHash3 x86_32.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Murmur3;

impl HashOracle for Murmur3 {
    fn hash(&self, bytes: &[u8], seed: u32) -> u32 {
        mmh3(bytes, seed)
    }
}

/// Decode a flow id from raw key bytes.
pub fn flow_id_from_key(key: &[u8]) -> Result<u32> {
    match key.get(..4) {
        Some(head) => Ok(u32::from_be_bytes([head[0], head[1], head[2], head[3]])),
        None => Err(Error::InvalidKey { len: key.len() }),
    }
}

/// Primary bucket index: low 16 bits of the fingerprint.
#[inline]
pub fn primary_index(fingerprint: u32, bucket_count: usize) -> usize {
    (fingerprint & 0xFFFF) as usize % bucket_count
}

/// Secondary bucket index: high 16 bits of the fingerprint.
#[inline]
pub fn secondary_index(fingerprint: u32, bucket_count: usize) -> usize {
    (fingerprint >> 16) as usize % bucket_count
}

//! Key to bit-position mapping
//!
//! One MurmurHash3 x64/128 evaluation per key; the k positions are derived
//! by double hashing: `combined = h1 + i * h2` with `h2 = h1 >>> 16`.
//! Arithmetic is on the signed 64-bit view of the hash, negative values
//! are complemented before reducing modulo m.

use std::io::Cursor;

use super::parameters::FilterParameters;

/// Hash a key with MurmurHash3 (x64, 128-bit, seed 0) and keep the lower 64 bits.
pub fn murmur_hash64(key: &str) -> u64 {
    let mut cursor = Cursor::new(key.as_bytes());
    let hash = murmur3::murmur3_x64_128(&mut cursor, 0).unwrap_or(0);
    hash as u64
}

/// Maps candidate keys to bit positions for one set of filter parameters.
#[derive(Clone, Debug)]
pub struct BitIndexer {
    params: FilterParameters,
}

impl BitIndexer {
    pub fn new(params: FilterParameters) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &FilterParameters {
        &self.params
    }

    /// Compute the `hash_function_count` positions of `key`, each `< bit_array_size`.
    ///
    /// Positions may repeat; order is the derivation order.
    pub fn positions(&self, key: &str) -> Vec<u64> {
        let size = self.params.bit_array_size();
        let hash1 = murmur_hash64(key) as i64;
        let hash2 = ((hash1 as u64) >> 16) as i64;

        (0..self.params.hash_function_count())
            .map(|i| {
                let mut combined = hash1.wrapping_add(i64::from(i).wrapping_mul(hash2));
                if combined < 0 {
                    combined = !combined;
                }
                combined as u64 % size
            })
            .collect()
    }
}

//! Optimal filter parameter calculation
//!
//! Formulas:
//! - m = ceil(-n*ln(p) / (ln(2)^2))   -- bit array size
//! - k = max(1, round((m/n) * ln(2)))  -- derived hash rounds

use serde::Serialize;
use std::f64::consts::LN_2;

use crate::error::FilterError;

/// Sizing of one filter, fixed at construction.
///
/// Changing `expected_insertions` or `false_positive_rate` after a bit array
/// has been populated voids the no-false-negative guarantee, so the derived
/// values are only reachable through accessors.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FilterParameters {
    expected_insertions: u64,
    false_positive_rate: f64,
    bit_array_size: u64,
    hash_function_count: u32,
}

impl FilterParameters {
    /// Derive the bit array size and hash round count for `n` insertions at rate `p`.
    ///
    /// # Errors
    /// - `InvalidFpr` unless `0 < p < 1`
    /// - `InvalidParameters` if `n == 0`
    pub fn new(expected_insertions: u64, false_positive_rate: f64) -> Result<Self, FilterError> {
        if !(false_positive_rate > 0.0 && false_positive_rate < 1.0) {
            return Err(FilterError::InvalidFpr {
                fpr: false_positive_rate,
            });
        }
        if expected_insertions == 0 {
            return Err(FilterError::InvalidParameters(
                "expected_insertions must be at least 1".to_string(),
            ));
        }

        let n = expected_insertions as f64;
        let bit_array_size = (-n * false_positive_rate.ln() / (LN_2 * LN_2)).ceil() as u64;
        let bit_array_size = bit_array_size.max(1);

        let hash_function_count = optimal_hash_count(bit_array_size, expected_insertions);

        Ok(Self {
            expected_insertions,
            false_positive_rate,
            bit_array_size,
            hash_function_count,
        })
    }

    pub fn expected_insertions(&self) -> u64 {
        self.expected_insertions
    }

    pub fn false_positive_rate(&self) -> f64 {
        self.false_positive_rate
    }

    /// Number of bits (m)
    pub fn bit_array_size(&self) -> u64 {
        self.bit_array_size
    }

    /// Number of derived hash rounds (k)
    pub fn hash_function_count(&self) -> u32 {
        self.hash_function_count
    }

    /// False positive rate predicted for a filter holding exactly `expected_insertions` keys.
    ///
    /// Formula: FPR = (1 - e^(-kn/m))^k
    pub fn expected_fpr(&self) -> f64 {
        let k = self.hash_function_count as f64;
        let exponent = -k * self.expected_insertions as f64 / self.bit_array_size as f64;
        (1.0 - exponent.exp()).powf(k)
    }
}

fn optimal_hash_count(m: u64, n: u64) -> u32 {
    let k = ((m as f64 / n as f64) * LN_2).round() as u32;
    k.max(1)
}

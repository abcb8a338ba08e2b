//! Cache entry envelope
//!
//! A cached entry is either a real value or the absence marker. The marker
//! is a distinct variant, so no payload (including an empty one) can be
//! mistaken for it.

use serde::{Deserialize, Serialize};

use crate::error::GuardError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CachedValue {
    Present(Vec<u8>),
    Absent,
}

impl CachedValue {
    pub fn encode(&self) -> Result<Vec<u8>, GuardError> {
        bincode::serialize(self).map_err(|e| GuardError::Encoding(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, GuardError> {
        bincode::deserialize(bytes).map_err(|e| GuardError::Encoding(e.to_string()))
    }

    pub fn into_value(self) -> Option<Vec<u8>> {
        match self {
            CachedValue::Present(value) => Some(value),
            CachedValue::Absent => None,
        }
    }
}

//! Filter handle

use serde::Serialize;
use std::fmt;

use crate::error::FilterError;

/// Logical name of one remote bit array.
///
/// Many candidate keys share one handle; the name is the store key the bit
/// array lives under.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct FilterHandle {
    name: String,
}

impl FilterHandle {
    pub fn new(name: impl Into<String>) -> Result<Self, FilterError> {
        let name = name.into();
        if name.is_empty() {
            return Err(FilterError::InvalidParameters(
                "filter handle name cannot be empty".to_string(),
            ));
        }
        Ok(Self { name })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for FilterHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

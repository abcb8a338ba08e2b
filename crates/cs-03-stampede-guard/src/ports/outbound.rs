//! Outbound Ports (Driven Ports)

use async_trait::async_trait;

use crate::error::SourceError;

/// The authoritative data source behind the cache (Driven Port)
///
/// Usually a database. `Ok(None)` means the key definitively does not exist
/// and will be remembered as an absence.
#[async_trait]
pub trait AuthoritativeSource: Send + Sync {
    async fn lookup(&self, key: &str) -> Result<Option<Vec<u8>>, SourceError>;
}

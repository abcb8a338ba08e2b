//! # CS-03 Stampede Guard
//!
//! Cache-aside reads that shield an authoritative source from two failure
//! modes:
//!
//! - **Penetration**: lookups for keys that do not exist. The membership
//!   filter rules most of them out, and authoritative absences are cached
//!   (with their own, usually longer, TTL) as a distinct marker.
//! - **Stampede**: many callers missing the same hot key at once. A per-key
//!   lease lock admits one recompute; the others fail fast or wait and pick
//!   up the refilled cache.
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`): `GuardConfig`, `CachedValue`, `Resolution`
//! - **Ports Layer** (`ports/`): `AuthoritativeSource` (driven), plus the
//!   store and filter ports re-exported from their crates
//! - **Service Layer** (`service/`): `StampedeGuard`
//!
//! ## Usage Example
//!
//! ```ignore
//! use cs_03_stampede_guard::{GuardConfig, StampedeGuard};
//!
//! let guard = StampedeGuard::new(store, GuardConfig::from_env()?)?
//!     .with_filter(filter, FilterHandle::new("user:bloom")?);
//!
//! match guard.resolve("42", &user_table).await {
//!     Ok(resolution) => render(resolution.value),
//!     Err(e) if e.is_retryable() => busy(),
//!     Err(e) => return Err(e.into()),
//! }
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod domain;
pub mod error;
pub mod metrics;
pub mod ports;
pub mod service;

pub use domain::{
    CachedValue, ContentionPolicy, GuardConfig, GuardConfigBuilder, Resolution, ResolutionSource,
};
pub use error::{GuardError, SourceError};
pub use metrics::{GuardMetrics, GuardMetricsSnapshot};
pub use ports::AuthoritativeSource;
pub use service::StampedeGuard;

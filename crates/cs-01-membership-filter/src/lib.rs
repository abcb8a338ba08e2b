//! # CS-01 Membership Filter
//!
//! Penetration guard: a Bloom filter whose bit array lives in the shared
//! store, so every process consults the same set. A negative answer means
//! the key was never added and the authoritative source need not be asked.
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`): Pure logic, no I/O
//!   - `FilterParameters`: bit array size and hash round count
//!   - `BitIndexer`: key → bit positions (MurmurHash3 + double hashing)
//!   - `FilterHandle`: name of one remote bit array
//!
//! - **Ports Layer** (`ports/`): Trait definitions
//!   - `MembershipFilterApi`: Driving port (inbound API)
//!   - `KeyValueStore`: Driven port (shared store)
//!
//! - **Service Layer** (`service/`): Orchestration
//!   - `MembershipFilter`: Implements `MembershipFilterApi`
//!
//! ## Invariants
//!
//! - No false negatives: after `add(k)`, `might_contain(k)` is true until the
//!   backing array is cleared or truncated externally.
//! - Each `add`, `add_all` and `might_contain` is exactly one store round-trip.
//!
//! ## Usage Example
//!
//! ```ignore
//! use cs_01_membership_filter::{
//!     FilterHandle, FilterParameters, MembershipFilter, MembershipFilterApi,
//! };
//!
//! let params = FilterParameters::new(100, 0.01)?;
//! let filter = MembershipFilter::new(store, params);
//! let handle = FilterHandle::new("user:bloom")?;
//!
//! filter.add(&handle, "42").await?;
//! assert!(filter.might_contain(&handle, "42").await?);
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod domain;
pub mod error;
pub mod metrics;
pub mod ports;
pub mod service;

pub use domain::{BitIndexer, FilterHandle, FilterParameters};
pub use error::FilterError;
pub use metrics::{FilterMetrics, FilterMetricsSnapshot};
pub use ports::MembershipFilterApi;
pub use service::MembershipFilter;

//! # Shared Store - Coordination Point for Cache-Shield
//!
//! Every subsystem coordinates exclusively through one shared key-value
//! store. There is no in-process shared mutable state between execution
//! contexts beyond what the store provides.
//!
//! ## Capabilities
//!
//! ```text
//! ┌─────────────────────┐   set_bits / get_bits        ┌──────────────┐
//! │ cs-01 membership    │ ───────────────────────────▶ │              │
//! └─────────────────────┘   (one pipelined call)       │              │
//! ┌─────────────────────┐   set_if_absent_with_expiry  │  Key-Value   │
//! │ cs-02 lease lock    │ ───────────────────────────▶ │    Store     │
//! └─────────────────────┘   compare_and_delete/expire  │              │
//! ┌─────────────────────┐   get / set_with_expiry      │              │
//! │ cs-03 stampede guard│ ───────────────────────────▶ │              │
//! └─────────────────────┘                              └──────────────┘
//! ```
//!
//! Conditional operations (`set_if_absent_with_expiry`, `compare_and_delete`,
//! `compare_and_expire`, shared-holder updates) are atomic. Expiry is enforced
//! by the store itself.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod error;
pub mod in_memory;
pub mod ports;

pub use error::StoreError;
pub use in_memory::{InMemoryStore, StoreCallStats, StoreOp};
pub use ports::KeyValueStore;

//! Domain Layer - Pure logic, no I/O
//!
//! - Filter parameter derivation
//! - Key to bit-position indexing
//! - Filter handles
//!
//! RULES:
//! - No I/O operations
//! - No async code

pub mod handle;
pub mod indexer;
pub mod parameters;

pub use handle::FilterHandle;
pub use indexer::{murmur_hash64, BitIndexer};
pub use parameters::FilterParameters;

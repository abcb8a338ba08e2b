//! Service Layer

pub mod lease_lock;

pub use lease_lock::LeaseLock;

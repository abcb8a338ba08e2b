//! Domain layer: configuration, cache envelope and resolution outcomes

pub mod cached_value;
pub mod config;
pub mod resolution;

pub use cached_value::CachedValue;
pub use config::{ContentionPolicy, GuardConfig, GuardConfigBuilder};
pub use resolution::{Resolution, ResolutionSource};

//! Cross-crate properties and flows

pub mod lock_properties;
pub mod stampede_flows;

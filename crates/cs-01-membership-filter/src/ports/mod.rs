//! Ports Layer
//!
//! - Driving Port (inbound): `MembershipFilterApi`
//! - Driven Port (outbound): `KeyValueStore` from `shared-store`

pub mod inbound;

pub use inbound::MembershipFilterApi;
pub use shared_store::KeyValueStore;

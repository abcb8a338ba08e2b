//! Ports layer: the collaborators a stampede guard is wired to

pub mod outbound;

pub use cs_01_membership_filter::MembershipFilterApi;
pub use outbound::AuthoritativeSource;
pub use shared_store::KeyValueStore;

//! Service Layer
//!
//! Application services that orchestrate domain logic and reach the shared
//! store through ports.

pub mod membership_filter;

pub use membership_filter::MembershipFilter;

//! Service layer

pub mod stampede_guard;

pub use stampede_guard::StampedeGuard;

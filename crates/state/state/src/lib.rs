//! Trait abstraction for the shared key-value store the waiting room gateway
//! treats as an external dependency.
//!
//! This crate defines only the contract (§6 of the spec this gateway
//! implements) plus a backend-agnostic conformance suite; concrete backends
//! live in `waitingroom-state-memory` and `waitingroom-state-redis`.

pub mod error;
pub mod store;
pub mod testing;

pub use error::StateError;
pub use store::StateStore;

//! Admission protocol and periodic access controller for the waiting room
//! gateway: combines `waitingroom-core`'s domain types with a concrete
//! [`waitingroom_state::StateStore`] into the request- and cycle-level
//! operations the server crate wires up to HTTP.

pub mod access_controller;
pub mod error;
pub mod queue_handler;
pub mod whitelist;

pub use access_controller::{AccessController, CycleReport, DomainOutcome};
pub use error::GatewayError;
pub use queue_handler::{AdmissionOutcome, AdmissionResult, CookieAction, QueueHandler};
pub use whitelist::Whitelist;

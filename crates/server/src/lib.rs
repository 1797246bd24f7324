//! Standalone HTTP server binary support for the virtual waiting room
//! gateway: configuration, the store backend factory, the HTTP surface, and
//! telemetry initialization. The admission protocol and access controller
//! themselves live in `waitingroom-gateway`.

pub mod api;
pub mod config;
pub mod error;
pub mod state_factory;
pub mod telemetry;

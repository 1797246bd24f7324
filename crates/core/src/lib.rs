//! Core domain types for the waiting room gateway: the per-domain queue
//! state machine (`Site`), the client's signed cookie identity (`Client`),
//! and the process-local advisory read cache (`Cache`) that sits in front of
//! the shared [`waitingroom_state::StateStore`].
//!
//! This crate holds no HTTP, no background scheduling, and no wiring to a
//! concrete store backend — those live in `waitingroom-gateway` and
//! `waitingroom-server`.

pub mod cache;
pub mod client;
pub mod config;
pub mod site;
pub mod time;

pub use cache::{Cache, CacheKey, CacheLookup, CacheValue};
pub use client::{Client, ClientCodec, ClientError, COOKIE_NAME};
pub use config::QueueConfig;
pub use site::Site;

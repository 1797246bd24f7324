//! Redis state backend for the waiting room gateway.
//!
//! Implements [`StateStore`](waitingroom_state::StateStore) over a
//! `deadpool-redis` connection pool, using native Redis commands for every
//! operation (`INCRBY`, `SET ... NX PX`, `ZADD`, `SADD`, ...). Suitable for
//! multi-replica deployments where the state the gateway tracks must be
//! shared across processes.
//!
//! # Example
//!
//! ```ignore
//! use waitingroom_state_redis::{RedisConfig, RedisStateStore};
//!
//! let config = RedisConfig::default();
//! let store = RedisStateStore::new(&config)?;
//! ```

mod config;
mod store;

pub use config::RedisConfig;
pub use store::RedisStateStore;

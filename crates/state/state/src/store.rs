use std::time::Duration;

use async_trait::async_trait;

use crate::error::StateError;

/// Trait for the shared key-value store the waiting room gateway treats as
/// an external dependency (spec §6: "Store operations required").
///
/// Every operation is keyed by a plain string — there is no namespacing
/// scheme beyond the key names the gateway itself constructs (see
/// `waitingroom_core::site::keys`). A missing key is never an error: it
/// surfaces as `None`, `0`, or `false` depending on the operation, per the
/// error taxonomy's "`StoreMissingKey` is not an error" rule.
///
/// Implementations must be `Send + Sync` and safe for concurrent access from
/// many request tasks plus the single background controller task.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Atomically increment a counter by `delta`, creating it at zero first
    /// if absent. Returns the new value.
    async fn incr_by(&self, key: &str, delta: i64, ttl: Option<Duration>) -> Result<i64, StateError>;

    /// Atomically increment a counter by 1. See [`incr_by`](Self::incr_by).
    async fn incr(&self, key: &str, ttl: Option<Duration>) -> Result<i64, StateError> {
        self.incr_by(key, 1, ttl).await
    }

    /// Read a string value. Returns `None` if the key is absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>, StateError>;

    /// Set a string value, overwriting any previous value.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StateError>;

    /// Set a string value only if the key does not already exist. Returns
    /// `true` if this call created the key, `false` if it already existed.
    async fn set_nx(&self, key: &str, value: &str, ttl: Option<Duration>)
    -> Result<bool, StateError>;

    /// Apply (or refresh) a TTL on an existing key. A no-op if the key is absent.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), StateError>;

    /// Return the remaining TTL for a key, or `None` if the key is absent or
    /// has no TTL set.
    async fn ttl(&self, key: &str) -> Result<Option<Duration>, StateError>;

    /// Delete keys. Returns the number of keys that actually existed.
    async fn del(&self, keys: &[&str]) -> Result<u64, StateError>;

    /// Add a member to a sorted set with the given score (or update its score
    /// if already present).
    async fn zadd(&self, key: &str, score: f64, member: &str) -> Result<(), StateError>;

    /// Return members of a sorted set ordered by score ascending, using
    /// Redis-style `ZRANGE` indices (0-based, inclusive, negative indices
    /// count from the end; `(0, -1)` returns the whole set).
    async fn zrange(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>, StateError>;

    /// Remove members from a sorted set. Returns the number removed.
    async fn zrem(&self, key: &str, members: &[&str]) -> Result<u64, StateError>;

    /// Add a member to a set. Returns `true` if the member was newly added.
    async fn sadd(&self, key: &str, member: &str) -> Result<bool, StateError>;

    /// Remove a member from a set. Returns `true` if the member was present.
    async fn srem(&self, key: &str, member: &str) -> Result<bool, StateError>;

    /// Check set membership.
    async fn sismember(&self, key: &str, member: &str) -> Result<bool, StateError>;

    /// Return all members of a set.
    async fn smembers(&self, key: &str) -> Result<Vec<String>, StateError>;
}

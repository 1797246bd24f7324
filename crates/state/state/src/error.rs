use thiserror::Error;

/// Errors from the key-value store.
///
/// A missing key is never represented as an error: `get` returns `Ok(None)`,
/// `increment` creates the counter at zero, `ttl` returns `Ok(None)`. Only
/// genuine backend failures surface here, matching the propagation policy of
/// treating "absent" as a value, not a fault.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("store connection error: {0}")]
    Connection(String),

    #[error("store operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("store backend error: {0}")]
    Backend(String),
}

//! Constructs a concrete [`StateStore`] from `[store]` configuration
//! (spec §10.3/§4.6).

use std::sync::Arc;

use waitingroom_state::StateStore;
use waitingroom_state_memory::MemoryStateStore;

use crate::config::StoreConfig;
use crate::error::ServerError;

/// Build the configured store backend.
///
/// # Errors
///
/// Returns [`ServerError::Config`] if `backend` names an unrecognized value,
/// or if `backend = "redis"` but `url` is missing, or the Redis feature was
/// not compiled in.
pub async fn create_state(config: &StoreConfig) -> Result<Arc<dyn StateStore>, ServerError> {
    match config.backend.as_str() {
        "memory" => Ok(Arc::new(MemoryStateStore::new())),
        "redis" => create_redis_state(config),
        other => Err(ServerError::Config(format!(
            "unrecognized store backend '{other}', expected \"memory\" or \"redis\""
        ))),
    }
}

#[cfg(feature = "redis")]
fn create_redis_state(config: &StoreConfig) -> Result<Arc<dyn StateStore>, ServerError> {
    use waitingroom_state_redis::{RedisConfig, RedisStateStore};

    let url = config
        .url
        .clone()
        .ok_or_else(|| ServerError::Config("[store].url is required for backend = \"redis\"".to_owned()))?;
    let redis_config = RedisConfig {
        url,
        prefix: config.prefix.clone(),
        ..RedisConfig::default()
    };
    let store = RedisStateStore::new(&redis_config)
        .map_err(|e| ServerError::Config(format!("failed to connect to redis: {e}")))?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "redis"))]
fn create_redis_state(_config: &StoreConfig) -> Result<Arc<dyn StateStore>, ServerError> {
    Err(ServerError::Config(
        "backend = \"redis\" requires the `redis` feature".to_owned(),
    ))
}

use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::{Config, Pool, Runtime};
use redis::AsyncCommands;

use waitingroom_state::StateError;
use waitingroom_state::StateStore;

use crate::config::RedisConfig;

/// Redis-backed implementation of [`StateStore`].
///
/// Uses a `deadpool-redis` connection pool. Every operation maps onto a
/// single native Redis command (`INCRBY`, `SET ... NX PX`, `ZADD`, ...), so
/// no Lua scripting is needed: each of those commands is already atomic.
pub struct RedisStateStore {
    pool: Pool,
    prefix: String,
}

impl RedisStateStore {
    /// Create a new `RedisStateStore` from the provided configuration.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::Connection`] if the pool cannot be created.
    pub fn new(config: &RedisConfig) -> Result<Self, StateError> {
        let cfg = Config::from_url(config.effective_url());
        let pool = cfg
            .builder()
            .map(|b| {
                b.max_size(config.pool_size)
                    .wait_timeout(Some(config.connection_timeout))
                    .runtime(Runtime::Tokio1)
                    .build()
            })
            .map_err(|e| StateError::Connection(e.to_string()))?
            .map_err(|e| StateError::Connection(e.to_string()))?;

        Ok(Self {
            pool,
            prefix: config.prefix.clone(),
        })
    }

    fn render(&self, key: &str) -> String {
        if self.prefix.is_empty() {
            key.to_owned()
        } else {
            format!("{}:{}", self.prefix, key)
        }
    }

    async fn conn(&self) -> Result<deadpool_redis::Connection, StateError> {
        self.pool
            .get()
            .await
            .map_err(|e| StateError::Connection(e.to_string()))
    }
}

fn to_ms(ttl: Duration) -> i64 {
    i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX)
}

fn backend_err(e: redis::RedisError) -> StateError {
    StateError::Backend(e.to_string())
}

#[async_trait]
impl StateStore for RedisStateStore {
    async fn incr_by(
        &self,
        key: &str,
        delta: i64,
        ttl: Option<Duration>,
    ) -> Result<i64, StateError> {
        let redis_key = self.render(key);
        let mut conn = self.conn().await?;
        let new_val: i64 = conn
            .incr(&redis_key, delta)
            .await
            .map_err(backend_err)?;
        if let Some(d) = ttl {
            let _: () = conn
                .pexpire(&redis_key, to_ms(d))
                .await
                .map_err(backend_err)?;
        }
        Ok(new_val)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StateError> {
        let redis_key = self.render(key);
        let mut conn = self.conn().await?;
        conn.get(&redis_key).await.map_err(backend_err)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StateError> {
        let redis_key = self.render(key);
        let mut conn = self.conn().await?;
        match ttl {
            Some(d) => {
                let _: () = redis::cmd("SET")
                    .arg(&redis_key)
                    .arg(value)
                    .arg("PX")
                    .arg(to_ms(d))
                    .query_async(&mut conn)
                    .await
                    .map_err(backend_err)?;
            }
            None => {
                let _: () = conn.set(&redis_key, value).await.map_err(backend_err)?;
            }
        }
        Ok(())
    }

    async fn set_nx(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<bool, StateError> {
        let redis_key = self.render(key);
        let mut conn = self.conn().await?;
        let mut cmd = redis::cmd("SET");
        cmd.arg(&redis_key).arg(value).arg("NX");
        if let Some(d) = ttl {
            cmd.arg("PX").arg(to_ms(d));
        }
        let result: Option<String> = cmd.query_async(&mut conn).await.map_err(backend_err)?;
        Ok(result.is_some())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), StateError> {
        let redis_key = self.render(key);
        let mut conn = self.conn().await?;
        let _: () = conn
            .pexpire(&redis_key, to_ms(ttl))
            .await
            .map_err(backend_err)?;
        Ok(())
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, StateError> {
        let redis_key = self.render(key);
        let mut conn = self.conn().await?;
        let ms: i64 = conn.pttl(&redis_key).await.map_err(backend_err)?;
        Ok(match ms {
            -2 | -1 => None,
            ms => Some(Duration::from_millis(ms.max(0) as u64)),
        })
    }

    async fn del(&self, keys: &[&str]) -> Result<u64, StateError> {
        if keys.is_empty() {
            return Ok(0);
        }
        let redis_keys: Vec<String> = keys.iter().map(|k| self.render(k)).collect();
        let mut conn = self.conn().await?;
        conn.del(redis_keys).await.map_err(backend_err)
    }

    async fn zadd(&self, key: &str, score: f64, member: &str) -> Result<(), StateError> {
        let redis_key = self.render(key);
        let mut conn = self.conn().await?;
        let _: () = conn
            .zadd(&redis_key, member, score)
            .await
            .map_err(backend_err)?;
        Ok(())
    }

    async fn zrange(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>, StateError> {
        let redis_key = self.render(key);
        let mut conn = self.conn().await?;
        conn.zrange(&redis_key, start as isize, stop as isize)
            .await
            .map_err(backend_err)
    }

    async fn zrem(&self, key: &str, members: &[&str]) -> Result<u64, StateError> {
        let redis_key = self.render(key);
        let mut conn = self.conn().await?;
        conn.zrem(&redis_key, members).await.map_err(backend_err)
    }

    async fn sadd(&self, key: &str, member: &str) -> Result<bool, StateError> {
        let redis_key = self.render(key);
        let mut conn = self.conn().await?;
        let added: i64 = conn.sadd(&redis_key, member).await.map_err(backend_err)?;
        Ok(added > 0)
    }

    async fn srem(&self, key: &str, member: &str) -> Result<bool, StateError> {
        let redis_key = self.render(key);
        let mut conn = self.conn().await?;
        let removed: i64 = conn.srem(&redis_key, member).await.map_err(backend_err)?;
        Ok(removed > 0)
    }

    async fn sismember(&self, key: &str, member: &str) -> Result<bool, StateError> {
        let redis_key = self.render(key);
        let mut conn = self.conn().await?;
        conn.sismember(&redis_key, member).await.map_err(backend_err)
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>, StateError> {
        let redis_key = self.render(key);
        let mut conn = self.conn().await?;
        conn.smembers(&redis_key).await.map_err(backend_err)
    }
}

#[cfg(all(test, feature = "integration"))]
mod integration_tests {
    use super::*;

    fn test_config() -> RedisConfig {
        RedisConfig {
            url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),
            prefix: format!("waitingroom-test-{}", uuid::Uuid::new_v4()),
            ..RedisConfig::default()
        }
    }

    #[tokio::test]
    async fn store_conformance() {
        let config = test_config();
        let store = RedisStateStore::new(&config).expect("pool creation should succeed");
        waitingroom_state::testing::run_store_conformance_tests(&store)
            .await
            .expect("conformance tests should pass");
    }
}

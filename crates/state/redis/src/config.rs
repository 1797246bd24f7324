use std::time::Duration;

/// Configuration for the Redis state store backend.
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Redis connection URL (e.g. `redis://127.0.0.1:6379`).
    ///
    /// Use `rediss://` scheme for TLS connections. When `tls_enabled` is set,
    /// the URL scheme is automatically upgraded to `rediss://`.
    pub url: String,

    /// Key prefix applied to every Redis key. Empty by default so that keys
    /// on the wire match the bit-exact names the gateway documents; set this
    /// when sharing a Redis instance across multiple deployments.
    pub prefix: String,

    /// Number of connections in the `deadpool-redis` pool.
    pub pool_size: usize,

    /// Timeout for acquiring a pooled connection.
    pub connection_timeout: Duration,

    /// Whether TLS is enabled. When `true`, a `redis://` URL is automatically
    /// upgraded to `rediss://`.
    pub tls_enabled: bool,

    /// Accept invalid certificates (dev/test only). Only applies when using
    /// `rediss://` connections.
    pub tls_insecure: bool,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: String::from("redis://127.0.0.1:6379"),
            prefix: String::new(),
            pool_size: 10,
            connection_timeout: Duration::from_secs(5),
            tls_enabled: false,
            tls_insecure: false,
        }
    }
}

impl RedisConfig {
    /// Return the effective connection URL, upgrading to `rediss://` when TLS
    /// is enabled.
    #[must_use]
    pub fn effective_url(&self) -> String {
        if self.tls_enabled && self.url.starts_with("redis://") {
            self.url.replacen("redis://", "rediss://", 1)
        } else {
            self.url.clone()
        }
    }
}

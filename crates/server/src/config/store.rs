use serde::Deserialize;

fn default_backend() -> String {
    "memory".to_owned()
}

fn default_prefix() -> String {
    String::new()
}

/// `[store]`: selects and configures the shared key-value backend.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// `"memory"` or `"redis"`.
    pub backend: String,
    /// Connection string, only consulted when `backend = "redis"`.
    pub url: Option<String>,
    /// Key prefix applied to every store key (multi-tenant deployments).
    pub prefix: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            url: None,
            prefix: default_prefix(),
        }
    }
}

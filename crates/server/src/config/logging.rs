use serde::Deserialize;

/// `[logging]`: optional filter override.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Explicit `tracing_subscriber::EnvFilter` directive string, overriding
    /// `RUST_LOG` when set.
    pub filter: Option<String>,
}

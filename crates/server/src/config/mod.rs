//! Layered TOML configuration (spec §10.3): every field defaults so an empty
//! or absent file still produces a fully functional configuration.

mod logging;
mod queue;
mod server;
mod store;
mod whitelist;

pub use logging::LoggingConfig;
pub use queue::QueueFileConfig;
pub use server::ServerConfig;
pub use store::StoreConfig;
pub use whitelist::WhitelistConfig;

use serde::Deserialize;

/// Top-level configuration for `waitingroom-server`, assembled from its
/// per-concern sections.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WaitingRoomConfig {
    pub store: StoreConfig,
    pub queue: QueueFileConfig,
    pub server: ServerConfig,
    pub whitelist: WhitelistConfig,
    pub logging: LoggingConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_deserializes_with_defaults() {
        let config: WaitingRoomConfig = toml::from_str("").unwrap();
        assert_eq!(config.store.backend, "memory");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.queue.permit_unit_number, 1000);
        assert!(config.whitelist.domains.is_empty());
        assert!(config.logging.filter.is_none());
    }

    #[test]
    fn partial_toml_overrides_only_named_fields() {
        let config: WaitingRoomConfig = toml::from_str(
            r#"
            [store]
            backend = "redis"
            url = "redis://localhost:6379"

            [queue]
            permit_unit_number = 50

            [whitelist]
            domains = ["trusted.example"]
            "#,
        )
        .unwrap();

        assert_eq!(config.store.backend, "redis");
        assert_eq!(config.store.url.as_deref(), Some("redis://localhost:6379"));
        assert_eq!(config.queue.permit_unit_number, 50);
        assert_eq!(config.queue.entry_delay_sec, 10, "untouched field keeps its default");
        assert_eq!(config.whitelist.domains, vec!["trusted.example".to_owned()]);
    }
}

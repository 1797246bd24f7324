use std::time::Duration;

use serde::Deserialize;

use waitingroom_core::config::QueueConfig;

fn default_client_polling_interval_sec() -> u64 {
    60
}
fn default_permitted_access_sec() -> u64 {
    600
}
fn default_cache_ttl_sec() -> u64 {
    20
}
fn default_negative_cache_ttl_sec() -> u64 {
    10
}
fn default_entry_delay_sec() -> u64 {
    10
}
fn default_queue_enable_sec() -> u64 {
    300
}
fn default_permit_interval_sec() -> u64 {
    60
}
fn default_permit_unit_number() -> i64 {
    1000
}
fn default_enable_token() -> String {
    "enable".to_owned()
}

/// `[queue]`: the eight tunables of spec §6, plus the enable token.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueueFileConfig {
    pub client_polling_interval_sec: u64,
    pub permitted_access_sec: u64,
    pub cache_ttl_sec: u64,
    pub negative_cache_ttl_sec: u64,
    pub entry_delay_sec: u64,
    pub queue_enable_sec: u64,
    pub permit_interval_sec: u64,
    pub permit_unit_number: i64,
    pub enable_token: String,
}

impl Default for QueueFileConfig {
    fn default() -> Self {
        Self {
            client_polling_interval_sec: default_client_polling_interval_sec(),
            permitted_access_sec: default_permitted_access_sec(),
            cache_ttl_sec: default_cache_ttl_sec(),
            negative_cache_ttl_sec: default_negative_cache_ttl_sec(),
            entry_delay_sec: default_entry_delay_sec(),
            queue_enable_sec: default_queue_enable_sec(),
            permit_interval_sec: default_permit_interval_sec(),
            permit_unit_number: default_permit_unit_number(),
            enable_token: default_enable_token(),
        }
    }
}

impl QueueFileConfig {
    /// Convert into the runtime [`QueueConfig`] the core crate operates on.
    #[must_use]
    pub fn to_queue_config(&self) -> QueueConfig {
        QueueConfig {
            client_polling_interval: Duration::from_secs(self.client_polling_interval_sec),
            permitted_access: Duration::from_secs(self.permitted_access_sec),
            cache_ttl: Duration::from_secs(self.cache_ttl_sec),
            negative_cache_ttl: Duration::from_secs(self.negative_cache_ttl_sec),
            entry_delay: Duration::from_secs(self.entry_delay_sec),
            queue_enable_ttl: Duration::from_secs(self.queue_enable_sec),
            permit_interval: Duration::from_secs(self.permit_interval_sec),
            permit_unit_number: self.permit_unit_number,
            enable_token: self.enable_token.clone(),
        }
    }
}

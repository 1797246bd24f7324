//! The eight tunables spec §6 names, plus the enable-token used by
//! [`crate::site`]'s enablement check. Backend-agnostic: no serde here, the
//! server crate's `[queue]` config section maps onto this.

use std::time::Duration;

/// Runtime configuration for a [`crate::site::Site`] and its caches.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Polling hint handed to waiting/enrolling clients.
    pub client_polling_interval: Duration,
    /// `MaxAge` applied to a permit cookie.
    pub permitted_access: Duration,
    /// Cache TTL for positive (hit) entries.
    pub cache_ttl: Duration,
    /// Cache TTL for negative (miss) entries.
    pub negative_cache_ttl: Duration,
    /// Delay between enrollment and first eligibility to claim a serial number.
    pub entry_delay: Duration,
    /// TTL applied to the `enabled` flag and the `allow_no` watermark.
    pub queue_enable_ttl: Duration,
    /// Period between `AccessController` cycles.
    pub permit_interval: Duration,
    /// Amount the allowed-number watermark advances each cycle.
    pub permit_unit_number: i64,
    /// The `:enable` path segment value that triggers `Site::enable`.
    pub enable_token: String,
}

impl QueueConfig {
    /// TTL for the `lock_allow_no` distributed lock: `PermitIntervalSec - 1`,
    /// so the lease always expires before the next cycle would contend on it.
    #[must_use]
    pub fn lock_ttl(&self) -> Duration {
        self.permit_interval
            .saturating_sub(Duration::from_secs(1))
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            client_polling_interval: Duration::from_secs(60),
            permitted_access: Duration::from_secs(600),
            cache_ttl: Duration::from_secs(20),
            negative_cache_ttl: Duration::from_secs(10),
            entry_delay: Duration::from_secs(10),
            queue_enable_ttl: Duration::from_secs(300),
            permit_interval: Duration::from_secs(60),
            permit_unit_number: 1000,
            enable_token: "enable".to_owned(),
        }
    }
}

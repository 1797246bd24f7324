//! Per-domain queue state machine (spec §4.3): enabled flag, serial counter,
//! allowed-number watermark, and the distributed advancement lock, all held
//! in the shared [`StateStore`] and fronted by the process-local [`Cache`].

use std::sync::Arc;

use waitingroom_state::{StateError, StateStore};

use crate::cache::{Cache, CacheKey, CacheLookup, CacheValue};
use crate::config::QueueConfig;
use crate::time::unix_now;

/// Sorted-set key holding every currently-enabled domain, scored by the
/// unix time it was last (re-)enabled.
pub const ENABLED_DOMAINS_KEY: &str = "enable_domains";

/// Bit-exact store key names (spec §6).
pub mod keys {
    /// Per-domain `enabled` flag, value `"1"`.
    #[must_use]
    pub fn enabled(domain: &str) -> String {
        domain.to_owned()
    }

    /// Per-domain monotonic serial counter.
    #[must_use]
    pub fn current_number(domain: &str) -> String {
        format!("{domain}_current_no")
    }

    /// Per-domain allowed-number watermark.
    #[must_use]
    pub fn allowed_number(domain: &str) -> String {
        format!("{domain}_allow_no")
    }

    /// Per-domain advancement lock.
    #[must_use]
    pub fn lock_allow_no(domain: &str) -> String {
        format!("{domain}_lock_allow_no")
    }
}

/// A handle onto one domain's queue state in the shared store.
///
/// Cheap to construct — it borrows the store and cache by `Arc` and holds no
/// state of its own beyond the domain name and a config snapshot.
pub struct Site {
    store: Arc<dyn StateStore>,
    cache: Arc<Cache>,
    config: QueueConfig,
    domain: String,
}

impl Site {
    #[must_use]
    pub fn new(
        store: Arc<dyn StateStore>,
        cache: Arc<Cache>,
        config: QueueConfig,
        domain: impl Into<String>,
    ) -> Self {
        Self {
            store,
            cache,
            config,
            domain: domain.into(),
        }
    }

    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Whether the domain's queue is enabled. If `use_cache`, a cached
    /// answer (positive or negative) short-circuits the store read.
    ///
    /// # Errors
    ///
    /// Propagates any [`StateError`] from the underlying store.
    pub async fn is_enabled(&self, use_cache: bool) -> Result<bool, StateError> {
        let key = CacheKey::Enabled(self.domain.clone());
        if use_cache {
            match self.cache.get(&key) {
                CacheLookup::Hit(CacheValue::Bool(b)) => return Ok(b),
                CacheLookup::Miss => return Ok(false),
                _ => {}
            }
        }

        let present = self
            .store
            .get(&keys::enabled(&self.domain))
            .await?
            .is_some();
        if present {
            self.cache.set_bool(key, true, self.config.cache_ttl);
        } else {
            self.cache.set_miss(key, self.config.negative_cache_ttl);
        }
        Ok(present)
    }

    /// Enable this domain's queue: set the `enabled` flag with its TTL, add
    /// the domain to `EnabledDomains` with score = now, and refresh that
    /// set's TTL.
    ///
    /// # Errors
    ///
    /// Propagates any [`StateError`] from the underlying store.
    pub async fn enable(&self) -> Result<(), StateError> {
        self.store
            .set(
                &keys::enabled(&self.domain),
                "1",
                Some(self.config.queue_enable_ttl),
            )
            .await?;
        self.store
            .zadd(ENABLED_DOMAINS_KEY, unix_now() as f64, &self.domain)
            .await?;
        self.store
            .expire(ENABLED_DOMAINS_KEY, self.config.queue_enable_ttl * 2)
            .await?;
        self.cache.flush(&self.domain);
        Ok(())
    }

    /// Atomically increment and return the domain's serial counter.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::Backend`] if the counter would overflow, or
    /// propagates a [`StateError`] from the underlying store.
    pub async fn assign_serial_number(&self) -> Result<i64, StateError> {
        let key = keys::current_number(&self.domain);
        // TTL is only applied on first creation (spec §4.3); existence is
        // checked first so a long-lived counter isn't kept alive forever by
        // every subsequent increment re-arming its expiry.
        let existed = self.store.get(&key).await?.is_some();
        let ttl = if existed {
            None
        } else {
            Some(self.config.queue_enable_ttl * 2)
        };
        let value = self.store.incr_by(&key, 1, ttl).await?;
        if value < 0 {
            return Err(StateError::Backend(format!(
                "current_number overflowed for domain {}",
                self.domain
            )));
        }
        Ok(value)
    }

    /// The domain's allowed-number watermark, clamped to `current_number`
    /// (spec §4.3 tie-break: "no client could hold a higher serial").
    /// Returns 0 when absent.
    ///
    /// # Errors
    ///
    /// Propagates any [`StateError`] from the underlying store.
    pub async fn allowed_number(&self) -> Result<i64, StateError> {
        let key = CacheKey::AllowedNumber(self.domain.clone());
        match self.cache.get(&key) {
            CacheLookup::Hit(CacheValue::Number(n)) => return Ok(n),
            CacheLookup::Miss => return Ok(0),
            _ => {}
        }

        let raw = self.store.get(&keys::allowed_number(&self.domain)).await?;
        let Some(raw) = raw else {
            self.cache.set_miss(key, self.config.negative_cache_ttl);
            return Ok(0);
        };
        let allowed: i64 = raw.parse().unwrap_or(0);
        let clamped = self.clamp_to_current(allowed).await?;
        self.cache.set_number(key, clamped, self.config.cache_ttl);
        Ok(clamped)
    }

    async fn clamp_to_current(&self, allowed: i64) -> Result<i64, StateError> {
        let current = self
            .store
            .get(&keys::current_number(&self.domain))
            .await?
            .and_then(|s| s.parse::<i64>().ok())
            .unwrap_or(0);
        Ok(allowed.min(current))
    }

    async fn allowed_number_uncached(&self) -> Result<i64, StateError> {
        Ok(self
            .store
            .get(&keys::allowed_number(&self.domain))
            .await?
            .and_then(|s| s.parse::<i64>().ok())
            .unwrap_or(0))
    }

    /// Attempt to advance the allowed-number watermark by `unit` under the
    /// per-domain lock. Returns `(current_or_new_allowed, advanced)`.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::Backend`] if the watermark would overflow, or
    /// propagates a [`StateError`] from the underlying store.
    pub async fn advance_allowed_number_under_lock(
        &self,
        unit: i64,
    ) -> Result<(i64, bool), StateError> {
        let acquired = self
            .store
            .set_nx(
                &keys::lock_allow_no(&self.domain),
                "1",
                Some(self.config.lock_ttl()),
            )
            .await?;
        if !acquired {
            return Ok((self.allowed_number_uncached().await?, false));
        }

        let current = self.allowed_number_uncached().await?;
        let next = current.checked_add(unit).ok_or_else(|| {
            StateError::Backend(format!(
                "allow_no overflowed for domain {} while advancing by {unit}",
                self.domain
            ))
        })?;
        self.store
            .set(
                &keys::allowed_number(&self.domain),
                &next.to_string(),
                Some(self.config.queue_enable_ttl),
            )
            .await?;
        self.cache.flush(&self.domain);
        Ok((next, true))
    }

    /// Delete every key belonging to this domain and remove it from
    /// `EnabledDomains`.
    ///
    /// # Errors
    ///
    /// Propagates any [`StateError`] from the underlying store.
    pub async fn reset(&self) -> Result<(), StateError> {
        let enabled_key = keys::enabled(&self.domain);
        let current_key = keys::current_number(&self.domain);
        let allowed_key = keys::allowed_number(&self.domain);
        let lock_key = keys::lock_allow_no(&self.domain);
        self.store
            .del(&[
                enabled_key.as_str(),
                current_key.as_str(),
                allowed_key.as_str(),
                lock_key.as_str(),
            ])
            .await?;
        self.store
            .zrem(ENABLED_DOMAINS_KEY, &[self.domain.as_str()])
            .await?;
        self.cache.flush(&self.domain);
        Ok(())
    }

    /// Invalidate every [`Cache`] entry tagged with this domain.
    pub fn flush_cache(&self) {
        self.cache.flush(&self.domain);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use waitingroom_state_memory::MemoryStateStore;

    use super::*;

    fn site(domain: &str) -> Site {
        Site::new(
            Arc::new(MemoryStateStore::new()),
            Arc::new(Cache::new()),
            QueueConfig::default(),
            domain,
        )
    }

    #[tokio::test]
    async fn disabled_by_default() {
        let site = site("shop.example");
        assert!(!site.is_enabled(false).await.unwrap());
        assert_eq!(site.allowed_number().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn enable_adds_to_enabled_domains() {
        let store = Arc::new(MemoryStateStore::new());
        let site = Site::new(
            store.clone(),
            Arc::new(Cache::new()),
            QueueConfig::default(),
            "shop.example",
        );
        site.enable().await.unwrap();
        assert!(site.is_enabled(false).await.unwrap());

        let members = store.zrange(ENABLED_DOMAINS_KEY, 0, -1).await.unwrap();
        assert_eq!(members, vec!["shop.example".to_owned()]);
    }

    #[tokio::test]
    async fn serial_numbers_are_strictly_monotonic() {
        let site = site("shop.example");
        let a = site.assign_serial_number().await.unwrap();
        let b = site.assign_serial_number().await.unwrap();
        let c = site.assign_serial_number().await.unwrap();
        assert_eq!((a, b, c), (1, 2, 3));
    }

    #[tokio::test]
    async fn allowed_number_is_clamped_to_current() {
        let store = Arc::new(MemoryStateStore::new());
        let site = Site::new(
            store.clone(),
            Arc::new(Cache::new()),
            QueueConfig::default(),
            "shop.example",
        );
        site.assign_serial_number().await.unwrap();
        store
            .set("shop.example_allow_no", "9999", None)
            .await
            .unwrap();

        assert_eq!(site.allowed_number().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn advance_under_lock_starts_from_zero_and_increments_by_unit() {
        let site = site("shop.example");
        let (allowed, advanced) = site.advance_allowed_number_under_lock(1000).await.unwrap();
        assert!(advanced);
        assert_eq!(allowed, 1000);
        assert_eq!(site.allowed_number().await.unwrap(), 1000);
    }

    #[tokio::test]
    async fn second_concurrent_advance_is_lock_contended() {
        let store = Arc::new(MemoryStateStore::new());
        let cache = Arc::new(Cache::new());
        let a = Site::new(
            store.clone(),
            cache.clone(),
            QueueConfig::default(),
            "shop.example",
        );
        let b = Site::new(store, cache, QueueConfig::default(), "shop.example");

        let (allowed_a, advanced_a) = a.advance_allowed_number_under_lock(1000).await.unwrap();
        let (allowed_b, advanced_b) = b.advance_allowed_number_under_lock(1000).await.unwrap();

        assert!(advanced_a);
        assert!(!advanced_b);
        assert_eq!(allowed_a, 1000);
        assert_eq!(allowed_b, 1000, "contended caller observes the winner's value");
    }

    #[tokio::test]
    async fn reset_clears_every_key_and_enabled_domains_membership() {
        let store = Arc::new(MemoryStateStore::new());
        let site = Site::new(
            store.clone(),
            Arc::new(Cache::new()),
            QueueConfig::default(),
            "shop.example",
        );
        site.enable().await.unwrap();
        site.assign_serial_number().await.unwrap();
        site.advance_allowed_number_under_lock(1000).await.unwrap();

        site.reset().await.unwrap();

        assert!(!site.is_enabled(false).await.unwrap());
        assert_eq!(site.allowed_number().await.unwrap(), 0);
        let members = store.zrange(ENABLED_DOMAINS_KEY, 0, -1).await.unwrap();
        assert!(members.is_empty());
    }

    #[tokio::test]
    async fn advance_detects_overflow() {
        let store = Arc::new(MemoryStateStore::new());
        store
            .set("shop.example_allow_no", &i64::MAX.to_string(), None)
            .await
            .unwrap();
        let site = Site::new(
            store,
            Arc::new(Cache::new()),
            QueueConfig::default(),
            "shop.example",
        );

        let result = site.advance_allowed_number_under_lock(1).await;
        assert!(result.is_err());
    }
}

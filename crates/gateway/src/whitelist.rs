//! Whitelist membership (spec §3/§4.4 step 2): a whitelisted domain bypasses
//! all queue logic. Membership is plain [`StateStore`] set membership with
//! no TTL — spec §9 open question (a) treats the whitelist as non-expiring;
//! only the process-local [`Cache`] entries over it carry a TTL.

use std::sync::Arc;

use waitingroom_core::{Cache, CacheKey, CacheLookup, CacheValue, QueueConfig};
use waitingroom_state::{StateError, StateStore};

/// Set key holding every whitelisted domain.
pub const WHITELIST_KEY: &str = "whitelist";

/// A handle onto the shared whitelist set, fronted by the process cache.
pub struct Whitelist {
    store: Arc<dyn StateStore>,
    cache: Arc<Cache>,
    config: QueueConfig,
}

impl Whitelist {
    #[must_use]
    pub fn new(store: Arc<dyn StateStore>, cache: Arc<Cache>, config: QueueConfig) -> Self {
        Self {
            store,
            cache,
            config,
        }
    }

    /// Whether `domain` is whitelisted.
    ///
    /// # Errors
    ///
    /// Propagates any [`StateError`] from the underlying store.
    pub async fn contains(&self, domain: &str) -> Result<bool, StateError> {
        let key = CacheKey::Whitelist(domain.to_owned());
        match self.cache.get(&key) {
            CacheLookup::Hit(CacheValue::Bool(b)) => return Ok(b),
            CacheLookup::Miss => return Ok(false),
            _ => {}
        }

        let present = self.store.sismember(WHITELIST_KEY, domain).await?;
        if present {
            self.cache.set_bool(key, true, self.config.cache_ttl);
        } else {
            self.cache.set_miss(key, self.config.negative_cache_ttl);
        }
        Ok(present)
    }

    /// Add `domain` to the whitelist. Returns `true` if it was newly added.
    ///
    /// # Errors
    ///
    /// Propagates any [`StateError`] from the underlying store.
    pub async fn add(&self, domain: &str) -> Result<bool, StateError> {
        let added = self.store.sadd(WHITELIST_KEY, domain).await?;
        self.cache.flush(domain);
        Ok(added)
    }

    /// Remove `domain` from the whitelist. Returns `true` if it was present.
    ///
    /// # Errors
    ///
    /// Propagates any [`StateError`] from the underlying store.
    pub async fn remove(&self, domain: &str) -> Result<bool, StateError> {
        let removed = self.store.srem(WHITELIST_KEY, domain).await?;
        self.cache.flush(domain);
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use waitingroom_state_memory::MemoryStateStore;

    use super::*;

    #[tokio::test]
    async fn add_then_contains() {
        let whitelist = Whitelist::new(
            Arc::new(MemoryStateStore::new()),
            Arc::new(Cache::new()),
            QueueConfig::default(),
        );
        assert!(!whitelist.contains("shop.example").await.unwrap());
        assert!(whitelist.add("shop.example").await.unwrap());
        assert!(whitelist.contains("shop.example").await.unwrap());
    }

    #[tokio::test]
    async fn remove_clears_membership_and_cache() {
        let whitelist = Whitelist::new(
            Arc::new(MemoryStateStore::new()),
            Arc::new(Cache::new()),
            QueueConfig::default(),
        );
        whitelist.add("shop.example").await.unwrap();
        assert!(whitelist.contains("shop.example").await.unwrap());

        assert!(whitelist.remove("shop.example").await.unwrap());
        assert!(!whitelist.contains("shop.example").await.unwrap());
    }
}

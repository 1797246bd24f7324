//! Process-local, advisory cache for hot store reads (spec §4.1).
//!
//! Every entry carries its own expiry; a read past that deadline is treated
//! exactly like a miss, so there is no background sweeper to run or forget
//! to run. Callers are responsible for never trusting the cache as the
//! source of truth — see [`crate::site::Site`], which always bypasses it
//! before a reset.

use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

/// Identifies one cached fact about a domain.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Whether the domain's queue is currently enabled.
    Enabled(String),
    /// The domain's allowed-number watermark.
    AllowedNumber(String),
    /// Whether the domain is in the whitelist.
    Whitelist(String),
}

impl CacheKey {
    fn domain(&self) -> &str {
        match self {
            Self::Enabled(d) | Self::AllowedNumber(d) | Self::Whitelist(d) => d,
        }
    }
}

/// A cached value, for the kinds of reads this cache fronts.
#[derive(Debug, Clone, Copy)]
pub enum CacheValue {
    Bool(bool),
    Number(i64),
}

/// Result of a cache lookup.
#[derive(Debug, Clone, Copy)]
pub enum CacheLookup {
    /// A live positive entry.
    Hit(CacheValue),
    /// A live negative entry: the underlying store read came back absent.
    Miss,
    /// No entry, or an expired one. Caller must go to the store.
    Absent,
}

#[derive(Debug, Clone, Copy)]
enum Stored {
    Value(CacheValue),
    Miss,
}

#[derive(Debug)]
struct Entry {
    stored: Stored,
    expires_at: Instant,
}

/// A concurrent map of [`CacheKey`] to `{value, expires_at}`, safe for
/// simultaneous access from many request tasks and the background
/// `AccessController`.
#[derive(Debug, Default)]
pub struct Cache {
    entries: DashMap<CacheKey, Entry>,
}

impl Cache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up `key`, treating an expired entry as [`CacheLookup::Absent`].
    #[must_use]
    pub fn get(&self, key: &CacheKey) -> CacheLookup {
        match self.entries.get(key) {
            Some(entry) if Instant::now() < entry.expires_at => match entry.stored {
                Stored::Value(v) => CacheLookup::Hit(v),
                Stored::Miss => CacheLookup::Miss,
            },
            _ => CacheLookup::Absent,
        }
    }

    /// Record a positive boolean entry.
    pub fn set_bool(&self, key: CacheKey, value: bool, ttl: Duration) {
        self.set(key, CacheValue::Bool(value), ttl);
    }

    /// Record a positive numeric entry.
    pub fn set_number(&self, key: CacheKey, value: i64, ttl: Duration) {
        self.set(key, CacheValue::Number(value), ttl);
    }

    fn set(&self, key: CacheKey, value: CacheValue, ttl: Duration) {
        self.entries.insert(
            key,
            Entry {
                stored: Stored::Value(value),
                expires_at: Instant::now() + ttl,
            },
        );
    }

    /// Record a negative (miss) entry, so repeated misses don't stampede the store.
    pub fn set_miss(&self, key: CacheKey, ttl: Duration) {
        self.entries.insert(
            key,
            Entry {
                stored: Stored::Miss,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    /// Invalidate every entry tagged with `domain`. Called by the
    /// `AccessController` before it evaluates a domain, and by `Site::reset`.
    pub fn flush(&self, domain: &str) {
        self.entries.retain(|k, _| k.domain() != domain);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn hit_then_expiry_falls_back_to_absent() {
        let cache = Cache::new();
        let key = CacheKey::Enabled("shop.example".to_owned());
        cache.set_bool(key.clone(), true, Duration::from_secs(5));

        assert!(matches!(
            cache.get(&key),
            CacheLookup::Hit(CacheValue::Bool(true))
        ));

        tokio::time::advance(Duration::from_secs(6)).await;
        assert!(matches!(cache.get(&key), CacheLookup::Absent));
    }

    #[tokio::test]
    async fn miss_entries_are_distinguished_from_absent() {
        let cache = Cache::new();
        let key = CacheKey::AllowedNumber("shop.example".to_owned());
        assert!(matches!(cache.get(&key), CacheLookup::Absent));

        cache.set_miss(key.clone(), Duration::from_secs(10));
        assert!(matches!(cache.get(&key), CacheLookup::Miss));
    }

    #[test]
    fn flush_only_clears_matching_domain() {
        let cache = Cache::new();
        cache.set_bool(
            CacheKey::Enabled("a.example".to_owned()),
            true,
            Duration::from_secs(30),
        );
        cache.set_bool(
            CacheKey::Enabled("b.example".to_owned()),
            true,
            Duration::from_secs(30),
        );

        cache.flush("a.example");

        assert!(matches!(
            cache.get(&CacheKey::Enabled("a.example".to_owned())),
            CacheLookup::Absent
        ));
        assert!(matches!(
            cache.get(&CacheKey::Enabled("b.example".to_owned())),
            CacheLookup::Hit(CacheValue::Bool(true))
        ));
    }
}

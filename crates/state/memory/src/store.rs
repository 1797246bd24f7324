use std::collections::BTreeMap;
use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry as MapEntry;
use tokio::time::Instant;

use waitingroom_state::StateError;
use waitingroom_state::StateStore;

/// The payload a key can hold. Mirrors the handful of Redis data types the
/// spec's Store contract needs: strings/counters, a sorted set, and a set.
#[derive(Debug, Clone)]
enum Value {
    Str(String),
    ZSet(BTreeMap<String, f64>),
    Set(HashSet<String>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|deadline| Instant::now() >= deadline)
    }
}

fn expiry_from_ttl(ttl: Option<Duration>) -> Option<Instant> {
    ttl.map(|d| Instant::now() + d)
}

/// In-memory [`StateStore`] backed by a [`DashMap`].
///
/// Entries are lazily evicted on read when their TTL has elapsed. Useful for
/// local development, component tests of `Site`/`QueueHandler`/`AccessController`
/// without network I/O, and single-replica deployments.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    data: DashMap<String, Entry>,
}

impl MemoryStateStore {
    /// Create a new, empty in-memory state store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove the entry at `key` if it has expired, treating it as absent.
    fn evict_if_expired(&self, key: &str) {
        self.data.remove_if(key, |_, entry| entry.is_expired());
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn incr_by(
        &self,
        key: &str,
        delta: i64,
        ttl: Option<Duration>,
    ) -> Result<i64, StateError> {
        self.evict_if_expired(key);
        let expires_at = expiry_from_ttl(ttl);

        let mut entry = self.data.entry(key.to_owned()).or_insert_with(|| Entry {
            value: Value::Str("0".to_owned()),
            expires_at,
        });

        let Value::Str(ref mut s) = entry.value else {
            return Err(StateError::Backend(format!(
                "key {key} does not hold a counter"
            )));
        };
        let current: i64 = s
            .parse()
            .map_err(|e: std::num::ParseIntError| StateError::Backend(format!("{key}: {e}")))?;
        let new_value = current.checked_add(delta).ok_or_else(|| {
            StateError::Backend(format!("counter at key {key} overflowed"))
        })?;
        *s = new_value.to_string();
        if let Some(ea) = expires_at {
            entry.expires_at = Some(ea);
        }
        Ok(new_value)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StateError> {
        self.evict_if_expired(key);
        match self.data.get(key) {
            Some(entry) => match &entry.value {
                Value::Str(s) => Ok(Some(s.clone())),
                _ => Err(StateError::Backend(format!("key {key} is not a string"))),
            },
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StateError> {
        self.data.insert(
            key.to_owned(),
            Entry {
                value: Value::Str(value.to_owned()),
                expires_at: expiry_from_ttl(ttl),
            },
        );
        Ok(())
    }

    async fn set_nx(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<bool, StateError> {
        self.evict_if_expired(key);
        match self.data.entry(key.to_owned()) {
            MapEntry::Occupied(_) => Ok(false),
            MapEntry::Vacant(vacant) => {
                vacant.insert(Entry {
                    value: Value::Str(value.to_owned()),
                    expires_at: expiry_from_ttl(ttl),
                });
                Ok(true)
            }
        }
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), StateError> {
        if let Some(mut entry) = self.data.get_mut(key) {
            entry.expires_at = Some(Instant::now() + ttl);
        }
        Ok(())
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, StateError> {
        self.evict_if_expired(key);
        Ok(self.data.get(key).and_then(|entry| {
            entry
                .expires_at
                .map(|deadline| deadline.saturating_duration_since(Instant::now()))
        }))
    }

    async fn del(&self, keys: &[&str]) -> Result<u64, StateError> {
        let mut removed = 0u64;
        for key in keys {
            if let Some((_, entry)) = self.data.remove(*key) {
                if !entry.is_expired() {
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }

    async fn zadd(&self, key: &str, score: f64, member: &str) -> Result<(), StateError> {
        self.evict_if_expired(key);
        let mut entry = self.data.entry(key.to_owned()).or_insert_with(|| Entry {
            value: Value::ZSet(BTreeMap::new()),
            expires_at: None,
        });
        let Value::ZSet(ref mut set) = entry.value else {
            return Err(StateError::Backend(format!(
                "key {key} is not a sorted set"
            )));
        };
        set.insert(member.to_owned(), score);
        Ok(())
    }

    async fn zrange(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>, StateError> {
        self.evict_if_expired(key);
        let Some(entry) = self.data.get(key) else {
            return Ok(Vec::new());
        };
        let Value::ZSet(ref set) = entry.value else {
            return Err(StateError::Backend(format!(
                "key {key} is not a sorted set"
            )));
        };
        let mut members: Vec<(&String, &f64)> = set.iter().collect();
        members.sort_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal).then_with(|| a.0.cmp(b.0)));
        let ordered: Vec<String> = members.into_iter().map(|(m, _)| m.clone()).collect();
        Ok(slice_redis_range(&ordered, start, stop))
    }

    async fn zrem(&self, key: &str, members: &[&str]) -> Result<u64, StateError> {
        let Some(mut entry) = self.data.get_mut(key) else {
            return Ok(0);
        };
        let Value::ZSet(ref mut set) = entry.value else {
            return Err(StateError::Backend(format!(
                "key {key} is not a sorted set"
            )));
        };
        let mut removed = 0u64;
        for m in members {
            if set.remove(*m).is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn sadd(&self, key: &str, member: &str) -> Result<bool, StateError> {
        self.evict_if_expired(key);
        let mut entry = self.data.entry(key.to_owned()).or_insert_with(|| Entry {
            value: Value::Set(HashSet::new()),
            expires_at: None,
        });
        let Value::Set(ref mut set) = entry.value else {
            return Err(StateError::Backend(format!("key {key} is not a set")));
        };
        Ok(set.insert(member.to_owned()))
    }

    async fn srem(&self, key: &str, member: &str) -> Result<bool, StateError> {
        let Some(mut entry) = self.data.get_mut(key) else {
            return Ok(false);
        };
        let Value::Set(ref mut set) = entry.value else {
            return Err(StateError::Backend(format!("key {key} is not a set")));
        };
        Ok(set.remove(member))
    }

    async fn sismember(&self, key: &str, member: &str) -> Result<bool, StateError> {
        self.evict_if_expired(key);
        match self.data.get(key) {
            Some(entry) => match &entry.value {
                Value::Set(set) => Ok(set.contains(member)),
                _ => Err(StateError::Backend(format!("key {key} is not a set"))),
            },
            None => Ok(false),
        }
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>, StateError> {
        self.evict_if_expired(key);
        match self.data.get(key) {
            Some(entry) => match &entry.value {
                Value::Set(set) => Ok(set.iter().cloned().collect()),
                _ => Err(StateError::Backend(format!("key {key} is not a set"))),
            },
            None => Ok(Vec::new()),
        }
    }
}

/// Apply Redis-style `ZRANGE` index semantics (0-based, inclusive, negative
/// indices count from the end) to an already-ordered slice.
fn slice_redis_range(ordered: &[String], start: i64, stop: i64) -> Vec<String> {
    let len = ordered.len() as i64;
    if len == 0 {
        return Vec::new();
    }
    let normalize = |i: i64| -> i64 {
        if i < 0 { (len + i).max(0) } else { i }
    };
    let start = normalize(start).min(len - 1).max(0);
    let stop = normalize(stop).min(len - 1);
    if stop < start {
        return Vec::new();
    }
    ordered[start as usize..=stop as usize].to_vec()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use waitingroom_state::testing::run_store_conformance_tests;

    use super::*;

    #[tokio::test]
    async fn conformance() {
        let store = MemoryStateStore::new();
        run_store_conformance_tests(&store)
            .await
            .expect("conformance tests should pass");
    }

    #[tokio::test(start_paused = true)]
    async fn ttl_expiry_via_get() {
        let store = MemoryStateStore::new();
        store
            .set("shop.example", "1", Some(Duration::from_secs(5)))
            .await
            .unwrap();

        let val = store.get("shop.example").await.unwrap();
        assert_eq!(val.as_deref(), Some("1"));

        tokio::time::advance(Duration::from_secs(6)).await;

        let val = store.get("shop.example").await.unwrap();
        assert!(val.is_none(), "value should be expired");
    }

    #[tokio::test(start_paused = true)]
    async fn set_nx_after_expiry_succeeds() {
        let store = MemoryStateStore::new();
        let key = "shop.example_lock_allow_no";

        let acquired = store
            .set_nx(key, "held", Some(Duration::from_secs(3)))
            .await
            .unwrap();
        assert!(acquired);

        let contended = store.set_nx(key, "held-again", None).await.unwrap();
        assert!(!contended);

        tokio::time::advance(Duration::from_secs(4)).await;

        let acquired_again = store.set_nx(key, "held-2", None).await.unwrap();
        assert!(acquired_again, "lock should be acquirable once it has expired");
    }

    #[tokio::test]
    async fn incr_is_monotonic() {
        let store = MemoryStateStore::new();
        let a = store.incr("shop.example_current_no", None).await.unwrap();
        let b = store.incr("shop.example_current_no", None).await.unwrap();
        let c = store.incr("shop.example_current_no", None).await.unwrap();
        assert_eq!((a, b, c), (1, 2, 3));
    }

    #[tokio::test]
    async fn zrange_orders_by_score_then_member() {
        let store = MemoryStateStore::new();
        store.zadd("enable_domains", 100.0, "b.example").await.unwrap();
        store.zadd("enable_domains", 50.0, "a.example").await.unwrap();
        store.zadd("enable_domains", 50.0, "aa.example").await.unwrap();

        let all = store.zrange("enable_domains", 0, -1).await.unwrap();
        assert_eq!(all, vec!["a.example", "aa.example", "b.example"]);
    }

    #[tokio::test]
    async fn del_counts_only_existing_keys() {
        let store = MemoryStateStore::new();
        store.set("a", "1", None).await.unwrap();
        let removed = store.del(&["a", "missing"]).await.unwrap();
        assert_eq!(removed, 1);
    }
}

//! Shared conformance test suite for [`StateStore`](crate::StateStore) implementations.
//!
//! Run this against every backend (`waitingroom-state-memory`,
//! `waitingroom-state-redis`) so new backends cannot silently diverge on the
//! operations the gateway relies on.

use std::time::Duration;

use crate::error::StateError;
use crate::store::StateStore;

/// Run the full store conformance test suite against a fresh store instance.
///
/// # Errors
///
/// Returns an error if any conformance check fails.
pub async fn run_store_conformance_tests(store: &dyn StateStore) -> Result<(), StateError> {
    test_get_missing(store).await?;
    test_set_then_get(store).await?;
    test_set_nx_refuses_second_writer(store).await?;
    test_incr_creates_and_persists(store).await?;
    test_del_reports_existing_count(store).await?;
    test_expire_and_ttl(store).await?;
    test_sorted_set_add_range_remove(store).await?;
    test_set_add_member_remove(store).await?;
    test_incr_by_overflow_is_an_error(store).await?;
    Ok(())
}

async fn test_get_missing(store: &dyn StateStore) -> Result<(), StateError> {
    let val = store.get("conformance:missing").await?;
    assert!(val.is_none(), "get on a missing key should return None");
    Ok(())
}

async fn test_set_then_get(store: &dyn StateStore) -> Result<(), StateError> {
    store.set("conformance:set-get", "hello", None).await?;
    let val = store.get("conformance:set-get").await?;
    assert_eq!(val.as_deref(), Some("hello"));
    Ok(())
}

async fn test_set_nx_refuses_second_writer(store: &dyn StateStore) -> Result<(), StateError> {
    let key = "conformance:set-nx";
    let first = store.set_nx(key, "v1", None).await?;
    assert!(first, "first SETNX should succeed");
    let second = store.set_nx(key, "v2", None).await?;
    assert!(!second, "second SETNX should be refused");
    let val = store.get(key).await?;
    assert_eq!(val.as_deref(), Some("v1"), "value from the first writer wins");
    Ok(())
}

async fn test_incr_creates_and_persists(store: &dyn StateStore) -> Result<(), StateError> {
    let key = "conformance:incr";
    let first = store.incr(key, None).await?;
    assert_eq!(first, 1, "first increment creates the counter at zero");
    let second = store.incr_by(key, 9, None).await?;
    assert_eq!(second, 10);
    Ok(())
}

async fn test_del_reports_existing_count(store: &dyn StateStore) -> Result<(), StateError> {
    store.set("conformance:del-a", "x", None).await?;
    let removed = store
        .del(&["conformance:del-a", "conformance:del-missing"])
        .await?;
    assert_eq!(removed, 1);
    assert!(store.get("conformance:del-a").await?.is_none());
    Ok(())
}

async fn test_expire_and_ttl(store: &dyn StateStore) -> Result<(), StateError> {
    let key = "conformance:ttl";
    store.set(key, "v", Some(Duration::from_secs(30))).await?;
    let ttl = store.ttl(key).await?;
    assert!(ttl.is_some(), "a key set with a TTL should report one");
    assert!(ttl.unwrap() <= Duration::from_secs(30));

    store.set("conformance:no-ttl", "v", None).await?;
    let ttl = store.ttl("conformance:no-ttl").await?;
    assert!(ttl.is_none(), "a key set without a TTL should report none");
    Ok(())
}

async fn test_sorted_set_add_range_remove(store: &dyn StateStore) -> Result<(), StateError> {
    let key = "conformance:zset";
    store.zadd(key, 1.0, "a").await?;
    store.zadd(key, 2.0, "b").await?;
    store.zadd(key, 0.5, "c").await?;

    let members = store.zrange(key, 0, -1).await?;
    assert_eq!(
        members,
        vec!["c", "a", "b"],
        "zrange should return ascending-score order"
    );

    let removed = store.zrem(key, &["a"]).await?;
    assert_eq!(removed, 1);
    let members = store.zrange(key, 0, -1).await?;
    assert_eq!(members, vec!["c", "b"]);
    Ok(())
}

async fn test_incr_by_overflow_is_an_error(store: &dyn StateStore) -> Result<(), StateError> {
    let key = "conformance:incr-overflow";
    store.set(key, &i64::MAX.to_string(), None).await?;
    let result = store.incr_by(key, 1, None).await;
    assert!(
        result.is_err(),
        "incrementing past i64::MAX should error rather than panic or wrap"
    );
    Ok(())
}

async fn test_set_add_member_remove(store: &dyn StateStore) -> Result<(), StateError> {
    let key = "conformance:set";
    let added = store.sadd(key, "x").await?;
    assert!(added);
    let added_again = store.sadd(key, "x").await?;
    assert!(
        !added_again,
        "adding the same member twice should not report a new add"
    );

    assert!(store.sismember(key, "x").await?);
    assert!(!store.sismember(key, "y").await?);

    let mut members = store.smembers(key).await?;
    members.sort();
    assert_eq!(members, vec!["x".to_string()]);

    let removed = store.srem(key, "x").await?;
    assert!(removed);
    assert!(!store.sismember(key, "x").await?);
    Ok(())
}

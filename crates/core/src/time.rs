//! Wall-clock helpers. Kept to a single free function so call sites take
//! `now: i64` as a parameter instead of reading the clock themselves,
//! matching the rest of the core's "now is an input, not ambient" style —
//! tests can just pass a fixed value.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current unix time in whole seconds.
#[must_use]
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

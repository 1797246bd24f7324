//! Tracing subscriber initialization (spec §10.1): structured logging, no
//! OpenTelemetry export — this binary's ambient stack stays deliberately
//! simple (an env-filter plus an `fmt` layer).

use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber.
///
/// `override_filter` (from `[logging].filter`) takes precedence over
/// `RUST_LOG`; if neither is set, defaults to `info`.
pub fn init(override_filter: Option<&str>) {
    let filter = override_filter.map_or_else(
        || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        EnvFilter::new,
    );

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

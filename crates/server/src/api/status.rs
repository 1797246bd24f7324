use axum::extract::State;
use axum::http::StatusCode;

use super::AppState;

/// `GET /status` (spec §6): pings the store with a cheap read and returns
/// `200 "ok"` iff reachable, else `500`.
pub async fn status(State(state): State<AppState>) -> (StatusCode, &'static str) {
    match state.store.get("__waitingroom_status_probe").await {
        Ok(_) => (StatusCode::OK, "ok"),
        Err(e) => {
            tracing::warn!(error = %e, "status probe failed, store unreachable");
            (StatusCode::INTERNAL_SERVER_ERROR, "unavailable")
        }
    }
}

pub mod queues;
pub mod schemas;
pub mod status;

use std::sync::Arc;

use axum::Router;
use axum::http::HeaderName;
use axum::routing::get;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use waitingroom_core::config::QueueConfig;
use waitingroom_gateway::QueueHandler;

/// Header carrying the per-request id (spec §7's "request id" in handler-path
/// error logs), set at the edge of the router and propagated onto the
/// response.
pub(crate) const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Shared application state passed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub queue_handler: Arc<QueueHandler>,
    pub store: Arc<dyn waitingroom_state::StateStore>,
    pub queue_config: QueueConfig,
}

/// Build the Axum router (spec §4.7/§10.6).
///
/// CORS is intentionally not enabled: the waiting-room endpoint is
/// same-origin, fronted by the edge proxy the spec's Non-goals describe.
pub fn router(state: AppState) -> Router {
    let middleware = ServiceBuilder::new()
        .layer(SetRequestIdLayer::new(REQUEST_ID_HEADER, MakeRequestUuid))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::new(REQUEST_ID_HEADER));

    Router::new()
        .route("/status", get(status::status))
        .route("/queues/{domain}", get(queues::handle))
        .route("/queues/{domain}/{enable}", get(queues::handle_with_enable))
        .with_state(state)
        .layer(middleware)
}

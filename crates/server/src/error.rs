use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use waitingroom_gateway::GatewayError;

/// HTTP-level errors (spec §7/§10.2): maps the gateway's error taxonomy onto
/// status codes. `InvalidCookie` is not represented here — it's a normal
/// [`waitingroom_gateway::AdmissionOutcome`] branch handled inline by the
/// `/queues` handler, not a failure.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The shared store was unreachable (spec §7 `StoreUnavailable`).
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Malformed configuration; fatal at startup, never surfaced over HTTP.
    #[error("configuration error: {0}")]
    Config(String),

    /// Binding the listener or another I/O failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ServerError {
    /// The offending domain and request id are logged by the handler before
    /// the error reaches here (it still has both in scope); this only maps
    /// the already-logged failure onto a status code and body.
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Gateway(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

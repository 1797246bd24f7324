use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::Cookie;

use waitingroom_core::client::COOKIE_NAME;
use waitingroom_gateway::{AdmissionOutcome, CookieAction};

use super::{AppState, REQUEST_ID_HEADER};
use crate::api::schemas::AdmissionResponse;
use crate::error::ServerError;

/// `GET /queues/:domain` (spec §4.4/§6): admission decision with no enable
/// side-effect.
pub async fn handle(
    State(state): State<AppState>,
    Path(domain): Path<String>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Result<impl IntoResponse, ServerError> {
    respond(&state, &domain, None, &headers, jar).await
}

/// `GET /queues/:domain/:enable` (spec §4.4): the `:enable` path segment
/// triggers `Site::enable` when it matches the configured token.
pub async fn handle_with_enable(
    State(state): State<AppState>,
    Path((domain, enable_segment)): Path<(String, String)>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Result<impl IntoResponse, ServerError> {
    respond(&state, &domain, Some(&enable_segment), &headers, jar).await
}

async fn respond(
    state: &AppState,
    domain: &str,
    enable_segment: Option<&str>,
    headers: &HeaderMap,
    jar: CookieJar,
) -> Result<impl IntoResponse, ServerError> {
    let cookie_value = jar.get(COOKIE_NAME).map(|c| c.value().to_owned());
    let result = state
        .queue_handler
        .handle(domain, enable_segment, cookie_value.as_deref())
        .await
        .inspect_err(|e| {
            let request_id = headers
                .get(&REQUEST_ID_HEADER)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("-");
            tracing::error!(domain = %domain, request_id = %request_id, error = %e, "admission request failed");
        })?;

    let status = match result.outcome {
        AdmissionOutcome::InvalidCookie => StatusCode::BAD_REQUEST,
        _ => StatusCode::OK,
    };
    let body = AdmissionResponse::from_outcome(&result.outcome, &state.queue_config);

    let jar = match result.cookie {
        CookieAction::None => jar,
        CookieAction::Clear => {
            let cookie = Cookie::build((COOKIE_NAME, ""))
                .path("/")
                .domain(domain.to_owned())
                .secure(true)
                .http_only(true)
                .max_age(time::Duration::ZERO)
                .build();
            jar.add(cookie)
        }
        CookieAction::Set { value } => {
            let cookie = Cookie::build((COOKIE_NAME, value))
                .path("/")
                .domain(domain.to_owned())
                .secure(true)
                .http_only(true)
                .max_age(time::Duration::seconds(
                    i64::try_from(state.queue_config.permitted_access.as_secs()).unwrap_or(i64::MAX),
                ))
                .build();
            jar.add(cookie)
        }
    };

    Ok((status, jar, axum::Json(body)))
}

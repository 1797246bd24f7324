use thiserror::Error;

use waitingroom_state::StateError;

/// Errors surfaced by [`crate::queue_handler::QueueHandler`] and
/// [`crate::access_controller::AccessController`].
///
/// [`ClientError`](waitingroom_core::ClientError) is deliberately not
/// wrapped here: an invalid cookie is an expected branch of the admission
/// protocol (spec §4.4 step 1), not a gateway failure, and is handled inline
/// by the caller.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The shared store was unreachable or returned a backend error
    /// (spec §7 `StoreUnavailable`).
    #[error("state store error: {0}")]
    State(#[from] StateError),
}

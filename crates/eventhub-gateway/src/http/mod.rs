pub mod ai;
pub mod auth;
pub mod error;
pub mod events;
pub mod health;
pub mod rsvps;

use axum::http::HeaderMap;
use eventhub_core::types::Caller;

use crate::app::AppState;
use error::ApiError;

/// Resolve the bearer token on a protected route.
pub(crate) fn caller(state: &AppState, headers: &HeaderMap) -> Result<Caller, ApiError> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    Ok(state.users.tokens().authenticate(header)?)
}

/// Run store work off the async workers. The SQLite connection sits behind a
/// std mutex and argon2 is CPU-bound; neither may block a runtime thread.
pub(crate) async fn blocking<T, E, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
    ApiError: From<E>,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::internal("TASK_FAILED", e))?
        .map_err(ApiError::from)
}

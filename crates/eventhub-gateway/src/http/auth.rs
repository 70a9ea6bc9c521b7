use axum::{extract::rejection::JsonRejection, extract::State, http::StatusCode, Json};
use eventhub_users::store::{LoginRequest, SignupRequest};
use eventhub_users::AuthResponse;
use std::sync::Arc;

use crate::app::AppState;
use crate::http::{blocking, error::ApiError};

/// POST /signup: 201 with a token for the new account.
pub async fn signup(
    State(state): State<Arc<AppState>>,
    body: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let Json(req) = body?;
    let res = blocking(move || state.users.signup(req)).await?;
    Ok((StatusCode::CREATED, Json(res)))
}

/// POST /login
pub async fn login(
    State(state): State<Arc<AppState>>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, ApiError> {
    let Json(req) = body?;
    Ok(Json(blocking(move || state.users.login(req)).await?))
}

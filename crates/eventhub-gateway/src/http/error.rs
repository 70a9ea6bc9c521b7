use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use eventhub_events::GateError;
use eventhub_users::UserError;
use serde::{Deserialize, Serialize};
use tracing::error;

/// Body of every error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// An error on its way out of a handler: a status plus a client-safe message.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// Log the detail, return a generic 500.
    pub(crate) fn internal(code: &str, detail: impl std::fmt::Display) -> Self {
        error!(code, error = %detail, "request failed");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}

impl From<GateError> for ApiError {
    fn from(e: GateError) -> Self {
        let status = match &e {
            GateError::Validation(_) | GateError::Conflict(_) => StatusCode::BAD_REQUEST,
            GateError::Forbidden(_) => StatusCode::FORBIDDEN,
            GateError::NotFound(_) => StatusCode::NOT_FOUND,
            GateError::Upstream(_) => return Self::internal(e.code(), &e),
        };
        Self::new(status, e.to_string())
    }
}

impl From<UserError> for ApiError {
    fn from(e: UserError) -> Self {
        let status = match &e {
            UserError::Validation(_) | UserError::AlreadyExists => StatusCode::BAD_REQUEST,
            UserError::InvalidCredentials | UserError::MissingToken | UserError::InvalidToken => {
                StatusCode::UNAUTHORIZED
            }
            UserError::Hashing(_) | UserError::DatabaseError(_) => {
                return Self::internal(e.code(), &e)
            }
        };
        Self::new(status, e.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        Self::bad_request(e.body_text())
    }
}

impl From<rusqlite::Error> for ApiError {
    fn from(e: rusqlite::Error) -> Self {
        Self::internal("DATABASE_ERROR", e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_errors_map_to_distinct_statuses() {
        let cases = [
            (GateError::Validation("v".into()), StatusCode::BAD_REQUEST),
            (GateError::Conflict("c".into()), StatusCode::BAD_REQUEST),
            (GateError::Forbidden("f".into()), StatusCode::FORBIDDEN),
            (GateError::event_not_found(), StatusCode::NOT_FOUND),
            (GateError::Upstream("disk on fire".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status, status);
        }
    }

    #[test]
    fn upstream_detail_is_not_leaked() {
        let api = ApiError::from(GateError::Upstream("database error: disk I/O".into()));
        assert_eq!(api.message, "Internal server error");
    }

    #[test]
    fn user_errors_map_to_statuses() {
        assert_eq!(ApiError::from(UserError::AlreadyExists).status, StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::from(UserError::InvalidCredentials).status, StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::from(UserError::MissingToken).status, StatusCode::UNAUTHORIZED);
    }
}

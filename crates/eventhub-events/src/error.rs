use thiserror::Error;

/// Failure classes of the workflow gate. The gateway maps each variant to
/// exactly one HTTP status, so variants must stay distinguishable.
#[derive(Debug, Error)]
pub enum GateError {
    /// Malformed or missing input, bad date.
    #[error("{0}")]
    Validation(String),

    /// Role or ownership mismatch.
    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    /// The entity is in a state that forbids the transition.
    #[error("{0}")]
    Conflict(String),

    /// Storage or external-service failure. The message is logged, not returned.
    #[error("{0}")]
    Upstream(String),
}

impl GateError {
    pub fn code(&self) -> &'static str {
        match self {
            GateError::Validation(_) => "VALIDATION_ERROR",
            GateError::Forbidden(_) => "FORBIDDEN",
            GateError::NotFound(_) => "NOT_FOUND",
            GateError::Conflict(_) => "CONFLICT",
            GateError::Upstream(_) => "UPSTREAM_ERROR",
        }
    }

    pub fn event_not_found() -> Self {
        GateError::NotFound("Event not found".to_string())
    }
}

impl From<rusqlite::Error> for GateError {
    fn from(e: rusqlite::Error) -> Self {
        GateError::Upstream(format!("database error: {e}"))
    }
}

pub type Result<T> = std::result::Result<T, GateError>;

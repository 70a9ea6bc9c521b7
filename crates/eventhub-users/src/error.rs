use thiserror::Error;

/// All user-layer errors. Kept separate from the workflow gate's errors so the
/// gateway can map them to HTTP statuses without coupling layers.
#[derive(Debug, Error)]
pub enum UserError {
    #[error("{0}")]
    Validation(String),

    #[error("User with this email already exists")]
    AlreadyExists,

    /// Same message for unknown email and wrong password.
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Missing authorization token")]
    MissingToken,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),
}

impl UserError {
    pub fn code(&self) -> &'static str {
        match self {
            UserError::Validation(_) => "VALIDATION_ERROR",
            UserError::AlreadyExists => "ALREADY_EXISTS",
            UserError::InvalidCredentials => "INVALID_CREDENTIALS",
            UserError::MissingToken | UserError::InvalidToken => "AUTH_FAILED",
            UserError::Hashing(_) | UserError::DatabaseError(_) => "INTERNAL_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, UserError>;

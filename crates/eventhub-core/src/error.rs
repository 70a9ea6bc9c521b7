use thiserror::Error;

#[derive(Debug, Error)]
pub enum EventHubError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Mail delivery failed: {0}")]
    Mail(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl EventHubError {
    /// Short error code string, stable across releases.
    pub fn code(&self) -> &'static str {
        match self {
            EventHubError::Config(_) => "CONFIG_ERROR",
            EventHubError::Mail(_) => "MAIL_ERROR",
            EventHubError::Serialization(_) => "SERIALIZATION_ERROR",
            EventHubError::Io(_) => "IO_ERROR",
            EventHubError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, EventHubError>;

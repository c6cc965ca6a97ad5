//! Error types and handling
//!
//! Common error types used across the client.

use crate::config::ConfigError;
use crate::session::channel::ChannelError;
use crate::session::coordinator::SessionError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Error response for a UI host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl From<AppError> for ErrorResponse {
    fn from(error: AppError) -> Self {
        let code = match &error {
            AppError::Io(_) => "IO_ERROR",
            AppError::Serialization(_) => "SERIALIZATION_ERROR",
            AppError::Session(SessionError::InvalidTransition { .. }) => "INVALID_TRANSITION",
            AppError::Session(SessionError::Channel(_)) | AppError::Channel(_) => "CHANNEL_ERROR",
            AppError::Config(_) => "CONFIG_ERROR",
        };

        ErrorResponse {
            code: code.to_string(),
            message: error.to_string(),
        }
    }
}

impl From<SessionError> for ErrorResponse {
    fn from(error: SessionError) -> Self {
        AppError::from(error).into()
    }
}

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::state::SessionPhase;

    #[test]
    fn test_invalid_transition_code() {
        let err = SessionError::InvalidTransition {
            action: "start session",
            phase: SessionPhase::Exercising,
        };
        let response = ErrorResponse::from(err);
        assert_eq!(response.code, "INVALID_TRANSITION");
        assert!(response.message.contains("exercising"));
    }

    #[test]
    fn test_channel_error_code() {
        let response = ErrorResponse::from(AppError::Channel(ChannelError::Closed));
        assert_eq!(response.code, "CHANNEL_ERROR");
    }
}

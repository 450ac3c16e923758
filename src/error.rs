//! Error types for the rating engine
//!
//! Fallible operations return `anyhow::Result`; the typed kinds below are
//! attached so callers can `downcast_ref::<RatingError>()` when they need
//! to branch on the failure.

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Custom error types for specific rating scenarios
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RatingError {
    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("Player not found: {player_id}")]
    PlayerNotFound { player_id: String },

    #[error("Player already exists: {player_id}")]
    PlayerAlreadyExists { player_id: String },

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("Storage error: {message}")]
    StorageError { message: String },

    #[error("Internal service error: {message}")]
    InternalError { message: String },
}

impl RatingError {
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        RatingError::InvalidInput {
            reason: reason.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        RatingError::InternalError {
            message: message.into(),
        }
    }
}

/// Returns true when `err` carries a [`RatingError::InvalidInput`]
pub fn is_invalid_input(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<RatingError>(),
        Some(RatingError::InvalidInput { .. })
    )
}

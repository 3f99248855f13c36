//! Error types for calnotes.

use thiserror::Error;

/// Errors that can occur in calnotes operations.
#[derive(Error, Debug)]
pub enum CalNotesError {
    #[error("{0}")]
    Validation(String),

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Username already exists: {0}")]
    DuplicateUsername(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Password hashing error: {0}")]
    Hashing(String),
}

impl CalNotesError {
    pub fn validation(message: impl Into<String>) -> Self {
        CalNotesError::Validation(message.into())
    }
}

impl From<rusqlite::Error> for CalNotesError {
    fn from(err: rusqlite::Error) -> Self {
        CalNotesError::Store(err.to_string())
    }
}

/// Result type alias for calnotes operations.
pub type CalNotesResult<T> = Result<T, CalNotesError>;

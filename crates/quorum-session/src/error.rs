//! Error types for session state operations.

/// Error type for session state operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Session was not found in the registry.
    #[error("Session not found: {0}")]
    NotFound(String),

    /// Error from the insight sink.
    #[error("Persistence error: {0}")]
    Persistence(String),
}

/// Result type for session state operations.
pub type Result<T> = std::result::Result<T, Error>;

//! Error types for the meeting pipeline.
//!
//! Per-chunk failures are part of the `ProcessingResult` (a failed
//! extraction yields `status = Failed`, a failed phase degrades the
//! result); the `Err` path is reserved for session-level problems.

/// Error type for pipeline operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The session was not found where one was required.
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Session registry or persistence error.
    #[error(transparent)]
    Session(#[from] quorum_session::Error),
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

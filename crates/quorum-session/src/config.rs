//! Configuration for per-session state.

/// Default number of transcript chunks held in the sliding window.
pub const DEFAULT_MAX_CHUNKS: usize = 10;

/// Configuration for per-session state.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Maximum number of chunks kept in the sliding window before
    /// the oldest is evicted.
    pub max_chunks: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_chunks: DEFAULT_MAX_CHUNKS,
        }
    }
}

impl SessionConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the sliding-window capacity.
    pub fn with_max_chunks(mut self, max: usize) -> Self {
        self.max_chunks = max.max(1);
        self
    }
}

//! Per-session state for the quorum meeting-intelligence pipeline.
//!
//! This crate provides the bounded, session-scoped state the pipeline
//! accumulates across transcript chunks:
//! - A sliding window over recent chunks and their embeddings
//! - Tracked insights with their embedding history
//! - A registry with one lock per session, so chunks for a meeting are
//!   strictly ordered while unrelated meetings run concurrently
//! - A persistence hook invoked when a session is finalized
//!
//! # Example
//!
//! ```rust,ignore
//! use quorum_session::{SessionConfig, SessionRegistry};
//!
//! let registry = SessionRegistry::new(SessionConfig::default().with_max_chunks(10));
//! let handle = registry.get_or_create("meeting-1", "proj-1", "org-1").await;
//! ```

mod config;
mod error;
mod persistence;
mod registry;
mod state;
mod window;

pub use config::{DEFAULT_MAX_CHUNKS, SessionConfig};
pub use error::{Error, Result};
pub use persistence::{InsightRecord, InsightSink, MemorySink, NoPersistence};
pub use registry::{SessionHandle, SessionRegistry};
pub use state::{EvolutionState, SessionState};
pub use window::SlidingWindowContext;

//! Shared domain types for the quorum meeting-intelligence pipeline.
//!
//! Everything here is plain data: transcript chunks, extracted insights,
//! assistance cards, and the wire shapes the pipeline returns. Behavior
//! lives in `quorum-session` and `quorum-pipeline`.

pub mod assist;
pub mod chunk;
pub mod insight;
pub mod result;

pub use assist::{AssistanceCard, AssistancePhase, PhaseStatus};
pub use chunk::TranscriptChunk;
pub use insight::{EvolutionResult, EvolutionType, InsightType, MeetingInsight, Priority};
pub use result::{FinalizeSummary, ProcessingMetadata, ProcessingResult, ProcessingStatus};

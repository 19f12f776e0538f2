//! Real-time meeting-intelligence pipeline.
//!
//! Transcript chunks stream in; structured insights and proactive
//! assistance stream out. The per-chunk flow:
//!
//! ```text
//!   chunk ──▶ duplicate gate ──▶ extraction ──▶ insight dedup
//!                                                    │
//!          ProcessingResult ◀── card merge ◀── assistance phases
//!                                                    ▲
//!                                evolution check ────┘
//! ```
//!
//! Every similarity gate runs on embeddings from the injected
//! [`Embedder`](quorum_llm::Embedder); the extraction call goes through
//! a [`ProviderCascade`](quorum_llm::ProviderCascade) with retry,
//! circuit breaking, and provider fallback. The five assistance phases
//! are external collaborators behind [`PhaseService`], each isolated so
//! one failing feature degrades the result instead of sinking it.

pub mod cards;
pub mod config;
pub mod dedup;
pub mod error;
pub mod evolution;
pub mod extractor;
pub mod orchestrator;
pub mod phases;
pub mod pipeline;
pub mod store;

pub use cards::AssistanceCardDeduplicator;
pub use config::{DEFAULT_EXTRACTION_MODEL, PipelineConfig};
pub use dedup::{ChunkDuplicateDetector, InsightDeduplicator};
pub use error::{Error, Result};
pub use evolution::InsightEvolutionTracker;
pub use extractor::InsightExtractor;
pub use orchestrator::{OrchestrationOutcome, ProactiveAssistanceOrchestrator};
pub use phases::{
    ActivePhaseSelector, MockPhaseService, PhaseContext, PhaseSelection, PhaseService,
    SharedPhaseService,
};
pub use pipeline::MeetingPipeline;
pub use store::{MockVectorStore, SearchFilter, SearchHit, SharedVectorStore, VectorStore};

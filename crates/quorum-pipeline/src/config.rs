//! Pipeline configuration.
//!
//! The similarity thresholds are empirical constants carried over from
//! production tuning. They are exposed as configuration rather than
//! baked in, but the defaults should not be changed without evidence.

use std::time::Duration;

use quorum_session::SessionConfig;
use quorum_types::InsightType;

/// Default model used for the extraction call.
pub const DEFAULT_EXTRACTION_MODEL: &str = "claude-sonnet-4-5";

/// Configuration for the meeting pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Cosine similarity at or above which an incoming chunk is dropped
    /// as a near-duplicate of a recent one.
    pub chunk_duplicate_threshold: f32,

    /// How many recent window embeddings the chunk duplicate gate
    /// compares against.
    pub duplicate_window_size: usize,

    /// Cosine similarity at or above which a new insight is dropped as
    /// an exact duplicate of a tracked one.
    pub semantic_similarity_threshold: f32,

    /// Looser similarity floor at which a non-duplicate insight is
    /// checked for evolution against its closest tracked insight.
    pub evolution_threshold: f32,

    /// Minimum extraction confidence for an insight to be kept.
    pub min_confidence_threshold: f32,

    /// Minimum gap between cross-meeting semantic searches per session.
    pub semantic_search_interval: Duration,

    /// Timeout on each vector-store search.
    pub search_timeout: Duration,

    /// Timeout on each proactive-assistance phase call.
    pub phase_timeout: Duration,

    /// Model requested for the extraction call.
    pub extraction_model: String,

    /// Token budget for the extraction call.
    pub extraction_max_tokens: u32,

    /// When set, extraction only surfaces these insight types.
    pub enabled_insight_types: Option<Vec<InsightType>>,

    /// Per-session window configuration.
    pub session: SessionConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_duplicate_threshold: 0.90,
            duplicate_window_size: 5,
            semantic_similarity_threshold: 0.85,
            evolution_threshold: 0.70,
            min_confidence_threshold: 0.60,
            semantic_search_interval: Duration::from_secs(30),
            search_timeout: Duration::from_millis(1500),
            phase_timeout: Duration::from_secs(5),
            extraction_model: DEFAULT_EXTRACTION_MODEL.to_string(),
            extraction_max_tokens: 2048,
            enabled_insight_types: None,
            session: SessionConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the chunk duplicate threshold.
    pub fn with_chunk_duplicate_threshold(mut self, threshold: f32) -> Self {
        self.chunk_duplicate_threshold = threshold;
        self
    }

    /// Set how many recent embeddings the duplicate gate scans.
    pub fn with_duplicate_window_size(mut self, size: usize) -> Self {
        self.duplicate_window_size = size;
        self
    }

    /// Set the insight dedup threshold.
    pub fn with_semantic_similarity_threshold(mut self, threshold: f32) -> Self {
        self.semantic_similarity_threshold = threshold;
        self
    }

    /// Set the evolution threshold.
    pub fn with_evolution_threshold(mut self, threshold: f32) -> Self {
        self.evolution_threshold = threshold;
        self
    }

    /// Set the minimum extraction confidence.
    pub fn with_min_confidence_threshold(mut self, threshold: f32) -> Self {
        self.min_confidence_threshold = threshold;
        self
    }

    /// Set the semantic-search rate-limit interval.
    pub fn with_semantic_search_interval(mut self, interval: Duration) -> Self {
        self.semantic_search_interval = interval;
        self
    }

    /// Set the vector-store search timeout.
    pub fn with_search_timeout(mut self, timeout: Duration) -> Self {
        self.search_timeout = timeout;
        self
    }

    /// Set the per-phase timeout.
    pub fn with_phase_timeout(mut self, timeout: Duration) -> Self {
        self.phase_timeout = timeout;
        self
    }

    /// Set the extraction model.
    pub fn with_extraction_model(mut self, model: impl Into<String>) -> Self {
        self.extraction_model = model.into();
        self
    }

    /// Restrict extraction to the given insight types.
    pub fn with_enabled_insight_types(mut self, types: Vec<InsightType>) -> Self {
        self.enabled_insight_types = Some(types);
        self
    }

    /// Set the session configuration.
    pub fn with_session(mut self, session: SessionConfig) -> Self {
        self.session = session;
        self
    }
}

//! Wire shapes returned by the pipeline for each chunk and at session end.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::assist::{AssistanceCard, PhaseStatus};
use crate::insight::MeetingInsight;

// ─────────────────────────────────────────────────────────────────────────────
// Status
// ─────────────────────────────────────────────────────────────────────────────

/// Overall outcome of processing a single chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProcessingStatus {
    /// Everything that ran, ran cleanly.
    Ok,
    /// Core extraction succeeded but one or more assistance phases failed.
    Degraded,
    /// Core extraction itself failed.
    Failed,
}

// ─────────────────────────────────────────────────────────────────────────────
// Per-chunk result
// ─────────────────────────────────────────────────────────────────────────────

/// Diagnostic metadata attached to every per-chunk result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessingMetadata {
    /// What caused assistance phases to run, e.g. `signal` or `interval`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger: Option<String>,

    /// Priority bucket the selector assigned to this chunk.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,

    /// Score from the semantic relevance check, when one ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semantic_score: Option<f32>,

    /// Trigger keywords or patterns matched in the chunk text.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub signals_detected: Vec<String>,

    /// Chunks currently held in the sliding window.
    pub chunks_accumulated: usize,

    /// Human-readable reason for the phase-selection decision.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision_reason: Option<String>,

    /// Phases that were selected to run for this chunk.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub active_phases: Vec<String>,

    /// Phases deliberately not run for this chunk.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped_phases: Vec<String>,

    /// Wall-clock time each executed phase took, keyed by phase name.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub phase_execution_times_ms: HashMap<String, u64>,
}

/// Everything the pipeline produced for one transcript chunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingResult {
    pub session_id: String,
    pub chunk_index: u64,

    /// New insights surfaced by this chunk, evolutions excluded.
    pub insights: Vec<MeetingInsight>,

    /// Assistance cards surfaced by this chunk.
    pub proactive_assistance: Vec<AssistanceCard>,

    /// Merged records for previously-tracked insights that evolved on
    /// this chunk.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub evolved_insights: Vec<MeetingInsight>,

    pub status: ProcessingStatus,

    /// Outcome of each assistance phase, keyed by phase name.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub phase_status: HashMap<String, PhaseStatus>,

    /// Total insights tracked for the session after this chunk.
    pub total_insights: usize,

    pub processing_time_ms: u64,

    /// Chunks held in the sliding window after this chunk.
    pub context_window_size: usize,

    /// Phases that raised an error on this chunk.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_phases: Vec<String>,

    /// Error text per failed phase, keyed by phase name.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub error_messages: HashMap<String, String>,

    /// Set when the whole chunk was skipped, e.g. as a near-duplicate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped_reason: Option<String>,

    /// Similarity to the matched prior chunk, when the chunk was skipped
    /// as a duplicate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity_score: Option<f32>,

    pub processing_metadata: ProcessingMetadata,
}

impl ProcessingResult {
    /// Empty successful result for a chunk that produced nothing.
    pub fn empty(session_id: impl Into<String>, chunk_index: u64) -> Self {
        Self {
            session_id: session_id.into(),
            chunk_index,
            insights: Vec::new(),
            proactive_assistance: Vec::new(),
            evolved_insights: Vec::new(),
            status: ProcessingStatus::Ok,
            phase_status: HashMap::new(),
            total_insights: 0,
            processing_time_ms: 0,
            context_window_size: 0,
            failed_phases: Vec::new(),
            error_messages: HashMap::new(),
            skipped_reason: None,
            similarity_score: None,
            processing_metadata: ProcessingMetadata::default(),
        }
    }

    /// Result for a chunk dropped as a near-duplicate of a recent one.
    pub fn skipped_duplicate(
        session_id: impl Into<String>,
        chunk_index: u64,
        similarity: f32,
        window_size: usize,
    ) -> Self {
        let mut result = Self::empty(session_id, chunk_index);
        result.skipped_reason = Some("duplicate_chunk".to_string());
        result.similarity_score = Some(similarity);
        result.context_window_size = window_size;
        result
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Session summary
// ─────────────────────────────────────────────────────────────────────────────

/// Summary returned when a session is finalized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalizeSummary {
    pub session_id: String,

    /// Number of insights tracked over the whole session.
    pub total_insights: usize,

    /// Insight counts keyed by insight-type wire name.
    pub insights_by_type: HashMap<String, usize>,

    /// Fraction of update events that were evolutions of existing insights
    /// rather than brand-new ones. Zero when nothing was tracked.
    pub evolution_rate: f32,

    /// Final state of every tracked insight.
    pub insights: Vec<MeetingInsight>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serde() {
        assert_eq!(
            serde_json::to_value(ProcessingStatus::Degraded).unwrap(),
            "DEGRADED"
        );
    }

    #[test]
    fn test_skipped_duplicate() {
        let r = ProcessingResult::skipped_duplicate("s1", 4, 0.93, 5);
        assert_eq!(r.skipped_reason.as_deref(), Some("duplicate_chunk"));
        assert_eq!(r.similarity_score, Some(0.93));
        assert_eq!(r.status, ProcessingStatus::Ok);
        assert!(r.insights.is_empty());
    }

    #[test]
    fn test_result_roundtrip_omits_empty_fields() {
        let r = ProcessingResult::empty("s1", 0);
        let json = serde_json::to_string(&r).unwrap();
        assert!(!json.contains("failed_phases"));
        assert!(!json.contains("skipped_reason"));
        let back: ProcessingResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back.chunk_index, 0);
    }
}

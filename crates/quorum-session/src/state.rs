//! Mutable per-session state accumulated across chunks.

use std::collections::HashMap;
use std::time::Instant;

use quorum_types::MeetingInsight;

use crate::config::SessionConfig;
use crate::window::SlidingWindowContext;

/// Counters for how insights changed over the life of a session.
#[derive(Debug, Clone, Default)]
pub struct EvolutionState {
    /// Insights first surfaced in this session.
    pub new_insights: usize,

    /// Update events that evolved an already-tracked insight.
    pub evolved_insights: usize,

    /// Evolution count per tracked insight id.
    pub per_insight: HashMap<String, usize>,
}

impl EvolutionState {
    /// Record a brand-new insight.
    pub fn record_new(&mut self) {
        self.new_insights += 1;
    }

    /// Record an evolution of the insight with the given id.
    pub fn record_evolution(&mut self, insight_id: &str) {
        self.evolved_insights += 1;
        *self.per_insight.entry(insight_id.to_string()).or_default() += 1;
    }

    /// Fraction of update events that evolved an existing insight rather
    /// than creating a new one. Zero when nothing has been tracked.
    pub fn evolution_rate(&self) -> f32 {
        let total = self.new_insights + self.evolved_insights;
        if total == 0 {
            0.0
        } else {
            self.evolved_insights as f32 / total as f32
        }
    }
}

/// All mutable state for one meeting session.
///
/// The insight and embedding vectors grow for the life of the session;
/// long meetings pay a linear scan per candidate insight. Access is
/// serialized by the registry's per-session lock.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub session_id: String,
    pub project_id: String,
    pub organization_id: String,

    /// Sliding window over recent chunks.
    pub window: SlidingWindowContext,

    /// Every insight currently tracked. Index `i` pairs with
    /// `insight_embeddings[i]`.
    pub insights: Vec<MeetingInsight>,
    pub insight_embeddings: Vec<Vec<f32>>,

    /// When the last cross-meeting semantic search ran for this session.
    pub last_semantic_search_at: Option<Instant>,

    pub evolution: EvolutionState,

    /// Chunks accepted into the window (duplicates excluded).
    pub chunks_processed: u64,
}

impl SessionState {
    /// Create fresh state for a new session.
    pub fn new(
        session_id: impl Into<String>,
        project_id: impl Into<String>,
        organization_id: impl Into<String>,
        config: &SessionConfig,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            project_id: project_id.into(),
            organization_id: organization_id.into(),
            window: SlidingWindowContext::new(config.max_chunks),
            insights: Vec::new(),
            insight_embeddings: Vec::new(),
            last_semantic_search_at: None,
            evolution: EvolutionState::default(),
            chunks_processed: 0,
        }
    }

    /// Track a new insight alongside its embedding.
    pub fn track_insight(&mut self, insight: MeetingInsight, embedding: Vec<f32>) {
        self.insights.push(insight);
        self.insight_embeddings.push(embedding);
        self.evolution.record_new();
    }

    /// Replace the tracked insight at `index` with its evolved successor.
    /// The caller supplies the embedding matching the merged record's
    /// content. History length does not grow.
    pub fn replace_insight(
        &mut self,
        index: usize,
        merged: MeetingInsight,
        embedding: Vec<f32>,
    ) {
        if index < self.insights.len() {
            self.evolution.record_evolution(&merged.insight_id);
            self.insights[index] = merged;
            self.insight_embeddings[index] = embedding;
        }
    }

    /// Whether a semantic search is due, given the configured interval.
    pub fn semantic_search_due(&self, interval: std::time::Duration) -> bool {
        match self.last_semantic_search_at {
            None => true,
            Some(at) => at.elapsed() >= interval,
        }
    }

    /// Insight counts keyed by insight-type wire name.
    pub fn insights_by_type(&self) -> HashMap<String, usize> {
        let mut counts: HashMap<String, usize> = HashMap::new();
        for insight in &self.insights {
            *counts
                .entry(insight.insight_type.as_str().to_string())
                .or_default() += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quorum_types::{InsightType, Priority};

    fn insight(content: &str, insight_type: InsightType) -> MeetingInsight {
        MeetingInsight::new(insight_type, Priority::Medium, content, "", 0, 0.9)
    }

    #[test]
    fn test_evolution_rate() {
        let mut state = SessionState::new("s1", "p1", "o1", &SessionConfig::default());
        assert_eq!(state.evolution.evolution_rate(), 0.0);

        state.track_insight(insight("a", InsightType::ActionItem), vec![1.0]);
        state.track_insight(insight("b", InsightType::Decision), vec![0.5]);
        let merged = insight("a but longer now", InsightType::ActionItem);
        state.replace_insight(0, merged, vec![0.9]);

        assert_eq!(state.insights.len(), 2);
        assert_eq!(state.evolution.new_insights, 2);
        assert_eq!(state.evolution.evolved_insights, 1);
        assert!((state.evolution.evolution_rate() - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_replace_keeps_history_length() {
        let mut state = SessionState::new("s1", "p1", "o1", &SessionConfig::default());
        state.track_insight(insight("a", InsightType::Risk), vec![1.0, 0.0]);

        let merged = insight("a revisited", InsightType::Risk);
        let merged_id = merged.insight_id.clone();
        state.replace_insight(0, merged, vec![0.0, 1.0]);

        assert_eq!(state.insights.len(), 1);
        assert_eq!(state.insight_embeddings.len(), 1);
        assert_eq!(state.insights[0].insight_id, merged_id);
        assert_eq!(state.insight_embeddings[0], vec![0.0, 1.0]);
        assert_eq!(state.evolution.per_insight.get(&merged_id), Some(&1));
    }

    #[test]
    fn test_replace_out_of_range_is_noop() {
        let mut state = SessionState::new("s1", "p1", "o1", &SessionConfig::default());
        state.replace_insight(3, insight("x", InsightType::Question), vec![]);
        assert!(state.insights.is_empty());
        assert_eq!(state.evolution.evolved_insights, 0);
    }

    #[test]
    fn test_semantic_search_due_initially() {
        let state = SessionState::new("s1", "p1", "o1", &SessionConfig::default());
        assert!(state.semantic_search_due(std::time::Duration::from_secs(30)));
    }

    #[test]
    fn test_insights_by_type() {
        let mut state = SessionState::new("s1", "p1", "o1", &SessionConfig::default());
        state.track_insight(insight("a", InsightType::ActionItem), vec![]);
        state.track_insight(insight("b", InsightType::ActionItem), vec![]);
        state.track_insight(insight("c", InsightType::Question), vec![]);

        let counts = state.insights_by_type();
        assert_eq!(counts.get("action_item"), Some(&2));
        assert_eq!(counts.get("question"), Some(&1));
    }
}

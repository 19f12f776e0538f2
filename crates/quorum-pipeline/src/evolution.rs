//! Insight evolution: classifying how a new insight relates to a
//! tracked one.
//!
//! Evolution runs only on insights that escaped the exact-duplicate
//! gate but are still close to something already tracked. The merged
//! record replaces the tracked slot; history never grows from an
//! evolution.

use quorum_types::{EvolutionResult, EvolutionType, MeetingInsight};

/// Content must grow by both this factor and [`EXPANSION_MIN_GROWTH`]
/// characters to count as an expansion.
const EXPANSION_FACTOR: f32 = 1.3;
const EXPANSION_MIN_GROWTH: usize = 20;

/// Classifies near-matches of tracked insights.
#[derive(Debug, Clone)]
pub struct InsightEvolutionTracker {
    /// Similarity floor below which two insights are unrelated.
    pub evolution_threshold: f32,
}

impl InsightEvolutionTracker {
    pub fn new(evolution_threshold: f32) -> Self {
        Self {
            evolution_threshold,
        }
    }

    /// Whether a similarity score is close enough to even consider
    /// evolution.
    pub fn in_range(&self, similarity: f32) -> bool {
        similarity >= self.evolution_threshold
    }

    /// Classify how `new` relates to `tracked`.
    ///
    /// Pure: the outcome depends only on the two insights and the
    /// similarity score. Checked in order: escalation, refinement,
    /// expansion, then duplicate.
    pub fn classify(
        new: &MeetingInsight,
        tracked: &MeetingInsight,
        similarity: f32,
    ) -> EvolutionResult {
        if new.priority > tracked.priority {
            let mut merged = tracked.clone();
            merged.priority = new.priority;
            merged.context = concat_context(&tracked.context, &new.context);
            merged.timestamp = new.timestamp;
            return EvolutionResult {
                is_evolution: true,
                evolution_type: EvolutionType::Escalated,
                similarity_score: similarity,
                merged_insight: Some(merged),
            };
        }

        let fills_owner = new.assigned_to.is_some() && tracked.assigned_to.is_none();
        let fills_due_date = new.due_date.is_some() && tracked.due_date.is_none();
        if fills_owner || fills_due_date {
            let mut merged = tracked.clone();
            if fills_owner {
                merged.assigned_to = new.assigned_to.clone();
            }
            if fills_due_date {
                merged.due_date = new.due_date.clone();
            }
            merged.timestamp = new.timestamp;
            return EvolutionResult {
                is_evolution: true,
                evolution_type: EvolutionType::Refined,
                similarity_score: similarity,
                merged_insight: Some(merged),
            };
        }

        if is_expansion(&new.content, &tracked.content) {
            let mut merged = tracked.clone();
            merged.content = new.content.clone();
            merged.context = concat_context(&tracked.context, &new.context);
            merged.timestamp = new.timestamp;
            return EvolutionResult {
                is_evolution: true,
                evolution_type: EvolutionType::Expanded,
                similarity_score: similarity,
                merged_insight: Some(merged),
            };
        }

        EvolutionResult {
            is_evolution: false,
            evolution_type: EvolutionType::Duplicate,
            similarity_score: similarity,
            merged_insight: None,
        }
    }
}

fn is_expansion(new_content: &str, tracked_content: &str) -> bool {
    let new_len = new_content.chars().count();
    let tracked_len = tracked_content.chars().count();
    new_len >= (tracked_len as f32 * EXPANSION_FACTOR) as usize
        && new_len >= tracked_len + EXPANSION_MIN_GROWTH
}

fn concat_context(existing: &str, addition: &str) -> String {
    if existing.is_empty() {
        addition.to_string()
    } else if addition.is_empty() || existing.contains(addition) {
        existing.to_string()
    } else {
        format!("{} | {}", existing, addition)
    }
}

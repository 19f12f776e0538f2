//! Proactive-assistance phases and cards.

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Assistance Phase
// ─────────────────────────────────────────────────────────────────────────────

/// One of the five independently-triggered proactive-assistance analyses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssistancePhase {
    QuestionAnswering,
    Clarification,
    ConflictDetection,
    ActionItemQuality,
    FollowUpSuggestions,
}

impl AssistancePhase {
    /// All five phases, in selection order.
    pub const ALL: [AssistancePhase; 5] = [
        AssistancePhase::QuestionAnswering,
        AssistancePhase::Clarification,
        AssistancePhase::ConflictDetection,
        AssistancePhase::ActionItemQuality,
        AssistancePhase::FollowUpSuggestions,
    ];

    /// Wire name for this phase.
    pub fn as_str(&self) -> &'static str {
        match self {
            AssistancePhase::QuestionAnswering => "question_answering",
            AssistancePhase::Clarification => "clarification",
            AssistancePhase::ConflictDetection => "conflict_detection",
            AssistancePhase::ActionItemQuality => "action_item_quality",
            AssistancePhase::FollowUpSuggestions => "follow_up_suggestions",
        }
    }
}

impl std::fmt::Display for AssistancePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of one phase for one chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PhaseStatus {
    Success,
    Failed,
    Skipped,
}

// ─────────────────────────────────────────────────────────────────────────────
// Assistance Card
// ─────────────────────────────────────────────────────────────────────────────

/// One proactive-assistance output surfaced to the user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistanceCard {
    /// Card kind, e.g. `clarification_needed` or `incomplete_action_item`.
    pub card_type: String,

    /// The insight this card is about, when there is one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insight_id: Option<String>,

    /// Short headline.
    pub title: String,

    /// Card body text.
    pub body: String,

    /// Concrete suggestions, when the phase produced any.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,

    /// What is vague about the underlying item, for quality cards.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vagueness: Option<String>,

    /// Why the phase surfaced this card.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,

    /// Which phase produced the card.
    pub phase: AssistancePhase,
}

impl AssistanceCard {
    /// Create a card with the required fields.
    pub fn new(
        card_type: impl Into<String>,
        title: impl Into<String>,
        body: impl Into<String>,
        phase: AssistancePhase,
    ) -> Self {
        Self {
            card_type: card_type.into(),
            insight_id: None,
            title: title.into(),
            body: body.into(),
            suggestions: Vec::new(),
            vagueness: None,
            reasoning: None,
            phase,
        }
    }

    /// Tie the card to an insight.
    pub fn with_insight_id(mut self, insight_id: impl Into<String>) -> Self {
        self.insight_id = Some(insight_id.into());
        self
    }

    /// Add suggestions.
    pub fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
        self.suggestions = suggestions;
        self
    }

    /// Describe what is vague.
    pub fn with_vagueness(mut self, vagueness: impl Into<String>) -> Self {
        self.vagueness = Some(vagueness.into());
        self
    }

    /// Explain the card.
    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = Some(reasoning.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_wire_names() {
        assert_eq!(
            AssistancePhase::QuestionAnswering.as_str(),
            "question_answering"
        );
        assert_eq!(AssistancePhase::ALL.len(), 5);
    }

    #[test]
    fn test_phase_status_serde() {
        let json = serde_json::to_value(PhaseStatus::Skipped).unwrap();
        assert_eq!(json, "SKIPPED");
    }

    #[test]
    fn test_card_builder() {
        let card = AssistanceCard::new(
            "incomplete_action_item",
            "Action item needs an owner",
            "No owner was named for this task.",
            AssistancePhase::ActionItemQuality,
        )
        .with_insight_id("abc")
        .with_vagueness("missing owner")
        .with_suggestions(vec!["Assign an owner".to_string()]);

        assert_eq!(card.insight_id.as_deref(), Some("abc"));
        assert_eq!(card.suggestions.len(), 1);
    }
}

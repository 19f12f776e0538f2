//! Assistance-phase selection and the phase-service contract.

use std::sync::Arc;

use async_trait::async_trait;

use quorum_llm::{ProviderError, Result};
use quorum_types::{AssistanceCard, AssistancePhase, InsightType, MeetingInsight};

// ─────────────────────────────────────────────────────────────────────────────
// Phase Selection
// ─────────────────────────────────────────────────────────────────────────────

const INTERROGATIVES: &[&str] = &[
    "who", "what", "when", "where", "why", "how", "which", "should", "could", "can",
];

const DECISION_KEYWORDS: &[&str] = &[
    "decided", "decide", "agreed", "agree", "let's", "we will", "we'll", "going with",
];

/// Which phases to run for a chunk, and why.
#[derive(Debug, Clone)]
pub struct PhaseSelection {
    /// Phases worth running, in canonical order.
    pub active: Vec<AssistancePhase>,

    /// Phases not selected; recorded as skipped, never attempted.
    pub skipped: Vec<AssistancePhase>,

    /// Trigger keywords or patterns matched in the chunk text.
    pub signals: Vec<String>,

    /// Human-readable selection rationale.
    pub reason: String,
}

/// Cheap, local, no-LLM heuristic bounding assistance call volume.
#[derive(Debug, Clone, Default)]
pub struct ActivePhaseSelector;

impl ActivePhaseSelector {
    pub fn new() -> Self {
        Self
    }

    /// Decide which phases are worth running for this chunk.
    pub fn select(&self, chunk_text: &str, insights: &[MeetingInsight]) -> PhaseSelection {
        let lower = chunk_text.to_lowercase();
        let mut signals = Vec::new();

        let has_question_mark = chunk_text.contains('?');
        if has_question_mark {
            signals.push("question_mark".to_string());
        }
        let has_interrogative = INTERROGATIVES
            .iter()
            .any(|w| lower.split_whitespace().any(|token| token.trim_matches(|c: char| !c.is_alphanumeric()) == *w));
        if has_interrogative {
            signals.push("interrogative".to_string());
        }
        let decision_keyword = DECISION_KEYWORDS.iter().find(|k| lower.contains(*k));
        if let Some(keyword) = decision_keyword {
            signals.push(format!("decision_keyword:{}", keyword));
        }

        let has_type = |t: InsightType| insights.iter().any(|i| i.insight_type == t);
        let has_question_insight = has_type(InsightType::Question);
        let has_action_item = has_type(InsightType::ActionItem);
        let has_decision = has_type(InsightType::Decision);
        let has_key_point = has_type(InsightType::KeyPoint);

        let mut active = Vec::new();
        let mut skipped = Vec::new();
        for phase in AssistancePhase::ALL {
            let wanted = match phase {
                AssistancePhase::QuestionAnswering => {
                    has_question_mark || has_interrogative || has_question_insight
                }
                AssistancePhase::Clarification => has_action_item || has_decision,
                AssistancePhase::ConflictDetection => {
                    decision_keyword.is_some() || has_decision
                }
                AssistancePhase::ActionItemQuality => has_action_item,
                AssistancePhase::FollowUpSuggestions => has_decision || has_key_point,
            };
            if wanted {
                active.push(phase);
            } else {
                skipped.push(phase);
            }
        }

        let reason = if active.is_empty() {
            "no assistance signals in chunk or insights".to_string()
        } else {
            format!(
                "selected {} of {} phases from chunk signals and insight types",
                active.len(),
                AssistancePhase::ALL.len()
            )
        };

        PhaseSelection {
            active,
            skipped,
            signals,
            reason,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Phase Service contract
// ─────────────────────────────────────────────────────────────────────────────

/// Input handed to each phase service.
#[derive(Debug, Clone)]
pub struct PhaseContext {
    pub session_id: String,
    pub organization_id: String,

    /// The chunk being processed.
    pub chunk_text: String,
    pub chunk_index: u64,

    /// Insights surfaced by this chunk (new and evolved).
    pub insights: Vec<MeetingInsight>,

    /// Recent window text for grounding.
    pub recent_context: String,
}

/// One external proactive-assistance collaborator.
#[async_trait]
pub trait PhaseService: Send + Sync {
    /// Run the phase for one chunk, producing zero or more cards.
    async fn run(&self, ctx: &PhaseContext) -> Result<Vec<AssistanceCard>>;
}

/// Shared handle to a phase service.
pub type SharedPhaseService = Arc<dyn PhaseService>;

/// Scripted phase service for tests.
pub struct MockPhaseService {
    cards: Vec<AssistanceCard>,
    fail_with: Option<String>,
    delay: Option<std::time::Duration>,
}

impl MockPhaseService {
    /// A service that returns the given cards.
    pub fn with_cards(cards: Vec<AssistanceCard>) -> Self {
        Self {
            cards,
            fail_with: None,
            delay: None,
        }
    }

    /// A service that always fails with the given message.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            cards: Vec::new(),
            fail_with: Some(message.into()),
            delay: None,
        }
    }

    /// A service that sleeps before answering.
    pub fn slow(cards: Vec<AssistanceCard>, delay: std::time::Duration) -> Self {
        Self {
            cards,
            fail_with: None,
            delay: Some(delay),
        }
    }
}

#[async_trait]
impl PhaseService for MockPhaseService {
    async fn run(&self, _ctx: &PhaseContext) -> Result<Vec<AssistanceCard>> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = &self.fail_with {
            return Err(ProviderError::Backend(message.clone()));
        }
        Ok(self.cards.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quorum_types::Priority;

    fn insight(insight_type: InsightType) -> MeetingInsight {
        MeetingInsight::new(insight_type, Priority::Medium, "c", "", 0, 0.8)
    }

    #[test]
    fn test_question_mark_selects_question_answering() {
        let selector = ActivePhaseSelector::new();
        let selection = selector.select("Is the schema ready?", &[]);

        assert!(selection.active.contains(&AssistancePhase::QuestionAnswering));
        assert!(selection.signals.contains(&"question_mark".to_string()));
        assert!(selection.skipped.contains(&AssistancePhase::ActionItemQuality));
    }

    #[test]
    fn test_action_item_selects_clarification_and_quality() {
        let selector = ActivePhaseSelector::new();
        let insights = vec![insight(InsightType::ActionItem)];
        let selection = selector.select("John takes the rollout task.", &insights);

        assert!(selection.active.contains(&AssistancePhase::Clarification));
        assert!(selection.active.contains(&AssistancePhase::ActionItemQuality));
        assert!(!selection.active.contains(&AssistancePhase::FollowUpSuggestions));
    }

    #[test]
    fn test_decision_keyword_selects_conflict_detection() {
        let selector = ActivePhaseSelector::new();
        let selection = selector.select("We agreed to ship on Friday.", &[]);

        assert!(selection.active.contains(&AssistancePhase::ConflictDetection));
        assert!(
            selection
                .signals
                .iter()
                .any(|s| s.starts_with("decision_keyword:"))
        );
    }

    #[test]
    fn test_decision_insight_selects_followups() {
        let selector = ActivePhaseSelector::new();
        let insights = vec![insight(InsightType::Decision)];
        let selection = selector.select("plain statement", &insights);

        assert!(selection.active.contains(&AssistancePhase::FollowUpSuggestions));
        assert!(selection.active.contains(&AssistancePhase::ConflictDetection));
        assert!(selection.active.contains(&AssistancePhase::Clarification));
    }

    #[test]
    fn test_nothing_selected_for_plain_chatter() {
        let selector = ActivePhaseSelector::new();
        let selection = selector.select("the weather is nice today", &[]);

        assert!(selection.active.is_empty());
        assert_eq!(selection.skipped.len(), 5);
        assert_eq!(selection.reason, "no assistance signals in chunk or insights");
    }

    #[test]
    fn test_interrogative_word_detected() {
        let selector = ActivePhaseSelector::new();
        let selection = selector.select("when does the migration start", &[]);
        assert!(selection.active.contains(&AssistancePhase::QuestionAnswering));
    }

    #[tokio::test]
    async fn test_mock_phase_service() {
        let card = AssistanceCard::new(
            "answer",
            "Answer",
            "The schema freezes Thursday.",
            AssistancePhase::QuestionAnswering,
        );
        let service = MockPhaseService::with_cards(vec![card]);
        let ctx = PhaseContext {
            session_id: "s1".into(),
            organization_id: "o1".into(),
            chunk_text: "?".into(),
            chunk_index: 0,
            insights: vec![],
            recent_context: String::new(),
        };

        let cards = service.run(&ctx).await.unwrap();
        assert_eq!(cards.len(), 1);

        let failing = MockPhaseService::failing("qa backend down");
        assert!(failing.run(&ctx).await.is_err());
    }
}

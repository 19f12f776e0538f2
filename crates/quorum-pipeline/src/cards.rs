//! Merging redundant assistance cards before they reach the user.

use std::collections::{HashMap, HashSet};

use quorum_types::AssistanceCard;

const CLARIFICATION_CARD: &str = "clarification_needed";
const QUALITY_CARD: &str = "incomplete_action_item";

/// Folds overlapping cards about the same insight into one.
///
/// When a clarification card and an action-item-quality card both
/// target one insight, the user should see a single enhanced quality
/// card, not two prompts about the same problem.
#[derive(Debug, Clone, Default)]
pub struct AssistanceCardDeduplicator;

impl AssistanceCardDeduplicator {
    pub fn new() -> Self {
        Self
    }

    /// Merge redundant cards, preserving the order cards first appeared in.
    pub fn merge(&self, cards: Vec<AssistanceCard>) -> Vec<AssistanceCard> {
        // Clarification cards that share an insight with a quality card
        // get folded into it.
        let quality_insights: HashSet<String> = cards
            .iter()
            .filter(|c| c.card_type == QUALITY_CARD)
            .filter_map(|c| c.insight_id.clone())
            .collect();

        let mut clarifications: HashMap<String, AssistanceCard> = HashMap::new();
        let mut kept: Vec<AssistanceCard> = Vec::new();
        for card in cards {
            let folds = card.card_type == CLARIFICATION_CARD
                && card
                    .insight_id
                    .as_deref()
                    .is_some_and(|id| quality_insights.contains(id));
            if folds {
                if let Some(id) = card.insight_id.clone() {
                    clarifications.insert(id, card);
                }
            } else {
                kept.push(card);
            }
        }

        for card in &mut kept {
            if card.card_type != QUALITY_CARD {
                continue;
            }
            let Some(clarification) = card
                .insight_id
                .as_deref()
                .and_then(|id| clarifications.remove(id))
            else {
                continue;
            };
            card.suggestions.extend(clarification.suggestions);
            if card.vagueness.is_none() {
                card.vagueness = clarification.vagueness;
            }
            card.reasoning = match (card.reasoning.take(), clarification.reasoning) {
                (Some(a), Some(b)) => Some(format!("{} {}", a, b)),
                (a, b) => a.or(b),
            };
        }

        kept
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quorum_types::AssistancePhase;

    fn quality_card(insight_id: &str) -> AssistanceCard {
        AssistanceCard::new(
            QUALITY_CARD,
            "Action item needs detail",
            "This action item is missing an owner.",
            AssistancePhase::ActionItemQuality,
        )
        .with_insight_id(insight_id)
        .with_vagueness("missing owner")
        .with_reasoning("No owner was named.")
    }

    fn clarification_card(insight_id: &str) -> AssistanceCard {
        AssistanceCard::new(
            CLARIFICATION_CARD,
            "Needs clarification",
            "The scope is ambiguous.",
            AssistancePhase::Clarification,
        )
        .with_insight_id(insight_id)
        .with_suggestions(vec!["Ask which services are in scope".to_string()])
        .with_reasoning("Scope was not stated.")
    }

    #[test]
    fn test_merges_clarification_into_quality_card() {
        let dedup = AssistanceCardDeduplicator::new();
        let merged = dedup.merge(vec![clarification_card("i1"), quality_card("i1")]);

        assert_eq!(merged.len(), 1);
        let card = &merged[0];
        assert_eq!(card.card_type, QUALITY_CARD);
        assert_eq!(card.suggestions, vec!["Ask which services are in scope"]);
        assert_eq!(card.vagueness.as_deref(), Some("missing owner"));
        assert_eq!(
            card.reasoning.as_deref(),
            Some("No owner was named. Scope was not stated.")
        );
    }

    #[test]
    fn test_unrelated_insights_stay_separate() {
        let dedup = AssistanceCardDeduplicator::new();
        let merged = dedup.merge(vec![clarification_card("i1"), quality_card("i2")]);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_cards_without_insight_id_untouched() {
        let dedup = AssistanceCardDeduplicator::new();
        let answer = AssistanceCard::new(
            "answer",
            "Answer",
            "Thursday.",
            AssistancePhase::QuestionAnswering,
        );
        let merged = dedup.merge(vec![answer, quality_card("i1")]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].card_type, "answer");
    }
}

//! Fault-isolated execution of the selected assistance phases.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use quorum_types::{AssistanceCard, AssistancePhase, PhaseStatus};

use crate::phases::{PhaseContext, PhaseSelection, SharedPhaseService};

/// Everything the orchestrator produced for one chunk.
#[derive(Debug, Default)]
pub struct OrchestrationOutcome {
    /// Cards from every successful phase, in phase order.
    pub cards: Vec<AssistanceCard>,

    /// Outcome per phase, keyed by wire name. Selected phases report
    /// Success or Failed; unselected phases report Skipped.
    pub phase_status: HashMap<String, PhaseStatus>,

    /// Phases that raised an error.
    pub failed_phases: Vec<String>,

    /// Error text per failed phase.
    pub error_messages: HashMap<String, String>,

    /// Wall-clock time per executed phase, in milliseconds.
    pub timings: HashMap<String, u64>,
}

/// Runs each selected phase inside its own error boundary.
///
/// A phase that fails or times out is logged and recorded; it never
/// propagates, never cancels sibling phases, and never discards the
/// already-extracted insights.
pub struct ProactiveAssistanceOrchestrator {
    services: HashMap<AssistancePhase, SharedPhaseService>,
    phase_timeout: Duration,
}

impl ProactiveAssistanceOrchestrator {
    pub fn new(
        services: HashMap<AssistancePhase, SharedPhaseService>,
        phase_timeout: Duration,
    ) -> Self {
        Self {
            services,
            phase_timeout,
        }
    }

    /// Run every selected phase against `ctx`.
    pub async fn run(&self, selection: &PhaseSelection, ctx: &PhaseContext) -> OrchestrationOutcome {
        let mut outcome = OrchestrationOutcome::default();

        for phase in &selection.skipped {
            outcome
                .phase_status
                .insert(phase.as_str().to_string(), PhaseStatus::Skipped);
        }

        for phase in &selection.active {
            let name = phase.as_str().to_string();
            let Some(service) = self.services.get(phase) else {
                // No collaborator registered for this phase.
                debug!(phase = %name, "No service registered, skipping phase");
                outcome.phase_status.insert(name, PhaseStatus::Skipped);
                continue;
            };

            let started = Instant::now();
            let result = tokio::time::timeout(self.phase_timeout, service.run(ctx)).await;
            let elapsed_ms = started.elapsed().as_millis() as u64;
            outcome.timings.insert(name.clone(), elapsed_ms);

            match result {
                Ok(Ok(cards)) => {
                    debug!(
                        phase = %name,
                        cards = cards.len(),
                        elapsed_ms = elapsed_ms,
                        "Phase completed"
                    );
                    outcome.cards.extend(cards);
                    outcome.phase_status.insert(name, PhaseStatus::Success);
                }
                Ok(Err(err)) => {
                    warn!(phase = %name, error = %err, "Phase failed");
                    outcome.error_messages.insert(name.clone(), err.to_string());
                    outcome.failed_phases.push(name.clone());
                    outcome.phase_status.insert(name, PhaseStatus::Failed);
                }
                Err(_) => {
                    warn!(
                        phase = %name,
                        timeout_ms = self.phase_timeout.as_millis() as u64,
                        "Phase timed out"
                    );
                    outcome.error_messages.insert(
                        name.clone(),
                        format!("phase timed out after {:?}", self.phase_timeout),
                    );
                    outcome.failed_phases.push(name.clone());
                    outcome.phase_status.insert(name, PhaseStatus::Failed);
                }
            }
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::phases::{ActivePhaseSelector, MockPhaseService};
    use quorum_types::{InsightType, MeetingInsight, Priority};

    fn ctx() -> PhaseContext {
        PhaseContext {
            session_id: "s1".into(),
            organization_id: "o1".into(),
            chunk_text: "We agreed John will ship it. Any risks?".into(),
            chunk_index: 3,
            insights: vec![MeetingInsight::new(
                InsightType::ActionItem,
                Priority::High,
                "John ships the feature",
                "",
                3,
                0.9,
            )],
            recent_context: String::new(),
        }
    }

    fn card(card_type: &str, phase: AssistancePhase) -> AssistanceCard {
        AssistanceCard::new(card_type, "t", "b", phase)
    }

    #[tokio::test]
    async fn test_failed_phase_does_not_block_others() {
        let context = ctx();
        let selection = ActivePhaseSelector::new().select(&context.chunk_text, &context.insights);

        let mut services: HashMap<AssistancePhase, SharedPhaseService> = HashMap::new();
        services.insert(
            AssistancePhase::QuestionAnswering,
            Arc::new(MockPhaseService::failing("qa backend down")),
        );
        services.insert(
            AssistancePhase::ActionItemQuality,
            Arc::new(MockPhaseService::with_cards(vec![card(
                "incomplete_action_item",
                AssistancePhase::ActionItemQuality,
            )])),
        );
        services.insert(
            AssistancePhase::Clarification,
            Arc::new(MockPhaseService::with_cards(vec![card(
                "clarification_needed",
                AssistancePhase::Clarification,
            )])),
        );
        services.insert(
            AssistancePhase::ConflictDetection,
            Arc::new(MockPhaseService::with_cards(vec![])),
        );

        let orchestrator =
            ProactiveAssistanceOrchestrator::new(services, Duration::from_secs(5));
        let outcome = orchestrator.run(&selection, &context).await;

        assert_eq!(outcome.cards.len(), 2);
        assert_eq!(outcome.failed_phases, vec!["question_answering"]);
        assert_eq!(
            outcome.phase_status.get("question_answering"),
            Some(&PhaseStatus::Failed)
        );
        assert_eq!(
            outcome.phase_status.get("action_item_quality"),
            Some(&PhaseStatus::Success)
        );
        assert!(
            outcome
                .error_messages
                .get("question_answering")
                .unwrap()
                .contains("qa backend down")
        );
    }

    #[tokio::test]
    async fn test_timeout_is_contained() {
        let context = ctx();
        let selection = ActivePhaseSelector::new().select(&context.chunk_text, &context.insights);

        let mut services: HashMap<AssistancePhase, SharedPhaseService> = HashMap::new();
        services.insert(
            AssistancePhase::ActionItemQuality,
            Arc::new(MockPhaseService::slow(
                vec![card("q", AssistancePhase::ActionItemQuality)],
                Duration::from_millis(200),
            )),
        );

        let orchestrator =
            ProactiveAssistanceOrchestrator::new(services, Duration::from_millis(20));
        let outcome = orchestrator.run(&selection, &context).await;

        assert!(outcome.cards.is_empty());
        assert!(outcome.failed_phases.contains(&"action_item_quality".to_string()));
        assert!(
            outcome
                .error_messages
                .get("action_item_quality")
                .unwrap()
                .contains("timed out")
        );
    }

    #[tokio::test]
    async fn test_unselected_phases_recorded_skipped() {
        let selector = ActivePhaseSelector::new();
        let context = PhaseContext {
            chunk_text: "nothing interesting here".into(),
            insights: vec![],
            ..ctx()
        };
        let selection = selector.select(&context.chunk_text, &context.insights);

        let orchestrator =
            ProactiveAssistanceOrchestrator::new(HashMap::new(), Duration::from_secs(5));
        let outcome = orchestrator.run(&selection, &context).await;

        assert_eq!(outcome.phase_status.len(), 5);
        assert!(
            outcome
                .phase_status
                .values()
                .all(|s| *s == PhaseStatus::Skipped)
        );
        assert!(outcome.failed_phases.is_empty());
    }
}

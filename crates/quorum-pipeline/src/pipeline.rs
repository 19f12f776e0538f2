//! The per-chunk processing pipeline and session finalization.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use quorum_llm::{ProviderCascade, SharedEmbedder};
use quorum_session::{InsightRecord, InsightSink, SessionRegistry, SessionState};
use quorum_types::{
    AssistancePhase, FinalizeSummary, InsightType, MeetingInsight, ProcessingMetadata,
    ProcessingResult, ProcessingStatus, TranscriptChunk,
};

use crate::cards::AssistanceCardDeduplicator;
use crate::config::PipelineConfig;
use crate::dedup::{ChunkDuplicateDetector, InsightDeduplicator};
use crate::error::{Error, Result};
use crate::evolution::InsightEvolutionTracker;
use crate::extractor::{InsightExtractor, related_discussion_insights};
use crate::orchestrator::ProactiveAssistanceOrchestrator;
use crate::phases::{ActivePhaseSelector, PhaseContext, SharedPhaseService};
use crate::store::{SearchFilter, SearchHit, SharedVectorStore};

/// The meeting-intelligence pipeline.
///
/// One instance serves every session; all per-meeting state lives in
/// the registry behind per-session locks. Collaborators are injected
/// at construction so tests substitute mocks without global state.
pub struct MeetingPipeline {
    embedder: SharedEmbedder,
    extractor: InsightExtractor,
    vector_store: Option<SharedVectorStore>,
    orchestrator: ProactiveAssistanceOrchestrator,
    sink: Arc<dyn InsightSink>,
    registry: SessionRegistry,
    chunk_gate: ChunkDuplicateDetector,
    insight_dedup: InsightDeduplicator,
    evolution: InsightEvolutionTracker,
    card_dedup: AssistanceCardDeduplicator,
    selector: ActivePhaseSelector,
    config: PipelineConfig,
}

impl MeetingPipeline {
    pub fn new(
        embedder: SharedEmbedder,
        cascade: Arc<ProviderCascade>,
        vector_store: Option<SharedVectorStore>,
        phase_services: HashMap<AssistancePhase, SharedPhaseService>,
        sink: Arc<dyn InsightSink>,
        config: PipelineConfig,
    ) -> Self {
        let extractor = InsightExtractor::new(
            cascade,
            config.extraction_model.clone(),
            config.extraction_max_tokens,
            config.min_confidence_threshold,
        );
        Self {
            embedder,
            extractor,
            vector_store,
            orchestrator: ProactiveAssistanceOrchestrator::new(phase_services, config.phase_timeout),
            sink,
            registry: SessionRegistry::new(config.session.clone()),
            chunk_gate: ChunkDuplicateDetector::new(
                config.duplicate_window_size,
                config.chunk_duplicate_threshold,
            ),
            insight_dedup: InsightDeduplicator::new(config.semantic_similarity_threshold),
            evolution: InsightEvolutionTracker::new(config.evolution_threshold),
            card_dedup: AssistanceCardDeduplicator::new(),
            selector: ActivePhaseSelector::new(),
            config,
        }
    }

    /// Number of live sessions.
    pub async fn session_count(&self) -> usize {
        self.registry.len().await
    }

    /// Process one transcript chunk for a session.
    ///
    /// The session lock is held for the whole chunk, so chunks within a
    /// session are strictly ordered and `finalize_session` cannot race
    /// an in-flight chunk. A failed extraction produces a `Failed`
    /// result; failed assistance phases degrade the result but never
    /// discard insights.
    pub async fn process_chunk(
        &self,
        session_id: &str,
        project_id: &str,
        organization_id: &str,
        chunk: TranscriptChunk,
        enabled_insight_types: Option<&[InsightType]>,
    ) -> Result<ProcessingResult> {
        let started = Instant::now();

        let handle = self
            .registry
            .get_or_create(session_id, project_id, organization_id)
            .await;
        let mut state = handle.lock().await;

        // Embedding failure fails open: the chunk is treated as novel
        // and skips similarity checks.
        let chunk_embedding = match self.embedder.embed(&chunk.text).await {
            Ok(embedding) => Some(embedding),
            Err(err) => {
                warn!(
                    session_id = %session_id,
                    chunk_index = chunk.index,
                    error = %err,
                    "Chunk embedding failed, treating chunk as novel"
                );
                None
            }
        };

        if let Some(embedding) = &chunk_embedding {
            if let Some(similarity) = self.chunk_gate.check(embedding, &state.window) {
                debug!(
                    session_id = %session_id,
                    chunk_index = chunk.index,
                    similarity = similarity,
                    "Skipping near-duplicate chunk"
                );
                let mut result = ProcessingResult::skipped_duplicate(
                    session_id,
                    chunk.index,
                    similarity,
                    state.window.len(),
                );
                result.total_insights = state.insights.len();
                result.processing_time_ms = started.elapsed().as_millis() as u64;
                result.processing_metadata.chunks_accumulated = state.window.len();
                return Ok(result);
            }
        }

        // Related past discussions, rate-limited per session.
        let related = self
            .search_related(&mut state, chunk_embedding.as_deref())
            .await;
        let semantic_score = related.first().map(|hit| hit.score);

        let recent_context = state.window.get_context_text(3);
        state
            .window
            .add_chunk(chunk.clone(), chunk_embedding.unwrap_or_default());
        state.chunks_processed += 1;

        // A per-call type filter overrides the configured one.
        let enabled_types =
            enabled_insight_types.or(self.config.enabled_insight_types.as_deref());
        let extracted = match self
            .extractor
            .extract(&chunk, &recent_context, &related, enabled_types)
            .await
        {
            Ok(insights) => insights,
            Err(err) => {
                warn!(
                    session_id = %session_id,
                    chunk_index = chunk.index,
                    error = %err,
                    "Extraction failed"
                );
                let mut result = ProcessingResult::empty(session_id, chunk.index);
                result.status = ProcessingStatus::Failed;
                result
                    .error_messages
                    .insert("extraction".to_string(), err.to_string());
                result.total_insights = state.insights.len();
                result.context_window_size = state.window.len();
                result.processing_time_ms = started.elapsed().as_millis() as u64;
                result.processing_metadata.chunks_accumulated = state.window.len();
                return Ok(result);
            }
        };

        let mut candidates = extracted;
        candidates.extend(related_discussion_insights(&related, chunk.index));

        let (new_insights, evolved_insights) = self.reconcile(&mut state, candidates).await;

        // Phase selection sees everything this chunk surfaced.
        let mut surfaced = new_insights.clone();
        surfaced.extend(evolved_insights.iter().cloned());
        let selection = self.selector.select(&chunk.text, &surfaced);

        let phase_ctx = PhaseContext {
            session_id: session_id.to_string(),
            organization_id: organization_id.to_string(),
            chunk_text: chunk.text.clone(),
            chunk_index: chunk.index,
            insights: surfaced,
            recent_context: state.window.get_context_text(3),
        };
        let outcome = self.orchestrator.run(&selection, &phase_ctx).await;
        let cards = self.card_dedup.merge(outcome.cards);

        let status = if outcome.failed_phases.is_empty() {
            ProcessingStatus::Ok
        } else {
            info!(
                session_id = %session_id,
                chunk_index = chunk.index,
                unavailable = outcome.failed_phases.len(),
                "{} AI features temporarily unavailable",
                outcome.failed_phases.len()
            );
            ProcessingStatus::Degraded
        };

        let top_priority = new_insights
            .iter()
            .chain(evolved_insights.iter())
            .map(|i| i.priority)
            .max();

        let metadata = ProcessingMetadata {
            trigger: if selection.active.is_empty() {
                None
            } else if selection.signals.is_empty() {
                Some("insight_types".to_string())
            } else {
                Some("signal".to_string())
            },
            priority: top_priority.map(|p| p.as_str().to_string()),
            semantic_score,
            signals_detected: selection.signals.clone(),
            chunks_accumulated: state.window.len(),
            decision_reason: Some(selection.reason.clone()),
            active_phases: selection
                .active
                .iter()
                .map(|p| p.as_str().to_string())
                .collect(),
            skipped_phases: selection
                .skipped
                .iter()
                .map(|p| p.as_str().to_string())
                .collect(),
            phase_execution_times_ms: outcome.timings,
        };

        Ok(ProcessingResult {
            session_id: session_id.to_string(),
            chunk_index: chunk.index,
            insights: new_insights,
            proactive_assistance: cards,
            evolved_insights,
            status,
            phase_status: outcome.phase_status,
            total_insights: state.insights.len(),
            processing_time_ms: started.elapsed().as_millis() as u64,
            context_window_size: state.window.len(),
            failed_phases: outcome.failed_phases,
            error_messages: outcome.error_messages,
            skipped_reason: None,
            similarity_score: None,
            processing_metadata: metadata,
        })
    }

    /// Finalize a session: persist its insights and free all state.
    ///
    /// Persistence is best-effort; a sink failure is logged and the
    /// in-memory summary is still returned. The session id is safe to
    /// reuse afterwards.
    pub async fn finalize_session(
        &self,
        session_id: &str,
        project_id: &str,
        organization_id: &str,
    ) -> Result<FinalizeSummary> {
        let state = self
            .registry
            .remove(session_id)
            .await
            .ok_or_else(|| Error::SessionNotFound(session_id.to_string()))?;

        let records: Vec<InsightRecord> = state
            .insights
            .iter()
            .map(|i| InsightRecord::from_insight(i, session_id, project_id, organization_id))
            .collect();

        if !records.is_empty() {
            if let Err(err) = self.sink.persist(&records).await {
                warn!(
                    session_id = %session_id,
                    error = %err,
                    "Failed to persist finalized insights"
                );
            }
        }

        info!(
            session_id = %session_id,
            total_insights = state.insights.len(),
            evolution_rate = state.evolution.evolution_rate(),
            "Session finalized"
        );

        Ok(FinalizeSummary {
            session_id: session_id.to_string(),
            total_insights: state.insights.len(),
            insights_by_type: state.insights_by_type(),
            evolution_rate: state.evolution.evolution_rate(),
            insights: state.insights,
        })
    }

    /// Fold extracted candidates into the session's insight history.
    ///
    /// Each candidate is embedded and compared against every tracked
    /// insight. At or above the evolution threshold the candidate is
    /// classified: evolutions replace their tracked slot, exact
    /// duplicates are dropped, and everything else is tracked as new.
    async fn reconcile(
        &self,
        state: &mut SessionState,
        candidates: Vec<MeetingInsight>,
    ) -> (Vec<MeetingInsight>, Vec<MeetingInsight>) {
        let mut new_insights = Vec::new();
        let mut evolved_insights = Vec::new();

        for candidate in candidates {
            let embedding = match self.embedder.embed(&candidate.content).await {
                Ok(embedding) => embedding,
                Err(err) => {
                    warn!(error = %err, "Insight embedding failed, tracking as new");
                    state.track_insight(candidate.clone(), Vec::new());
                    new_insights.push(candidate);
                    continue;
                }
            };

            let closest = self
                .insight_dedup
                .max_similarity(&embedding, &state.insight_embeddings);

            match closest {
                Some((index, similarity)) if self.evolution.in_range(similarity) => {
                    let tracked = &state.insights[index];
                    let result =
                        InsightEvolutionTracker::classify(&candidate, tracked, similarity);
                    if let Some(merged) = result.merged_insight {
                        debug!(
                            insight_id = %merged.insight_id,
                            evolution = result.evolution_type.as_str(),
                            similarity = similarity,
                            "Insight evolved"
                        );
                        // The stored embedding must match the merged record's
                        // content: refined and escalated merges keep the
                        // tracked text, so they keep its embedding too.
                        let stored = if merged.content == candidate.content {
                            embedding
                        } else {
                            state.insight_embeddings[index].clone()
                        };
                        state.replace_insight(index, merged.clone(), stored);
                        evolved_insights.push(merged);
                    } else if self.insight_dedup.is_duplicate(similarity) {
                        debug!(similarity = similarity, "Dropping duplicate insight");
                    } else {
                        // Close but distinct: a new insight.
                        state.track_insight(candidate.clone(), embedding);
                        new_insights.push(candidate);
                    }
                }
                _ => {
                    state.track_insight(candidate.clone(), embedding);
                    new_insights.push(candidate);
                }
            }
        }

        (new_insights, evolved_insights)
    }

    /// Query related past discussions, at most once per
    /// `semantic_search_interval` per session. Failures and timeouts
    /// yield no hits.
    async fn search_related(
        &self,
        state: &mut SessionState,
        embedding: Option<&[f32]>,
    ) -> Vec<SearchHit> {
        let Some(store) = &self.vector_store else {
            return Vec::new();
        };
        let Some(embedding) = embedding else {
            return Vec::new();
        };
        if !state.semantic_search_due(self.config.semantic_search_interval) {
            return Vec::new();
        }
        state.last_semantic_search_at = Some(Instant::now());

        let filter = SearchFilter {
            project_id: Some(state.project_id.clone()),
            exclude_session: Some(state.session_id.clone()),
        };
        let search = store.search(&state.organization_id, embedding, 5, filter);
        match tokio::time::timeout(self.config.search_timeout, search).await {
            Ok(Ok(hits)) => hits,
            Ok(Err(err)) => {
                warn!(
                    session_id = %state.session_id,
                    error = %err,
                    "Vector search failed, continuing without related content"
                );
                Vec::new()
            }
            Err(_) => {
                warn!(
                    session_id = %state.session_id,
                    timeout_ms = self.config.search_timeout.as_millis() as u64,
                    "Vector search timed out, continuing without related content"
                );
                Vec::new()
            }
        }
    }
}

//! LLM insight extraction: prompt building and JSON parsing.

use std::sync::Arc;

use serde::Deserialize;
use tracing::warn;

use quorum_llm::{CompletionRequest, ProviderCascade};
use quorum_types::{InsightType, MeetingInsight, Priority, TranscriptChunk};

use crate::store::SearchHit;

/// Builds the per-chunk extraction prompt and parses the response.
///
/// One LLM call per chunk, never one per insight. Parse failures yield
/// an empty insight list rather than aborting the chunk.
pub struct InsightExtractor {
    cascade: Arc<ProviderCascade>,
    model: String,
    max_tokens: u32,
    min_confidence: f32,
}

impl InsightExtractor {
    pub fn new(
        cascade: Arc<ProviderCascade>,
        model: impl Into<String>,
        max_tokens: u32,
        min_confidence: f32,
    ) -> Self {
        Self {
            cascade,
            model: model.into(),
            max_tokens,
            min_confidence,
        }
    }

    /// Extract insights from one chunk.
    ///
    /// The only error this returns is a failed cascade call; that is the
    /// chunk's fatal path. A response that parses badly is an empty list.
    pub async fn extract(
        &self,
        chunk: &TranscriptChunk,
        recent_context: &str,
        related: &[SearchHit],
        enabled_types: Option<&[InsightType]>,
    ) -> quorum_llm::Result<Vec<MeetingInsight>> {
        let prompt = build_prompt(&chunk.text, recent_context, related);
        let request = CompletionRequest::new(&self.model, prompt, self.max_tokens)
            .with_system(SYSTEM_INSTRUCTION)
            .with_temperature(0.2);

        let cascade_response = self.cascade.send(request).await?;
        let mut insights = parse_insights(
            &cascade_response.response.text,
            chunk.index,
            self.min_confidence,
        );

        if let Some(enabled) = enabled_types {
            insights.retain(|i| enabled.contains(&i.insight_type));
        }

        Ok(insights)
    }
}

const SYSTEM_INSTRUCTION: &str = "You are a meeting-intelligence system. You extract structured \
insights from live meeting transcripts and respond with JSON only.";

const EXTRACTION_INSTRUCTION: &str = r#"Extract insights from the latest transcript segment. Use the recent context only to interpret the segment; extract from the segment itself.

Return a JSON object with this structure:
```json
{
  "insights": [
    {
      "insight_type": "action_item|decision|question|risk|key_point|contradiction|missing_info",
      "priority": "critical|high|medium|low",
      "content": "...",
      "context": "short supporting quote from the transcript",
      "assigned_to": "name or null",
      "due_date": "date text or null",
      "confidence_score": 0.0
    }
  ]
}
```

Rules:
- Extract only what the segment actually says. Do not infer commitments nobody made.
- `confidence_score` is your confidence in [0,1] that the insight is real and correctly typed.
- Set `assigned_to` and `due_date` only when a person or date is named.
- If the segment contains nothing actionable or notable, return {"insights": []}."#;

/// Assemble the full extraction prompt.
fn build_prompt(chunk_text: &str, recent_context: &str, related: &[SearchHit]) -> String {
    let mut prompt = String::with_capacity(2048);

    prompt.push_str(EXTRACTION_INSTRUCTION);

    if !recent_context.is_empty() {
        prompt.push_str("\n\nRecent context:\n");
        prompt.push_str(recent_context);
    }

    let snippets: Vec<&str> = related.iter().filter_map(|h| h.content()).collect();
    if !snippets.is_empty() {
        prompt.push_str("\n\nRelated past discussions:\n");
        for snippet in snippets {
            prompt.push_str("- ");
            prompt.push_str(snippet);
            prompt.push('\n');
        }
    }

    prompt.push_str("\n\nLatest transcript segment:\n");
    prompt.push_str(chunk_text);
    prompt.push_str("\n\nRespond with ONLY the JSON object. No markdown, no explanation.\n");

    prompt
}

#[derive(Debug, Default, Deserialize)]
struct RawExtraction {
    #[serde(default)]
    insights: Vec<RawInsight>,
}

#[derive(Debug, Deserialize)]
struct RawInsight {
    insight_type: String,
    #[serde(default)]
    priority: Option<String>,
    content: String,
    #[serde(default)]
    context: Option<String>,
    #[serde(default)]
    assigned_to: Option<String>,
    #[serde(default)]
    due_date: Option<String>,
    #[serde(default)]
    confidence_score: Option<f32>,
}

/// Parse LLM output into insights, tolerating code fences and prose.
///
/// Items with an unknown type, missing confidence, or confidence below
/// `min_confidence` are dropped.
pub fn parse_insights(raw: &str, chunk_index: u64, min_confidence: f32) -> Vec<MeetingInsight> {
    let cleaned = strip_code_fences(raw);

    let extraction = serde_json::from_str::<RawExtraction>(cleaned)
        .ok()
        .or_else(|| {
            extract_json_object(cleaned)
                .and_then(|json| serde_json::from_str::<RawExtraction>(json).ok())
        });

    let Some(extraction) = extraction else {
        warn!(chunk_index = chunk_index, "Failed to parse extraction response, returning empty");
        return Vec::new();
    };

    extraction
        .insights
        .into_iter()
        .filter_map(|raw| convert_insight(raw, chunk_index, min_confidence))
        .collect()
}

fn convert_insight(
    raw: RawInsight,
    chunk_index: u64,
    min_confidence: f32,
) -> Option<MeetingInsight> {
    let insight_type = InsightType::from_str_opt(&raw.insight_type)?;
    let confidence = raw.confidence_score.unwrap_or(0.0);
    if confidence < min_confidence {
        return None;
    }
    let priority = raw
        .priority
        .as_deref()
        .and_then(Priority::from_str_opt)
        .unwrap_or(Priority::Medium);

    let mut insight = MeetingInsight::new(
        insight_type,
        priority,
        raw.content,
        raw.context.unwrap_or_default(),
        chunk_index,
        confidence,
    );
    if let Some(assigned_to) = raw.assigned_to {
        insight = insight.with_assigned_to(assigned_to);
    }
    if let Some(due_date) = raw.due_date {
        insight = insight.with_due_date(due_date);
    }
    Some(insight)
}

/// Surface the top related-discussion hits as low-priority insights.
pub fn related_discussion_insights(hits: &[SearchHit], chunk_index: u64) -> Vec<MeetingInsight> {
    hits.iter()
        .take(3)
        .filter_map(|hit| {
            let content = hit.content()?;
            let mut insight = MeetingInsight::new(
                InsightType::RelatedDiscussion,
                Priority::Low,
                format!("Related to a past discussion: {}", content),
                content,
                chunk_index,
                hit.score,
            );
            insight.related_content_ids.push(hit.id.clone());
            insight.similarity_scores.push(hit.score);
            Some(insight)
        })
        .collect()
}

/// Strip markdown code fences from LLM output.
fn strip_code_fences(s: &str) -> &str {
    let s = s.trim();

    if let Some(rest) = s.strip_prefix("```json") {
        if let Some(inner) = rest.strip_suffix("```") {
            return inner.trim();
        }
    }
    if let Some(rest) = s.strip_prefix("```") {
        if let Some(inner) = rest.strip_suffix("```") {
            return inner.trim();
        }
    }

    s
}

/// Try to find a top-level JSON object `{...}` in the text.
fn extract_json_object(s: &str) -> Option<&str> {
    let start = s.find('{')?;
    let end = s.rfind('}')?;
    if end > start { Some(&s[start..=end]) } else { None }
}

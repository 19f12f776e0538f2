//! Meeting insights and evolution classification types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Insight Type & Priority
// ─────────────────────────────────────────────────────────────────────────────

/// The kind of structured fact extracted from a transcript chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightType {
    ActionItem,
    Decision,
    Question,
    Risk,
    KeyPoint,
    RelatedDiscussion,
    Contradiction,
    MissingInfo,
}

impl InsightType {
    /// Wire name for this insight type.
    pub fn as_str(&self) -> &'static str {
        match self {
            InsightType::ActionItem => "action_item",
            InsightType::Decision => "decision",
            InsightType::Question => "question",
            InsightType::Risk => "risk",
            InsightType::KeyPoint => "key_point",
            InsightType::RelatedDiscussion => "related_discussion",
            InsightType::Contradiction => "contradiction",
            InsightType::MissingInfo => "missing_info",
        }
    }

    /// Parse a wire name into an insight type.
    pub fn from_str_opt(name: &str) -> Option<Self> {
        match name {
            "action_item" => Some(InsightType::ActionItem),
            "decision" => Some(InsightType::Decision),
            "question" => Some(InsightType::Question),
            "risk" => Some(InsightType::Risk),
            "key_point" => Some(InsightType::KeyPoint),
            "related_discussion" => Some(InsightType::RelatedDiscussion),
            "contradiction" => Some(InsightType::Contradiction),
            "missing_info" => Some(InsightType::MissingInfo),
            _ => None,
        }
    }
}

impl std::fmt::Display for InsightType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Insight priority. Ordered so that escalation can compare:
/// `Low < Medium < High < Critical`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    /// Wire name for this priority.
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Critical => "critical",
        }
    }

    /// Parse a wire name into a priority.
    pub fn from_str_opt(name: &str) -> Option<Self> {
        match name {
            "low" => Some(Priority::Low),
            "medium" => Some(Priority::Medium),
            "high" => Some(Priority::High),
            "critical" => Some(Priority::Critical),
            _ => None,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Meeting Insight
// ─────────────────────────────────────────────────────────────────────────────

/// A structured, typed fact extracted from a transcript chunk.
///
/// Insights are never mutated after creation: evolution produces a new
/// merged record rather than editing the tracked one in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetingInsight {
    /// Unique id.
    pub insight_id: String,

    /// The kind of insight.
    pub insight_type: InsightType,

    /// Priority assigned by extraction (or raised by evolution).
    pub priority: Priority,

    /// The insight content.
    pub content: String,

    /// Context snippet from the transcript around the insight.
    pub context: String,

    /// When the insight was created.
    pub timestamp: DateTime<Utc>,

    /// Owner, for action items.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,

    /// Due date, for action items.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,

    /// Index of the chunk the insight came from.
    pub source_chunk_index: u64,

    /// Extraction confidence in `[0, 1]`.
    pub confidence_score: f32,

    /// Ids of related past discussions (vector-store hits).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related_content_ids: Vec<String>,

    /// Similarity scores parallel to `related_content_ids`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub similarity_scores: Vec<f32>,

    /// Id of the insight this one contradicts, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contradicts_insight_id: Option<String>,

    /// What the contradiction is, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contradiction_detail: Option<String>,
}

impl MeetingInsight {
    /// Create a new insight with a generated id and the current timestamp.
    pub fn new(
        insight_type: InsightType,
        priority: Priority,
        content: impl Into<String>,
        context: impl Into<String>,
        source_chunk_index: u64,
        confidence_score: f32,
    ) -> Self {
        Self {
            insight_id: uuid::Uuid::new_v4().to_string(),
            insight_type,
            priority,
            content: content.into(),
            context: context.into(),
            timestamp: Utc::now(),
            assigned_to: None,
            due_date: None,
            source_chunk_index,
            confidence_score,
            related_content_ids: Vec::new(),
            similarity_scores: Vec::new(),
            contradicts_insight_id: None,
            contradiction_detail: None,
        }
    }

    /// Set the owner.
    pub fn with_assigned_to(mut self, assigned_to: impl Into<String>) -> Self {
        self.assigned_to = Some(assigned_to.into());
        self
    }

    /// Set the due date.
    pub fn with_due_date(mut self, due_date: impl Into<String>) -> Self {
        self.due_date = Some(due_date.into());
        self
    }

    /// Attach related past-discussion references.
    pub fn with_related(mut self, ids: Vec<String>, scores: Vec<f32>) -> Self {
        self.related_content_ids = ids;
        self.similarity_scores = scores;
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Evolution
// ─────────────────────────────────────────────────────────────────────────────

/// How a new insight relates to a previously tracked one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvolutionType {
    /// Content and metadata unchanged; drop silently.
    Duplicate,
    /// Same subject at a higher priority.
    Escalated,
    /// Same subject with materially more detail.
    Expanded,
    /// Same subject with newly populated owner/due-date fields.
    Refined,
}

impl EvolutionType {
    /// Wire name for this evolution type.
    pub fn as_str(&self) -> &'static str {
        match self {
            EvolutionType::Duplicate => "duplicate",
            EvolutionType::Escalated => "escalated",
            EvolutionType::Expanded => "expanded",
            EvolutionType::Refined => "refined",
        }
    }
}

/// Result of classifying a new insight against a tracked one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionResult {
    /// True for `Escalated`/`Expanded`/`Refined`; false for `Duplicate`.
    pub is_evolution: bool,

    /// The classification.
    pub evolution_type: EvolutionType,

    /// Similarity between the new and tracked insight.
    pub similarity_score: f32,

    /// The merged record, present for the three evolution outcomes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merged_insight: Option<MeetingInsight>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_ordering() {
        assert!(Priority::Critical > Priority::High);
        assert!(Priority::High > Priority::Medium);
        assert!(Priority::Medium > Priority::Low);
    }

    #[test]
    fn test_insight_type_roundtrip() {
        for name in [
            "action_item",
            "decision",
            "question",
            "risk",
            "key_point",
            "related_discussion",
            "contradiction",
            "missing_info",
        ] {
            let parsed = InsightType::from_str_opt(name).unwrap();
            assert_eq!(parsed.as_str(), name);
        }
        assert!(InsightType::from_str_opt("banana").is_none());
    }

    #[test]
    fn test_insight_serde_wire_names() {
        let insight = MeetingInsight::new(
            InsightType::ActionItem,
            Priority::High,
            "Migrate the schema",
            "…we should migrate…",
            4,
            0.9,
        );
        let json = serde_json::to_value(&insight).unwrap();
        assert_eq!(json["insight_type"], "action_item");
        assert_eq!(json["priority"], "high");
        assert!(json.get("assigned_to").is_none());
    }

    #[test]
    fn test_insight_builder_fields() {
        let insight = MeetingInsight::new(
            InsightType::ActionItem,
            Priority::Medium,
            "Ship it",
            "ctx",
            1,
            0.8,
        )
        .with_assigned_to("John")
        .with_due_date("Friday");

        assert_eq!(insight.assigned_to.as_deref(), Some("John"));
        assert_eq!(insight.due_date.as_deref(), Some("Friday"));
    }
}

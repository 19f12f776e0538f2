//! Persistence hook for finalized insights.
//!
//! The pipeline is storage-agnostic: at finalize time it hands the
//! session's accumulated insights to an [`InsightSink`]. Backends decide
//! where records go; [`NoPersistence`] drops them and [`MemorySink`]
//! collects them for tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use quorum_types::{InsightType, MeetingInsight, Priority};

use crate::error::Result;

/// Flat record handed to persistence backends at finalize time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightRecord {
    pub id: String,
    pub session_id: String,
    pub project_id: String,
    pub organization_id: String,
    pub insight_type: InsightType,
    pub priority: Priority,
    pub content: String,
    pub context: String,
    pub assigned_to: Option<String>,
    pub due_date: Option<String>,
    pub confidence_score: f32,
    pub chunk_index: u64,

    /// Backend-specific extras.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub metadata: serde_json::Value,
}

impl InsightRecord {
    /// Build a record from a tracked insight and its session identity.
    pub fn from_insight(
        insight: &MeetingInsight,
        session_id: &str,
        project_id: &str,
        organization_id: &str,
    ) -> Self {
        Self {
            id: insight.insight_id.clone(),
            session_id: session_id.to_string(),
            project_id: project_id.to_string(),
            organization_id: organization_id.to_string(),
            insight_type: insight.insight_type,
            priority: insight.priority,
            content: insight.content.clone(),
            context: insight.context.clone(),
            assigned_to: insight.assigned_to.clone(),
            due_date: insight.due_date.clone(),
            confidence_score: insight.confidence_score,
            chunk_index: insight.source_chunk_index,
            metadata: serde_json::Value::Null,
        }
    }
}

/// Destination for finalized insights.
#[async_trait]
pub trait InsightSink: Send + Sync {
    /// Persist a batch of records. Called once per finalized session.
    async fn persist(&self, records: &[InsightRecord]) -> Result<()>;
}

/// A no-op sink for in-memory only operation.
#[derive(Debug, Clone, Default)]
pub struct NoPersistence;

#[async_trait]
impl InsightSink for NoPersistence {
    async fn persist(&self, _records: &[InsightRecord]) -> Result<()> {
        Ok(())
    }
}

/// Test sink that collects every persisted record.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<InsightRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything persisted so far.
    pub async fn records(&self) -> Vec<InsightRecord> {
        self.records.lock().await.clone()
    }
}

#[async_trait]
impl InsightSink for MemorySink {
    async fn persist(&self, records: &[InsightRecord]) -> Result<()> {
        self.records.lock().await.extend_from_slice(records);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_sink_collects() {
        let sink = MemorySink::new();
        let insight = MeetingInsight::new(
            InsightType::Decision,
            Priority::High,
            "Ship on Friday",
            "release planning",
            2,
            0.92,
        );
        let record = InsightRecord::from_insight(&insight, "s1", "p1", "o1");

        sink.persist(&[record]).await.unwrap();

        let stored = sink.records().await;
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].session_id, "s1");
        assert_eq!(stored[0].insight_type, InsightType::Decision);
    }

    #[tokio::test]
    async fn test_no_persistence_is_noop() {
        let sink = NoPersistence;
        assert!(sink.persist(&[]).await.is_ok());
    }
}

//! Transcript chunk: one incremental unit of live transcript text.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One incremental unit of live transcript text.
///
/// Chunks are immutable once created; the pipeline only ever reads them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptChunk {
    /// Unique id for this chunk.
    pub chunk_id: String,

    /// The transcript text.
    pub text: String,

    /// When the chunk was captured.
    pub timestamp: DateTime<Utc>,

    /// Monotonic sequence index within the session.
    pub index: u64,

    /// Speaker attribution, when the transcription provides it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,

    /// Spoken duration in seconds, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f32>,
}

impl TranscriptChunk {
    /// Create a new chunk with a generated id and the current timestamp.
    pub fn new(text: impl Into<String>, index: u64) -> Self {
        Self {
            chunk_id: uuid::Uuid::new_v4().to_string(),
            text: text.into(),
            timestamp: Utc::now(),
            index,
            speaker: None,
            duration_secs: None,
        }
    }

    /// Set the speaker attribution.
    pub fn with_speaker(mut self, speaker: impl Into<String>) -> Self {
        self.speaker = Some(speaker.into());
        self
    }

    /// Set the spoken duration.
    pub fn with_duration_secs(mut self, duration_secs: f32) -> Self {
        self.duration_secs = Some(duration_secs);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_builder() {
        let chunk = TranscriptChunk::new("We will migrate to GraphQL", 3)
            .with_speaker("Dana")
            .with_duration_secs(4.2);

        assert_eq!(chunk.index, 3);
        assert_eq!(chunk.speaker.as_deref(), Some("Dana"));
        assert!(!chunk.chunk_id.is_empty());
    }

    #[test]
    fn test_chunk_serde_skips_empty_options() {
        let chunk = TranscriptChunk::new("hello", 0);
        let json = serde_json::to_value(&chunk).unwrap();
        assert!(json.get("speaker").is_none());
        assert!(json.get("duration_secs").is_none());
    }
}

//! Similarity gates: chunk duplicate detection and insight dedup.

use tracing::debug;

use quorum_llm::cosine_similarity;
use quorum_session::SlidingWindowContext;

/// Drops incoming chunks that are near-duplicates of recent ones.
///
/// Runs before any LLM call; a skipped chunk costs one embedding and
/// nothing else. This is the pipeline's primary cost control.
#[derive(Debug, Clone)]
pub struct ChunkDuplicateDetector {
    /// How many of the most recent window embeddings to compare against.
    pub window_size: usize,

    /// Cosine similarity at or above which the chunk is a duplicate.
    pub threshold: f32,
}

impl ChunkDuplicateDetector {
    pub fn new(window_size: usize, threshold: f32) -> Self {
        Self {
            window_size,
            threshold,
        }
    }

    /// Compare `embedding` against the last `window_size` embeddings in
    /// the window. Returns the first similarity at or above the
    /// threshold, or `None` when the chunk is novel.
    pub fn check(&self, embedding: &[f32], window: &SlidingWindowContext) -> Option<f32> {
        for recent in window.get_recent_embeddings(self.window_size) {
            let similarity = cosine_similarity(embedding, recent);
            if similarity >= self.threshold {
                debug!(
                    similarity = similarity,
                    threshold = self.threshold,
                    "Chunk is a near-duplicate of a recent chunk"
                );
                return Some(similarity);
            }
        }
        None
    }
}

/// Drops newly extracted insights that duplicate tracked ones.
#[derive(Debug, Clone)]
pub struct InsightDeduplicator {
    /// Cosine similarity at or above which an insight is an exact
    /// duplicate.
    pub threshold: f32,
}

impl InsightDeduplicator {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    /// Find the tracked insight most similar to `candidate`.
    ///
    /// Returns `(index, similarity)` of the closest history entry, or
    /// `None` for an empty history. The caller compares the score
    /// against the dedup and evolution thresholds.
    pub fn max_similarity(
        &self,
        candidate: &[f32],
        history: &[Vec<f32>],
    ) -> Option<(usize, f32)> {
        history
            .iter()
            .enumerate()
            .map(|(i, tracked)| (i, cosine_similarity(candidate, tracked)))
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
    }

    /// Whether a similarity score means "exact duplicate, drop it".
    pub fn is_duplicate(&self, similarity: f32) -> bool {
        similarity >= self.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quorum_types::TranscriptChunk;

    #[test]
    fn test_chunk_duplicate_detected() {
        let mut window = SlidingWindowContext::new(10);
        window.add_chunk(TranscriptChunk::new("we will migrate", 0), vec![1.0, 0.0]);

        let detector = ChunkDuplicateDetector::new(5, 0.90);
        let similar = vec![0.99, 0.01];
        assert!(detector.check(&similar, &window).is_some());

        let different = vec![0.0, 1.0];
        assert!(detector.check(&different, &window).is_none());
    }

    #[test]
    fn test_chunk_gate_only_scans_recent() {
        let mut window = SlidingWindowContext::new(10);
        // Old chunk identical to the probe, then 5 unrelated chunks.
        window.add_chunk(TranscriptChunk::new("old", 0), vec![1.0, 0.0]);
        for i in 1..=5 {
            window.add_chunk(TranscriptChunk::new("other", i), vec![0.0, 1.0]);
        }

        let detector = ChunkDuplicateDetector::new(5, 0.90);
        // The matching embedding fell outside the comparison window.
        assert!(detector.check(&[1.0, 0.0], &window).is_none());
    }

    #[test]
    fn test_insight_max_similarity_picks_closest() {
        let dedup = InsightDeduplicator::new(0.85);
        let history = vec![vec![1.0, 0.0], vec![0.7, 0.7], vec![0.0, 1.0]];

        let (index, similarity) = dedup.max_similarity(&[0.0, 0.9], &history).unwrap();
        assert_eq!(index, 2);
        assert!(similarity > 0.99);
        assert!(dedup.is_duplicate(similarity));
    }

    #[test]
    fn test_empty_history() {
        let dedup = InsightDeduplicator::new(0.85);
        assert!(dedup.max_similarity(&[1.0], &[]).is_none());
    }
}

//! Bounded sliding window over recent transcript chunks.

use std::collections::VecDeque;

use tracing::trace;

use quorum_types::TranscriptChunk;

/// Sliding window of the most recent transcript chunks for one session.
///
/// Chunks and their embeddings are held in two deques that evict in
/// lockstep, so index `i` in one always corresponds to index `i` in the
/// other. The window never exceeds `max_chunks` entries and always
/// preserves chronological order.
#[derive(Debug, Clone)]
pub struct SlidingWindowContext {
    chunks: VecDeque<TranscriptChunk>,
    embeddings: VecDeque<Vec<f32>>,
    max_chunks: usize,
}

impl SlidingWindowContext {
    /// Create an empty window with the given capacity.
    pub fn new(max_chunks: usize) -> Self {
        let cap = max_chunks.max(1);
        Self {
            chunks: VecDeque::with_capacity(cap),
            embeddings: VecDeque::with_capacity(cap),
            max_chunks: cap,
        }
    }

    /// Append a chunk and its embedding, evicting the oldest pair when
    /// the window is at capacity.
    pub fn add_chunk(&mut self, chunk: TranscriptChunk, embedding: Vec<f32>) {
        if self.chunks.len() >= self.max_chunks {
            self.chunks.pop_front();
            self.embeddings.pop_front();
        }
        trace!(
            chunk_index = chunk.index,
            window_size = self.chunks.len() + 1,
            "Chunk added to sliding window"
        );
        self.chunks.push_back(chunk);
        self.embeddings.push_back(embedding);
    }

    /// Current number of chunks in the window.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether the window holds no chunks.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Window capacity.
    pub fn max_chunks(&self) -> usize {
        self.max_chunks
    }

    /// Render the last `n` chunks as chronological `[speaker] text` lines.
    ///
    /// Chunks without a speaker render as bare text. Passing `n` larger
    /// than the window renders the whole window.
    pub fn get_context_text(&self, n: usize) -> String {
        let skip = self.chunks.len().saturating_sub(n);
        self.chunks
            .iter()
            .skip(skip)
            .map(|c| match &c.speaker {
                Some(speaker) => format!("[{}] {}", speaker, c.text),
                None => c.text.clone(),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Embeddings of the last `n` chunks, oldest first.
    pub fn get_recent_embeddings(&self, n: usize) -> Vec<&Vec<f32>> {
        let skip = self.embeddings.len().saturating_sub(n);
        self.embeddings.iter().skip(skip).collect()
    }

    /// The most recent chunk, if any.
    pub fn latest_chunk(&self) -> Option<&TranscriptChunk> {
        self.chunks.back()
    }

    /// Iterate over all chunks, oldest first.
    pub fn chunks(&self) -> impl Iterator<Item = &TranscriptChunk> {
        self.chunks.iter()
    }
}

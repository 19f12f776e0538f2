//! Text embeddings for similarity gating and dedup.
//!
//! The [`Embedder`] trait turns text into a dense vector. The pipeline
//! compares these vectors with [`cosine_similarity`] to gate near-duplicate
//! chunks and to match new insights against tracked ones. Embedding failure
//! is treated as "not similar" by callers, so implementations only need to
//! report honest errors.

use async_trait::async_trait;
use reqwest::{Client, Response, header};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{ProviderError, RateLimitInfo, Result};

/// Default embeddings API base URL.
const DEFAULT_EMBEDDINGS_BASE: &str = "https://api.openai.com/v1";

/// Default embedding model.
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Default timeout for embedding requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

// ─────────────────────────────────────────────────────────────────────────────
// Embedder Trait
// ─────────────────────────────────────────────────────────────────────────────

/// Trait for generating text embeddings.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single text into a dense vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Dimensionality of the vectors this embedder produces.
    fn dimensions(&self) -> usize;

    /// Name of this embedder for logging.
    fn name(&self) -> &str;
}

/// A shared embedder that can be used across tasks.
pub type SharedEmbedder = Arc<dyn Embedder>;

// ─────────────────────────────────────────────────────────────────────────────
// Mock Embedder
// ─────────────────────────────────────────────────────────────────────────────

/// Deterministic embedder for tests.
///
/// Each text is reduced to an FNV-1a seed, and the vector is drawn from an
/// xorshift stream off that seed. Equal texts always map to equal vectors.
#[derive(Debug, Clone)]
pub struct MockEmbedder {
    dimensions: usize,
}

impl MockEmbedder {
    /// Create a mock embedder producing vectors of the given dimensionality.
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn seed_for(text: &str) -> u64 {
        text.bytes().fold(0xcbf2_9ce4_8422_2325_u64, |acc, b| {
            (acc ^ u64::from(b)).wrapping_mul(0x0000_0100_0000_01b3)
        })
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new(384)
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        // Zero seed would make xorshift emit all zeros.
        let mut state = Self::seed_for(text) | 1;
        let mut vector: Vec<f32> = (0..self.dimensions)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                (state as f32 / u64::MAX as f32) * 2.0 - 1.0
            })
            .collect();

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "mock"
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// OpenAI Embedder
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration for the OpenAI embeddings adapter.
#[derive(Debug, Clone)]
pub struct OpenAiEmbedderConfig {
    /// API key for authentication.
    pub api_key: String,

    /// Base URL for the API.
    pub base_url: String,

    /// Embedding model to request.
    pub model: String,

    /// Request timeout.
    pub timeout: Duration,
}

impl OpenAiEmbedderConfig {
    /// Create a new config with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_EMBEDDINGS_BASE.to_string(),
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Create config from environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            ProviderError::Config("OPENAI_API_KEY environment variable not set".to_string())
        })?;
        Ok(Self::new(api_key))
    }

    /// Set a custom base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the embedding model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// OpenAI embeddings API adapter.
pub struct OpenAiEmbedder {
    client: Client,
    config: OpenAiEmbedderConfig,
    dimensions: usize,
}

impl OpenAiEmbedder {
    /// Create a new OpenAI embedder with the given configuration.
    pub fn new(config: OpenAiEmbedderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                ProviderError::Internal(format!("Failed to create HTTP client: {}", e))
            })?;

        let dimensions = model_dimensions(&config.model);

        Ok(Self {
            client,
            config,
            dimensions,
        })
    }

    /// Create an embedder from environment configuration.
    pub fn from_env() -> Result<Self> {
        Self::new(OpenAiEmbedderConfig::from_env()?)
    }

    fn embeddings_url(&self) -> String {
        format!("{}/embeddings", self.config.base_url)
    }

    /// Handle the API response, classifying errors at the boundary.
    async fn handle_response(response: Response) -> Result<Vec<f32>> {
        if !response.status().is_success() {
            return Err(Self::classify_error_response(response).await);
        }

        let body = response.text().await?;
        let parsed: EmbeddingResponse = serde_json::from_str(&body)
            .map_err(|e| ProviderError::Serialization(e.to_string()))?;

        parsed
            .data
            .into_iter()
            .next()
            .map(|row| row.embedding)
            .ok_or_else(|| {
                ProviderError::Serialization("embedding response carried no vectors".to_string())
            })
    }

    /// Map an error response into the shared taxonomy.
    ///
    /// The only place OpenAI-specific failure shapes are inspected; callers
    /// branch on the typed variants.
    async fn classify_error_response(response: Response) -> ProviderError {
        let status = response.status().as_u16();

        // Extract Retry-After header before consuming response
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let body = response.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<EmbeddingErrorEnvelope>(&body) {
            Ok(envelope) => envelope.error.message,
            Err(_) => format!("HTTP {}: {}", status, body),
        };

        classify_status(status, retry_after.as_deref(), message)
    }
}

/// Map an HTTP status onto a [`ProviderError`] variant.
fn classify_status(status: u16, retry_after: Option<&str>, message: String) -> ProviderError {
    match status {
        401 | 403 => ProviderError::Auth(message),
        429 => ProviderError::RateLimited(RateLimitInfo::from_response(&message, retry_after)),
        503 => ProviderError::Overloaded(message),
        500..=599 => ProviderError::Backend(format!("Server error: {}", message)),
        _ => ProviderError::Backend(message),
    }
}

fn model_dimensions(model: &str) -> usize {
    match model {
        "text-embedding-3-large" => 3072,
        _ => 1536,
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let body = EmbeddingRequest {
            model: &self.config.model,
            input: text,
        };

        let response = self
            .client
            .post(self.embeddings_url())
            .bearer_auth(&self.config.api_key)
            .header(header::CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "openai"
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// API Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, serde::Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, serde::Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingRow>,
}

#[derive(Debug, serde::Deserialize)]
struct EmbeddingRow {
    embedding: Vec<f32>,
}

#[derive(Debug, serde::Deserialize)]
struct EmbeddingErrorEnvelope {
    error: EmbeddingErrorBody,
}

#[derive(Debug, serde::Deserialize)]
struct EmbeddingErrorBody {
    message: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Similarity
// ─────────────────────────────────────────────────────────────────────────────

/// Cosine similarity between two vectors.
///
/// Returns 0.0 for mismatched lengths or zero-magnitude inputs, which reads
/// as "unrelated" at every threshold the pipeline applies.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let (dot, mag_a, mag_b) = a
        .iter()
        .zip(b)
        .fold((0.0f32, 0.0f32, 0.0f32), |(dot, ma, mb), (x, y)| {
            (dot + x * y, ma + x * x, mb + y * y)
        });

    let denom = (mag_a * mag_b).sqrt();
    if denom > 0.0 { dot / denom } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_embedder_is_deterministic() {
        let embedder = MockEmbedder::default();
        let first = embedder.embed("move the launch to friday").await.unwrap();
        let again = embedder.embed("move the launch to friday").await.unwrap();
        assert_eq!(first, again);

        let other = embedder.embed("budget review is overdue").await.unwrap();
        assert_ne!(first, other);
    }

    #[tokio::test]
    async fn test_mock_embedder_unit_norm() {
        let embedder = MockEmbedder::new(64);
        let vector = embedder.embed("any text at all").await.unwrap();
        assert_eq!(vector.len(), 64);

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_cosine_similarity_extremes() {
        let east = [2.0, 0.0];
        assert!((cosine_similarity(&east, &[5.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&east, &[0.0, 3.0]).abs() < 1e-6);
        assert!((cosine_similarity(&east, &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn test_classify_status_variants() {
        assert!(matches!(
            classify_status(401, None, "bad key".into()),
            ProviderError::Auth(_)
        ));
        assert!(matches!(
            classify_status(429, Some("2"), "slow down".into()),
            ProviderError::RateLimited(_)
        ));
        assert!(matches!(
            classify_status(503, None, "busy".into()),
            ProviderError::Overloaded(_)
        ));
        assert!(matches!(
            classify_status(500, None, "boom".into()),
            ProviderError::Backend(_)
        ));
    }

    #[test]
    fn test_error_envelope_parse() {
        let body = r#"{"error": {"message": "Incorrect API key", "type": "invalid_request_error"}}"#;
        let envelope: EmbeddingErrorEnvelope = serde_json::from_str(body).unwrap();
        assert_eq!(envelope.error.message, "Incorrect API key");
    }

    #[test]
    fn test_embedder_config_defaults_and_builder() {
        let config = OpenAiEmbedderConfig::new("key");
        assert_eq!(config.model, DEFAULT_EMBEDDING_MODEL);
        assert_eq!(config.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));

        let config = config
            .with_base_url("http://localhost:9090/v1")
            .with_model("text-embedding-3-large")
            .with_timeout(Duration::from_secs(5));
        assert_eq!(config.base_url, "http://localhost:9090/v1");
        assert_eq!(model_dimensions(&config.model), 3072);
        assert_eq!(config.timeout, Duration::from_secs(5));
    }
}

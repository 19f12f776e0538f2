//! Provider resilience layer for Quorum.
//!
//! This crate is the only place the meeting pipeline touches external LLM
//! providers. It provides:
//!
//! - A [`ProviderClient`] trait that all adapters implement, producing one
//!   normalized [`ProviderResponse`] shape and one classified
//!   [`ProviderError`] taxonomy.
//! - Concrete adapters for Anthropic and OpenAI-compatible APIs.
//! - A [`ProviderCascade`] implementing retry with backoff + jitter,
//!   per-provider circuit breaking, and cross-provider fallback with model
//!   translation.
//! - An [`Embedder`] trait with mock and OpenAI implementations.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  ProviderCascade                             │
//! │  retry → breaker → fallback + model map      │
//! └──────────────────────────────────────────────┘
//!            │                      │
//!            ▼                      ▼
//!     ┌────────────┐         ┌────────────┐
//!     │ Anthropic  │         │  OpenAI    │
//!     └────────────┘         └────────────┘
//! ```

pub mod breaker;
pub mod cascade;
pub mod embeddings;
pub mod error;
pub mod provider;
pub mod types;

// Provider implementations
pub mod anthropic;
pub mod openai;

pub use breaker::{BreakerState, CircuitBreaker};
pub use cascade::{CascadeConfig, CascadeResponse, ModelMap, ProviderCascade};
pub use embeddings::{
    Embedder, MockEmbedder, OpenAiEmbedder, OpenAiEmbedderConfig, SharedEmbedder,
    cosine_similarity,
};
pub use error::{ProviderError, RateLimitInfo, Result};
pub use provider::{MockOutcome, MockProvider, ProviderClient, SharedProvider};
pub use types::{CompletionRequest, ProviderAttempt, ProviderResponse, Usage};

pub use anthropic::{AnthropicConfig, AnthropicProvider};
pub use openai::{OpenAiConfig, OpenAiProvider};

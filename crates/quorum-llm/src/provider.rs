//! Provider client trait and mock implementation.
//!
//! This module defines the abstraction layer for LLM providers. Concrete
//! adapters (Anthropic, OpenAI) classify their native failures into the
//! shared [`ProviderError`](crate::error::ProviderError) taxonomy at this
//! boundary, so the cascade never inspects provider-specific errors.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::{ProviderError, Result};
use crate::types::{CompletionRequest, ProviderResponse};

// ─────────────────────────────────────────────────────────────────────────────
// Provider Trait
// ─────────────────────────────────────────────────────────────────────────────

/// Trait for LLM provider adapters.
///
/// Implementations connect to a concrete API and are required to produce
/// the normalized [`ProviderResponse`] / classified error contract.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Execute a completion request and return the normalized response.
    async fn complete(&self, request: CompletionRequest) -> Result<ProviderResponse>;

    /// Get the name of this provider.
    fn name(&self) -> &str;
}

/// A provider that can be shared across tasks.
pub type SharedProvider = Arc<dyn ProviderClient>;

// ─────────────────────────────────────────────────────────────────────────────
// Mock Provider
// ─────────────────────────────────────────────────────────────────────────────

/// Scripted outcome for the mock provider.
pub type MockOutcome = std::result::Result<ProviderResponse, ProviderError>;

/// A mock provider for testing purposes.
///
/// Returns pre-configured outcomes in order and records every request,
/// useful for deterministic testing of retry and fallback policy.
pub struct MockProvider {
    name: String,
    outcomes: std::sync::Mutex<Vec<MockOutcome>>,
    request_log: std::sync::Mutex<Vec<CompletionRequest>>,
}

impl MockProvider {
    /// Create a new mock provider with the given name and outcomes.
    ///
    /// Outcomes are returned in order. If more requests are made than
    /// outcomes available, a `Backend` error is returned.
    pub fn new(name: impl Into<String>, outcomes: Vec<MockOutcome>) -> Self {
        Self {
            name: name.into(),
            outcomes: std::sync::Mutex::new(outcomes),
            request_log: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Create a mock provider that always answers with the given text.
    pub fn with_text(name: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        Self::new(
            name,
            vec![Ok(ProviderResponse::new(
                text,
                "mock-model",
                crate::types::Usage::new(10, 20),
            ))],
        )
    }

    /// Get all requests that were made to this provider.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.request_log.lock().unwrap().clone()
    }

    /// Get the number of requests made.
    pub fn request_count(&self) -> usize {
        self.request_log.lock().unwrap().len()
    }
}

#[async_trait]
impl ProviderClient for MockProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<ProviderResponse> {
        self.request_log.lock().unwrap().push(request);

        let mut outcomes = self.outcomes.lock().unwrap();
        if outcomes.is_empty() {
            return Err(ProviderError::Backend(
                "MockProvider: no more outcomes available".to_string(),
            ));
        }
        outcomes.remove(0)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

//! Core types for provider requests and responses.
//!
//! Every adapter is required to produce the same normalized
//! [`ProviderResponse`] shape, so nothing downstream ever inspects
//! provider-specific response structures.

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Completion Request
// ─────────────────────────────────────────────────────────────────────────────

/// A completion request to an LLM provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// The model to use for completion.
    pub model: String,

    /// The user prompt.
    pub prompt: String,

    /// Maximum tokens to generate.
    pub max_tokens: u32,

    /// Temperature for sampling (0.0 to 1.0).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// System prompt (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
}

impl CompletionRequest {
    /// Create a new completion request.
    pub fn new(model: impl Into<String>, prompt: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            max_tokens,
            temperature: None,
            system: None,
        }
    }

    /// Set the system prompt.
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Set temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Return a copy of this request retargeted at a different model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Provider Response
// ─────────────────────────────────────────────────────────────────────────────

/// Token usage statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Tokens consumed by the prompt.
    pub input_tokens: u32,
    /// Tokens generated in the response.
    pub output_tokens: u32,
}

impl Usage {
    /// Create a new usage record.
    pub fn new(input_tokens: u32, output_tokens: u32) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }

    /// Total tokens (input + output).
    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

/// The normalized response every adapter produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// The generated text.
    pub text: String,

    /// The model that produced the response.
    pub model: String,

    /// Token usage statistics.
    pub usage: Usage,
}

impl ProviderResponse {
    /// Create a new response.
    pub fn new(text: impl Into<String>, model: impl Into<String>, usage: Usage) -> Self {
        Self {
            text: text.into(),
            model: model.into(),
            usage,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Provider Attempt
// ─────────────────────────────────────────────────────────────────────────────

/// One attempted provider call, recorded in cascade metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderAttempt {
    /// Provider name (e.g. "anthropic").
    pub provider: String,
    /// Model the attempt targeted.
    pub model: String,
    /// Whether the call succeeded.
    pub success: bool,
    /// Error classification if it failed (e.g. "overloaded").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProviderAttempt {
    /// Record a successful attempt.
    pub fn success(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            success: true,
            error: None,
        }
    }

    /// Record a failed attempt with its error class.
    pub fn failure(
        provider: impl Into<String>,
        model: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            success: false,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let request = CompletionRequest::new("claude-sonnet-4-5", "Hello", 256)
            .with_system("You are terse.")
            .with_temperature(0.2);

        assert_eq!(request.model, "claude-sonnet-4-5");
        assert_eq!(request.prompt, "Hello");
        assert_eq!(request.max_tokens, 256);
        assert_eq!(request.system.as_deref(), Some("You are terse."));
        assert_eq!(request.temperature, Some(0.2));
    }

    #[test]
    fn test_request_with_model() {
        let request = CompletionRequest::new("claude-sonnet-4-5", "Hi", 64).with_model("gpt-4o");
        assert_eq!(request.model, "gpt-4o");
        assert_eq!(request.prompt, "Hi");
    }

    #[test]
    fn test_usage_total() {
        let usage = Usage::new(120, 45);
        assert_eq!(usage.total(), 165);
    }

    #[test]
    fn test_attempt_constructors() {
        let ok = ProviderAttempt::success("anthropic", "claude-sonnet-4-5");
        assert!(ok.success);
        assert!(ok.error.is_none());

        let failed = ProviderAttempt::failure("anthropic", "claude-sonnet-4-5", "overloaded");
        assert!(!failed.success);
        assert_eq!(failed.error.as_deref(), Some("overloaded"));
    }

    #[test]
    fn test_response_serializes_flat() {
        let response = ProviderResponse::new("hi", "gpt-4o", Usage::new(1, 2));
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["text"], "hi");
        assert_eq!(json["usage"]["input_tokens"], 1);
        assert_eq!(json["usage"]["output_tokens"], 2);
    }
}

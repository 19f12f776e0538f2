//! OpenAI-compatible API adapter.
//!
//! Speaks the Chat Completions wire format and is used as the fallback
//! provider in the cascade. Error classification mirrors the Anthropic
//! adapter: native failures become typed [`ProviderError`] variants here
//! and nowhere else.

use async_trait::async_trait;
use reqwest::{Client, Response, header};
use std::time::Duration;

use crate::error::{ProviderError, RateLimitInfo, Result};
use crate::provider::ProviderClient;
use crate::types::{CompletionRequest, ProviderResponse, Usage};

/// Default API base URL.
const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Default timeout for requests.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration for the OpenAI adapter.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// API key for authentication.
    pub api_key: String,

    /// Base URL for the API.
    pub base_url: String,

    /// Request timeout.
    pub timeout: Duration,
}

impl OpenAiConfig {
    /// Create a new config with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_API_BASE.to_string(),
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

    /// Set a custom base URL (for OpenAI-compatible servers).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// OpenAI Provider
// ─────────────────────────────────────────────────────────────────────────────

/// OpenAI API provider adapter.
pub struct OpenAiProvider {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiProvider {
    /// Create a new OpenAI provider with the given configuration.
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                ProviderError::Internal(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { client, config })
    }

    /// Create a provider from environment configuration.
    pub fn from_env() -> Result<Self> {
        Self::new(OpenAiConfig::from_env()?)
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url)
    }

    fn add_headers(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .header(
                header::AUTHORIZATION,
                format!("Bearer {}", self.config.api_key),
            )
            .header(header::CONTENT_TYPE, "application/json")
    }

    async fn handle_response(response: Response) -> Result<ProviderResponse> {
        if !response.status().is_success() {
            return Err(Self::classify_error_response(response).await);
        }

        let body = response.text().await?;
        let parsed: ApiResponse = serde_json::from_str(&body)
            .map_err(|e| ProviderError::Serialization(e.to_string()))?;

        parsed.normalize()
    }

    /// Map an error response into the shared taxonomy.
    async fn classify_error_response(response: Response) -> ProviderError {
        let status = response.status();

        let retry_after_header = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let body = response.text().await.unwrap_or_default();

        let message = match serde_json::from_str::<ApiErrorEnvelope>(&body) {
            Ok(envelope) => envelope.error.message,
            Err(_) => format!("HTTP {}: {}", status, body),
        };

        match status.as_u16() {
            401 | 403 => ProviderError::Auth(message),
            429 => ProviderError::RateLimited(RateLimitInfo::from_response(
                &message,
                retry_after_header.as_deref(),
            )),
            503 => ProviderError::Overloaded(message),
            500..=599 => ProviderError::Backend(format!("Server error: {}", message)),
            _ => ProviderError::Backend(message),
        }
    }
}

#[async_trait]
impl ProviderClient for OpenAiProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<ProviderResponse> {
        let body = ApiRequest::from(&request);

        let response = self
            .add_headers(self.client.post(self.completions_url()))
            .json(&body)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    fn name(&self) -> &str {
        "openai"
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// API Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, serde::Serialize)]
struct ApiRequest {
    model: String,
    messages: Vec<ApiMessage>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, serde::Serialize)]
struct ApiMessage {
    role: &'static str,
    content: String,
}

impl From<&CompletionRequest> for ApiRequest {
    fn from(request: &CompletionRequest) -> Self {
        let mut messages = Vec::with_capacity(2);
        if let Some(ref system) = request.system {
            messages.push(ApiMessage {
                role: "system",
                content: system.clone(),
            });
        }
        messages.push(ApiMessage {
            role: "user",
            content: request.prompt.clone(),
        });

        Self {
            model: request.model.clone(),
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        }
    }
}

#[derive(Debug, serde::Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
    model: String,
    usage: ApiUsage,
}

#[derive(Debug, serde::Deserialize)]
struct ApiChoice {
    message: ApiChoiceMessage,
}

#[derive(Debug, serde::Deserialize)]
struct ApiChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

impl ApiResponse {
    fn normalize(self) -> Result<ProviderResponse> {
        let text = self
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                ProviderError::Serialization("Response contained no choices".to_string())
            })?;

        Ok(ProviderResponse::new(
            text,
            self.model,
            Usage::new(self.usage.prompt_tokens, self.usage.completion_tokens),
        ))
    }
}

#[derive(Debug, serde::Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, serde::Deserialize)]
struct ApiErrorBody {
    message: String,
}

//! Anthropic API adapter.
//!
//! Connects to Anthropic's Messages API and maps its failure modes into the
//! shared [`ProviderError`] taxonomy in one place.

use async_trait::async_trait;
use reqwest::{Client, Response, header};
use std::time::Duration;

use crate::error::{ProviderError, RateLimitInfo, Result};
use crate::provider::ProviderClient;
use crate::types::{CompletionRequest, ProviderResponse, Usage};

/// Default API base URL.
const DEFAULT_API_BASE: &str = "https://api.anthropic.com";

/// Default API version.
const DEFAULT_API_VERSION: &str = "2023-06-01";

/// Default timeout for requests.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration for the Anthropic adapter.
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    /// API key for authentication.
    pub api_key: String,

    /// Base URL for the API.
    pub base_url: String,

    /// API version header.
    pub api_version: String,

    /// Request timeout.
    pub timeout: Duration,
}

impl AnthropicConfig {
    /// Create a new config with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_API_BASE.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Create config from environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY").map_err(|_| {
            ProviderError::Config("ANTHROPIC_API_KEY environment variable not set".to_string())
        })?;
        Ok(Self::new(api_key))
    }

    /// Set a custom base URL.
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
// Anthropic Provider
// ─────────────────────────────────────────────────────────────────────────────

/// Anthropic API provider adapter.
pub struct AnthropicProvider {
    client: Client,
    config: AnthropicConfig,
}

impl AnthropicProvider {
    /// Create a new Anthropic provider with the given configuration.
    pub fn new(config: AnthropicConfig) -> Result<Self> {
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
        Self::new(AnthropicConfig::from_env()?)
    }

    /// Build the messages endpoint URL.
    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.config.base_url)
    }

    /// Add authentication and API headers to a request.
    fn add_headers(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", &self.config.api_version)
            .header(header::CONTENT_TYPE, "application/json")
    }

    /// Handle the API response, classifying errors at the boundary.
    async fn handle_response(response: Response) -> Result<ProviderResponse> {
        if !response.status().is_success() {
            return Err(Self::classify_error_response(response).await);
        }

        let body = response.text().await?;
        let parsed: ApiResponse = serde_json::from_str(&body)
            .map_err(|e| ProviderError::Serialization(e.to_string()))?;

        Ok(parsed.into())
    }

    /// Map an error response into the shared taxonomy.
    ///
    /// This is the only place Anthropic-specific failure shapes are
    /// inspected; callers branch on the typed variants.
    async fn classify_error_response(response: Response) -> ProviderError {
        let status = response.status();

        // Extract Retry-After header before consuming response
        let retry_after_header = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let body = response.text().await.unwrap_or_default();

        let (error_type, message) = match serde_json::from_str::<ApiErrorEnvelope>(&body) {
            Ok(envelope) => (envelope.error.error_type, envelope.error.message),
            Err(_) => (String::new(), format!("HTTP {}: {}", status, body)),
        };

        match status.as_u16() {
            401 | 403 => ProviderError::Auth(message),
            429 => ProviderError::RateLimited(RateLimitInfo::from_response(
                &message,
                retry_after_header.as_deref(),
            )),
            529 => ProviderError::Overloaded(message),
            500..=599 if error_type == "overloaded_error" => ProviderError::Overloaded(message),
            500..=599 => ProviderError::Backend(format!("Server error: {}", message)),
            _ => ProviderError::Backend(message),
        }
    }
}

#[async_trait]
impl ProviderClient for AnthropicProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<ProviderResponse> {
        let body = ApiRequest::from(&request);

        let response = self
            .add_headers(self.client.post(self.messages_url()))
            .json(&body)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    fn name(&self) -> &str {
        "anthropic"
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// API Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, serde::Serialize)]
struct ApiRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<ApiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
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
        Self {
            model: request.model.clone(),
            max_tokens: request.max_tokens,
            messages: vec![ApiMessage {
                role: "user",
                content: request.prompt.clone(),
            }],
            system: request.system.clone(),
            temperature: request.temperature,
        }
    }
}

#[derive(Debug, serde::Deserialize)]
struct ApiResponse {
    content: Vec<ApiContentBlock>,
    model: String,
    usage: ApiUsage,
}

#[derive(Debug, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ApiContentBlock {
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, serde::Deserialize)]
struct ApiUsage {
    input_tokens: u32,
    output_tokens: u32,
}

impl From<ApiResponse> for ProviderResponse {
    fn from(api: ApiResponse) -> Self {
        let text = api
            .content
            .iter()
            .filter_map(|block| match block {
                ApiContentBlock::Text { text } => Some(text.as_str()),
                ApiContentBlock::Other => None,
            })
            .collect::<Vec<_>>()
            .join("");

        ProviderResponse::new(
            text,
            api.model,
            Usage::new(api.usage.input_tokens, api.usage.output_tokens),
        )
    }
}

#[derive(Debug, serde::Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, serde::Deserialize)]
struct ApiErrorBody {
    #[serde(rename = "type", default)]
    error_type: String,
    message: String,
}

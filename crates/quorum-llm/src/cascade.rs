//! Provider cascade: retry, circuit breaking, and cross-provider fallback.
//!
//! The [`ProviderCascade`] wraps a primary and an optional fallback
//! [`ProviderClient`](crate::provider::ProviderClient) and applies a policy
//! per classified error:
//!
//! - **Overloaded** → immediate fallback, no retry budget spent on a
//!   provider that told us it is drowning.
//! - **RateLimited** → bounded retries with exponential backoff + jitter
//!   (honoring `Retry-After` when given); fallback only if configured.
//! - **Timeout / Network** → bounded retries; fallback only if configured.
//! - **Auth** → propagate immediately. A bad key is a config error, not a
//!   transient fault.
//!
//! Falling back requires a model translation: the fallback provider is
//! asked for the equivalent of the requested model, never the literal
//! model name of the primary.

use std::collections::HashMap;
use std::time::Duration;

use rand::Rng;

use crate::breaker::CircuitBreaker;
use crate::error::{ProviderError, Result};
use crate::provider::SharedProvider;
use crate::types::{CompletionRequest, ProviderAttempt, ProviderResponse};

// ─────────────────────────────────────────────────────────────────────────────
// Model Map
// ─────────────────────────────────────────────────────────────────────────────

/// Cross-provider model equivalence table.
///
/// Maps `(model, target provider)` to the model name the target provider
/// should run instead. Fallback is refused when no mapping exists.
#[derive(Debug, Clone, Default)]
pub struct ModelMap {
    entries: HashMap<(String, String), String>,
}

impl ModelMap {
    /// Create an empty model map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an equivalence: `model` on `provider` is `equivalent`.
    pub fn insert(
        mut self,
        model: impl Into<String>,
        provider: impl Into<String>,
        equivalent: impl Into<String>,
    ) -> Self {
        self.entries
            .insert((model.into(), provider.into()), equivalent.into());
        self
    }

    /// Translate a model name for the given provider, if a mapping exists.
    pub fn translate(&self, model: &str, provider: &str) -> Option<&str> {
        self.entries
            .get(&(model.to_string(), provider.to_string()))
            .map(|s| s.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration for the cascade policy.
#[derive(Debug, Clone)]
pub struct CascadeConfig {
    /// Maximum retries on the primary for retryable errors.
    pub max_retries: u32,
    /// Initial backoff duration; doubles per attempt.
    pub initial_backoff: Duration,
    /// Cap on a single backoff sleep.
    pub max_backoff: Duration,
    /// Add up to 50% random jitter to each backoff sleep.
    pub jitter: bool,
    /// Whether fallback is enabled at all.
    pub fallback_enabled: bool,
    /// Fall back after exhausting rate-limit retries.
    pub fallback_on_rate_limit: bool,
    /// Fall back after exhausting timeout/network retries.
    pub fallback_on_timeout: bool,
    /// Consecutive failures before a provider's breaker opens.
    pub breaker_failure_threshold: u32,
    /// How long an open breaker rejects requests.
    pub breaker_cooldown: Duration,
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_secs(8),
            jitter: true,
            fallback_enabled: true,
            fallback_on_rate_limit: false,
            fallback_on_timeout: false,
            breaker_failure_threshold: 5,
            breaker_cooldown: Duration::from_secs(30),
        }
    }
}

impl CascadeConfig {
    /// Set the retry budget.
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set the initial backoff.
    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    /// Enable or disable fallback entirely.
    pub fn with_fallback_enabled(mut self, enabled: bool) -> Self {
        self.fallback_enabled = enabled;
        self
    }

    /// Allow fallback after rate-limit retries are exhausted.
    pub fn with_fallback_on_rate_limit(mut self, enabled: bool) -> Self {
        self.fallback_on_rate_limit = enabled;
        self
    }

    /// Allow fallback after timeout retries are exhausted.
    pub fn with_fallback_on_timeout(mut self, enabled: bool) -> Self {
        self.fallback_on_timeout = enabled;
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Cascade Response
// ─────────────────────────────────────────────────────────────────────────────

/// A successful cascade call with routing metadata.
#[derive(Debug, Clone)]
pub struct CascadeResponse {
    /// The normalized provider response.
    pub response: ProviderResponse,
    /// Name of the provider that answered.
    pub provider: String,
    /// Model that actually ran.
    pub model: String,
    /// Whether the fallback provider answered.
    pub fallback_triggered: bool,
    /// The translated model, when fallback answered.
    pub fallback_model: Option<String>,
    /// Every attempted call, in order.
    pub attempts: Vec<ProviderAttempt>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Provider Cascade
// ─────────────────────────────────────────────────────────────────────────────

/// Primary/fallback provider pair with per-provider circuit breakers.
pub struct ProviderCascade {
    primary: SharedProvider,
    fallback: Option<SharedProvider>,
    model_map: ModelMap,
    config: CascadeConfig,
    primary_breaker: CircuitBreaker,
    fallback_breaker: CircuitBreaker,
}

impl ProviderCascade {
    /// Create a cascade with only a primary provider.
    pub fn new(primary: SharedProvider, config: CascadeConfig) -> Self {
        let primary_breaker = CircuitBreaker::new(
            config.breaker_failure_threshold,
            config.breaker_cooldown,
        );
        let fallback_breaker = CircuitBreaker::new(
            config.breaker_failure_threshold,
            config.breaker_cooldown,
        );
        Self {
            primary,
            fallback: None,
            model_map: ModelMap::new(),
            config,
            primary_breaker,
            fallback_breaker,
        }
    }

    /// Attach a fallback provider.
    pub fn with_fallback(mut self, fallback: SharedProvider) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Attach a model translation map.
    pub fn with_model_map(mut self, model_map: ModelMap) -> Self {
        self.model_map = model_map;
        self
    }

    /// Name of the primary provider.
    pub fn primary_name(&self) -> &str {
        self.primary.name()
    }

    /// Execute a request through the cascade policy.
    pub async fn send(&self, request: CompletionRequest) -> Result<CascadeResponse> {
        let mut attempts = Vec::new();

        // An open breaker on the primary behaves like an overload signal.
        if !self.primary_breaker.allow() {
            tracing::warn!(
                provider = self.primary.name(),
                "Primary breaker open, routing to fallback"
            );
            attempts.push(ProviderAttempt::failure(
                self.primary.name(),
                &request.model,
                "breaker_open",
            ));
            let err = ProviderError::Overloaded(format!(
                "circuit breaker open for provider '{}'",
                self.primary.name()
            ));
            return self.try_fallback(request, err, attempts).await;
        }

        let mut backoff = self.config.initial_backoff;

        for attempt in 0..=self.config.max_retries {
            match self.primary.complete(request.clone()).await {
                Ok(response) => {
                    self.primary_breaker.record_success();
                    attempts.push(ProviderAttempt::success(
                        self.primary.name(),
                        &request.model,
                    ));
                    return Ok(CascadeResponse {
                        model: response.model.clone(),
                        response,
                        provider: self.primary.name().to_string(),
                        fallback_triggered: false,
                        fallback_model: None,
                        attempts,
                    });
                }
                Err(e) => {
                    if counts_toward_breaker(&e) {
                        self.primary_breaker.record_failure();
                    }
                    attempts.push(ProviderAttempt::failure(
                        self.primary.name(),
                        &request.model,
                        e.class(),
                    ));

                    match &e {
                        // No retry budget spent on an overloaded primary.
                        ProviderError::Overloaded(_) => {
                            return self.try_fallback(request, e, attempts).await;
                        }
                        ProviderError::RateLimited(info) => {
                            if attempt < self.config.max_retries {
                                let sleep = info.retry_after.unwrap_or(backoff);
                                self.sleep_backoff(sleep, attempt).await;
                                backoff = (backoff * 2).min(self.config.max_backoff);
                                continue;
                            }
                            if self.config.fallback_on_rate_limit {
                                return self.try_fallback(request, e, attempts).await;
                            }
                            return Err(e);
                        }
                        ProviderError::Timeout(_) | ProviderError::Network(_) => {
                            if attempt < self.config.max_retries {
                                self.sleep_backoff(backoff, attempt).await;
                                backoff = (backoff * 2).min(self.config.max_backoff);
                                continue;
                            }
                            if self.config.fallback_on_timeout {
                                return self.try_fallback(request, e, attempts).await;
                            }
                            return Err(e);
                        }
                        // Auth, config, serialization, backend: not transient.
                        _ => return Err(e),
                    }
                }
            }
        }

        // Loop always returns; retries exhausted paths are handled inline.
        Err(ProviderError::Internal(
            "cascade retry loop exited unexpectedly".to_string(),
        ))
    }

    /// Route to the fallback provider, translating the model name.
    ///
    /// Returns the original primary error when fallback is disabled,
    /// unconfigured, untranslatable, or itself failing.
    async fn try_fallback(
        &self,
        request: CompletionRequest,
        original: ProviderError,
        mut attempts: Vec<ProviderAttempt>,
    ) -> Result<CascadeResponse> {
        if !self.config.fallback_enabled {
            return Err(original);
        }
        let Some(ref fallback) = self.fallback else {
            return Err(original);
        };
        if !self.fallback_breaker.allow() {
            tracing::warn!(
                provider = fallback.name(),
                "Fallback breaker open, propagating primary error"
            );
            return Err(original);
        }

        let Some(translated) = self.model_map.translate(&request.model, fallback.name()) else {
            tracing::warn!(
                model = %request.model,
                provider = fallback.name(),
                "No model translation for fallback provider, propagating primary error"
            );
            return Err(original);
        };
        let translated = translated.to_string();

        tracing::info!(
            provider = fallback.name(),
            model = %translated,
            error = %original,
            "Primary provider failed, trying fallback"
        );

        let fallback_request = request.with_model(translated.clone());
        match fallback.complete(fallback_request).await {
            Ok(response) => {
                self.fallback_breaker.record_success();
                attempts.push(ProviderAttempt::success(fallback.name(), &translated));
                Ok(CascadeResponse {
                    model: translated.clone(),
                    response,
                    provider: fallback.name().to_string(),
                    fallback_triggered: true,
                    fallback_model: Some(translated),
                    attempts,
                })
            }
            Err(fallback_error) => {
                if counts_toward_breaker(&fallback_error) {
                    self.fallback_breaker.record_failure();
                }
                attempts.push(ProviderAttempt::failure(
                    fallback.name(),
                    &translated,
                    fallback_error.class(),
                ));
                tracing::warn!(
                    provider = fallback.name(),
                    error = %fallback_error,
                    "Fallback provider also failed"
                );
                Err(original)
            }
        }
    }

    /// Sleep for the backoff duration, with optional jitter.
    async fn sleep_backoff(&self, base: Duration, attempt: u32) {
        let sleep = if self.config.jitter {
            let factor = 1.0 + rand::rng().random_range(0.0..0.5);
            base.mul_f64(factor)
        } else {
            base
        };
        tracing::warn!(
            provider = self.primary.name(),
            attempt = attempt + 1,
            max_retries = self.config.max_retries,
            backoff_ms = sleep.as_millis() as u64,
            "Request failed, retrying"
        );
        tokio::time::sleep(sleep).await;
    }
}

/// Whether an error reflects provider health (and should trip the breaker).
///
/// Auth and config failures are on us, not the provider.
fn counts_toward_breaker(error: &ProviderError) -> bool {
    matches!(
        error,
        ProviderError::Overloaded(_)
            | ProviderError::Timeout(_)
            | ProviderError::Network(_)
            | ProviderError::Backend(_)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RateLimitInfo;
    use crate::provider::MockProvider;
    use crate::types::Usage;
    use std::sync::Arc;

    fn fast_config() -> CascadeConfig {
        CascadeConfig {
            max_retries: 2,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(4),
            jitter: false,
            ..CascadeConfig::default()
        }
    }

    fn ok_response(text: &str, model: &str) -> ProviderResponse {
        ProviderResponse::new(text, model, Usage::new(5, 5))
    }

    fn test_model_map() -> ModelMap {
        ModelMap::new().insert("claude-sonnet-4-5", "openai", "gpt-4o")
    }

    #[tokio::test]
    async fn test_primary_success_no_fallback() {
        let primary = Arc::new(MockProvider::with_text("anthropic", "hello"));
        let cascade = ProviderCascade::new(primary.clone(), fast_config());

        let result = cascade
            .send(CompletionRequest::new("claude-sonnet-4-5", "hi", 64))
            .await
            .unwrap();

        assert!(!result.fallback_triggered);
        assert_eq!(result.provider, "anthropic");
        assert_eq!(result.attempts.len(), 1);
        assert!(result.attempts[0].success);
    }

    #[tokio::test]
    async fn test_overload_falls_back_with_translated_model() {
        let primary = Arc::new(MockProvider::new(
            "anthropic",
            vec![Err(ProviderError::Overloaded("529".to_string()))],
        ));
        let fallback = Arc::new(MockProvider::new(
            "openai",
            vec![Ok(ok_response("fallback answer", "gpt-4o"))],
        ));
        let cascade = ProviderCascade::new(primary.clone(), fast_config())
            .with_fallback(fallback.clone())
            .with_model_map(test_model_map());

        let result = cascade
            .send(CompletionRequest::new("claude-sonnet-4-5", "hi", 64))
            .await
            .unwrap();

        assert!(result.fallback_triggered);
        assert_eq!(result.fallback_model.as_deref(), Some("gpt-4o"));
        assert_eq!(result.provider, "openai");
        // Overload spends no retry budget: exactly one primary attempt.
        assert_eq!(primary.request_count(), 1);
        assert_eq!(fallback.requests()[0].model, "gpt-4o");
        assert_eq!(result.attempts.len(), 2);
        assert_eq!(result.attempts[0].error.as_deref(), Some("overloaded"));
    }

    #[tokio::test]
    async fn test_rate_limit_retries_then_propagates_unmodified() {
        let primary = Arc::new(MockProvider::new(
            "anthropic",
            vec![
                Err(ProviderError::RateLimited(RateLimitInfo::new("429"))),
                Err(ProviderError::RateLimited(RateLimitInfo::new("429"))),
                Err(ProviderError::RateLimited(RateLimitInfo::new("429"))),
            ],
        ));
        let fallback = Arc::new(MockProvider::with_text("openai", "should not run"));
        let config = fast_config().with_fallback_on_rate_limit(false);
        let cascade = ProviderCascade::new(primary.clone(), config)
            .with_fallback(fallback.clone())
            .with_model_map(test_model_map());

        let err = cascade
            .send(CompletionRequest::new("claude-sonnet-4-5", "hi", 64))
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::RateLimited(_)));
        // max_retries = 2 means 3 attempts total, no silent fallback.
        assert_eq!(primary.request_count(), 3);
        assert_eq!(fallback.request_count(), 0);
    }

    #[tokio::test]
    async fn test_rate_limit_falls_back_when_configured() {
        let primary = Arc::new(MockProvider::new(
            "anthropic",
            vec![
                Err(ProviderError::rate_limited("429")),
                Err(ProviderError::rate_limited("429")),
                Err(ProviderError::rate_limited("429")),
            ],
        ));
        let fallback = Arc::new(MockProvider::new(
            "openai",
            vec![Ok(ok_response("rescued", "gpt-4o"))],
        ));
        let config = fast_config().with_fallback_on_rate_limit(true);
        let cascade = ProviderCascade::new(primary, config)
            .with_fallback(fallback)
            .with_model_map(test_model_map());

        let result = cascade
            .send(CompletionRequest::new("claude-sonnet-4-5", "hi", 64))
            .await
            .unwrap();

        assert!(result.fallback_triggered);
        assert_eq!(result.response.text, "rescued");
    }

    #[tokio::test]
    async fn test_retry_recovers_on_transient_timeout() {
        let primary = Arc::new(MockProvider::new(
            "anthropic",
            vec![
                Err(ProviderError::Timeout("deadline".to_string())),
                Ok(ok_response("second try", "claude-sonnet-4-5")),
            ],
        ));
        let cascade = ProviderCascade::new(primary.clone(), fast_config());

        let result = cascade
            .send(CompletionRequest::new("claude-sonnet-4-5", "hi", 64))
            .await
            .unwrap();

        assert_eq!(result.response.text, "second try");
        assert_eq!(primary.request_count(), 2);
        assert_eq!(result.attempts.len(), 2);
        assert!(!result.attempts[0].success);
        assert!(result.attempts[1].success);
    }

    #[tokio::test]
    async fn test_auth_error_no_retry_no_fallback() {
        let primary = Arc::new(MockProvider::new(
            "anthropic",
            vec![Err(ProviderError::Auth("invalid x-api-key".to_string()))],
        ));
        let fallback = Arc::new(MockProvider::with_text("openai", "nope"));
        let cascade = ProviderCascade::new(primary.clone(), fast_config())
            .with_fallback(fallback.clone())
            .with_model_map(test_model_map());

        let err = cascade
            .send(CompletionRequest::new("claude-sonnet-4-5", "hi", 64))
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::Auth(_)));
        assert_eq!(primary.request_count(), 1);
        assert_eq!(fallback.request_count(), 0);
    }

    #[tokio::test]
    async fn test_overload_without_translation_propagates() {
        let primary = Arc::new(MockProvider::new(
            "anthropic",
            vec![Err(ProviderError::Overloaded("529".to_string()))],
        ));
        let fallback = Arc::new(MockProvider::with_text("openai", "nope"));
        // Empty model map: no translation exists.
        let cascade = ProviderCascade::new(primary, fast_config()).with_fallback(fallback.clone());

        let err = cascade
            .send(CompletionRequest::new("claude-sonnet-4-5", "hi", 64))
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::Overloaded(_)));
        assert_eq!(fallback.request_count(), 0);
    }

    #[tokio::test]
    async fn test_fallback_disabled_propagates() {
        let primary = Arc::new(MockProvider::new(
            "anthropic",
            vec![Err(ProviderError::Overloaded("529".to_string()))],
        ));
        let fallback = Arc::new(MockProvider::with_text("openai", "nope"));
        let config = fast_config().with_fallback_enabled(false);
        let cascade = ProviderCascade::new(primary, config)
            .with_fallback(fallback.clone())
            .with_model_map(test_model_map());

        let err = cascade
            .send(CompletionRequest::new("claude-sonnet-4-5", "hi", 64))
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::Overloaded(_)));
        assert_eq!(fallback.request_count(), 0);
    }

    #[tokio::test]
    async fn test_breaker_opens_after_repeated_failures() {
        let outcomes: Vec<_> = (0..10)
            .map(|_| Err(ProviderError::Backend("500".to_string())))
            .collect();
        let primary = Arc::new(MockProvider::new("anthropic", outcomes));
        let config = CascadeConfig {
            breaker_failure_threshold: 3,
            breaker_cooldown: Duration::from_secs(60),
            ..fast_config()
        };
        let cascade = ProviderCascade::new(primary.clone(), config);

        // Backend errors are not retried, so each send is one attempt.
        for _ in 0..3 {
            let _ = cascade
                .send(CompletionRequest::new("claude-sonnet-4-5", "hi", 64))
                .await;
        }
        assert_eq!(primary.request_count(), 3);

        // Breaker now open: the primary is never called again.
        let err = cascade
            .send(CompletionRequest::new("claude-sonnet-4-5", "hi", 64))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Overloaded(_)));
        assert_eq!(primary.request_count(), 3);
    }

    #[tokio::test]
    async fn test_fallback_failure_returns_original_error() {
        let primary = Arc::new(MockProvider::new(
            "anthropic",
            vec![Err(ProviderError::Overloaded("529".to_string()))],
        ));
        let fallback = Arc::new(MockProvider::new(
            "openai",
            vec![Err(ProviderError::Backend("500".to_string()))],
        ));
        let cascade = ProviderCascade::new(primary, fast_config())
            .with_fallback(fallback)
            .with_model_map(test_model_map());

        let err = cascade
            .send(CompletionRequest::new("claude-sonnet-4-5", "hi", 64))
            .await
            .unwrap_err();

        // The primary's error is what surfaces, not the fallback's.
        assert!(matches!(err, ProviderError::Overloaded(_)));
    }

    #[test]
    fn test_model_map_translate() {
        let map = test_model_map();
        assert_eq!(map.translate("claude-sonnet-4-5", "openai"), Some("gpt-4o"));
        assert_eq!(map.translate("claude-sonnet-4-5", "groq"), None);
        assert_eq!(map.translate("unknown-model", "openai"), None);
    }
}

//! Chat-completion backend used by every pipeline stage.
//!
//! The pipeline only depends on [`ChatBackend`]; the HTTP client in this
//! module speaks the OpenAI-compatible `/chat/completions` shape, which
//! covers OpenAI, Groq, DeepSeek and Ollama.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new("system", content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    pub message: ChatChoiceMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatResponse {
    /// Text of the first choice. A response without choices or with blank
    /// content is treated as malformed.
    pub fn into_text(self) -> Result<String, BackendError> {
        let choice = self.choices.into_iter().next().ok_or_else(|| {
            BackendError::InvalidResponse("response contained no choices".to_string())
        })?;
        let content = choice.message.content.unwrap_or_default();
        if content.trim().is_empty() {
            return Err(BackendError::InvalidResponse(
                "first choice has empty message content".to_string(),
            ));
        }
        Ok(content)
    }
}

/// Failures of a single backend call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    /// Credential or endpoint missing / unusable.
    #[error("backend not configured: {0}")]
    NotConfigured(String),

    /// HTTP 401/403.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// HTTP 429.
    #[error("rate limited: retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Any other non-2xx status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Connection, DNS or TLS failure before a status was received.
    #[error("request failed: {0}")]
    Transport(String),

    /// The body was not a chat completion, or carried no usable text.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("timeout")]
    Timeout,
}

impl BackendError {
    /// Transient failures that a bounded retry may recover from.
    pub fn is_retryable(&self) -> bool {
        match self {
            BackendError::RateLimited { .. } | BackendError::Timeout => true,
            BackendError::Transport(_) => true,
            BackendError::Status { status, .. } => *status >= 500,
            BackendError::NotConfigured(_)
            | BackendError::AuthFailed(_)
            | BackendError::InvalidResponse(_) => false,
        }
    }

    fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            BackendError::Timeout
        } else {
            BackendError::Transport(err.to_string())
        }
    }
}

#[async_trait]
pub trait ChatBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Issue one chat completion and return the first choice's text.
    async fn complete(&self, request: &ChatRequest) -> Result<String, BackendError>;
}

#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub name: String,
    pub api_base: String,
    pub api_key: Option<String>,
    pub request_timeout: Duration,
}

#[derive(Debug)]
pub struct OpenAiCompatBackend {
    config: BackendConfig,
    http: reqwest::Client,
}

impl OpenAiCompatBackend {
    pub fn new(config: BackendConfig) -> Result<Self, BackendError> {
        if config.api_base.trim().is_empty() {
            return Err(BackendError::NotConfigured(format!(
                "api base URL for '{}' is empty",
                config.name
            )));
        }
        let base = reqwest::Url::parse(config.api_base.trim()).map_err(|e| {
            BackendError::NotConfigured(format!(
                "api base URL '{}' for '{}' is invalid: {e}",
                config.api_base, config.name
            ))
        })?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(BackendError::NotConfigured(format!(
                "api base URL '{}' for '{}' must use http or https",
                config.api_base, config.name
            )));
        }
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| BackendError::NotConfigured(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    pub fn completions_url(&self) -> String {
        let base = self.config.api_base.trim().trim_end_matches('/');
        format!("{base}/chat/completions")
    }
}

#[async_trait]
impl ChatBackend for OpenAiCompatBackend {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn complete(&self, request: &ChatRequest) -> Result<String, BackendError> {
        let url = self.completions_url();
        debug!(
            backend = %self.config.name,
            model = %request.model,
            messages = request.messages.len(),
            "sending chat completion request"
        );

        let mut req = self.http.post(&url).json(request);
        if let Some(key) = self.config.api_key.as_deref() {
            req = req.bearer_auth(key);
        }

        let response = req.send().await.map_err(BackendError::from_reqwest)?;
        let status = response.status();

        if !status.is_success() {
            let retry_after_ms = parse_retry_after_header(&response);
            let body = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 | 403 => BackendError::AuthFailed(body),
                429 => {
                    let retry_after_ms = retry_after_ms.unwrap_or(1000);
                    warn!(
                        backend = %self.config.name,
                        retry_after_ms,
                        "rate limited"
                    );
                    BackendError::RateLimited { retry_after_ms }
                }
                code => BackendError::Status { status: code, body },
            });
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                BackendError::Timeout
            } else {
                BackendError::InvalidResponse(format!("failed to parse response: {e}"))
            }
        })?;
        let text = parsed.into_text()?;

        debug!(
            backend = %self.config.name,
            chars = text.len(),
            "chat completion response received"
        );
        Ok(text)
    }
}

fn parse_retry_after_header(response: &reqwest::Response) -> Option<u64> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(|secs| secs.saturating_mul(1000))
}

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Extra attempts after the first call. Zero disables retrying.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

/// Delay before retry `attempt` (0-indexed): `min(base * 2^attempt, max)`.
pub fn compute_delay(config: &RetryConfig, attempt: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempt);
    config
        .base_delay
        .saturating_mul(factor)
        .min(config.max_delay)
}

/// Wraps a backend with bounded exponential-backoff retry of transient
/// errors. Non-retryable errors are returned on first sight.
#[derive(Debug)]
pub struct RetryingBackend<B> {
    inner: B,
    config: RetryConfig,
}

impl<B: ChatBackend> RetryingBackend<B> {
    pub fn new(inner: B, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    pub fn inner(&self) -> &B {
        &self.inner
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.config
    }
}

#[async_trait]
impl<B: ChatBackend> ChatBackend for RetryingBackend<B> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn complete(&self, request: &ChatRequest) -> Result<String, BackendError> {
        let mut attempt = 0u32;
        loop {
            match self.inner.complete(request).await {
                Ok(text) => {
                    if attempt > 0 {
                        debug!(backend = %self.inner.name(), attempt, "request succeeded after retry");
                    }
                    return Ok(text);
                }
                Err(err) => {
                    if !err.is_retryable() || attempt >= self.config.max_retries {
                        return Err(err);
                    }
                    let mut delay = compute_delay(&self.config, attempt);
                    if let BackendError::RateLimited { retry_after_ms } = &err {
                        delay = delay.max(Duration::from_millis(*retry_after_ms));
                    }
                    warn!(
                        backend = %self.inner.name(),
                        attempt = attempt + 1,
                        max_retries = self.config.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "retrying after transient backend error"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

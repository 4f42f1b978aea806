//! Chat-completion client with exponential backoff retry logic.
//!
//! # Architecture
//!
//! - [`ChatCompletion`]: core trait for one system + user message exchange
//! - [`OpenAiChat`]: OpenAI-compatible `/chat/completions` transport
//! - [`RetryChat`]: decorator that retries transient failures of any [`ChatCompletion`]
//!
//! # Retry Strategy
//!
//! - Only transport errors, HTTP 429 and HTTP 5xx are retried
//! - Exponential backoff from the configured base delay, capped at 30 seconds
//! - Random jitter (0-250ms) added to each delay
//! - The last error is returned unchanged once retries are exhausted

use crate::config::LlmSettings;
use crate::models::Usage;
use rand::{Rng, rng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration as StdDuration, Instant};
use thiserror::Error;
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

/// Errors from the chat-completion service.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("OPENAI_API_KEY is not set; pass --openai-api-key or export the variable")]
    MissingApiKey,
    #[error("chat completion request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("chat completion returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("chat completion returned no choices")]
    NoChoices,
}

impl ChatError {
    /// Whether a later attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ChatError::Transport(_) => true,
            ChatError::Status { status, .. } => *status == 429 || *status >= 500,
            ChatError::MissingApiKey | ChatError::NoChoices => false,
        }
    }
}

/// One chat exchange: a fixed instruction plus the content to analyze.
#[derive(Debug, Clone, Copy)]
pub struct ChatRequest<'a> {
    pub system_prompt: &'a str,
    pub user_message: &'a str,
}

/// What the service answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatResponse {
    /// Untrusted text; may or may not be JSON.
    pub content: String,
    pub usage: Usage,
    pub model: String,
}

/// Capability to run a single chat completion.
pub trait ChatCompletion {
    async fn chat(&self, request: ChatRequest<'_>) -> Result<ChatResponse, ChatError>;
}

/// Wrapper that adds exponential backoff retry logic to any [`ChatCompletion`].
///
/// # Backoff Strategy
///
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetryChat<T> {
    inner: T,
    max_retries: usize,
    base_delay: StdDuration,
    max_delay: StdDuration,
}

impl<T: ChatCompletion> RetryChat<T> {
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
        }
    }
}

impl<T> fmt::Debug for RetryChat<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryChat")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T: ChatCompletion> ChatCompletion for RetryChat<T> {
    #[instrument(level = "info", skip_all)]
    async fn chat(&self, request: ChatRequest<'_>) -> Result<ChatResponse, ChatError> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match self.inner.chat(request).await {
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    attempt += 1;
                    let attempt_dt = attempt_t0.elapsed();
                    let total_dt = total_t0.elapsed();

                    if attempt > self.max_retries || !e.is_retryable() {
                        error!(
                            attempt,
                            max = self.max_retries,
                            retryable = e.is_retryable(),
                            elapsed_ms_attempt = attempt_dt.as_millis() as u64,
                            elapsed_ms_total = total_dt.as_millis() as u64,
                            error = %e,
                            "chat() giving up"
                        );
                        return Err(e);
                    }

                    let shift = (attempt - 1).min(16) as u32;
                    let delay = self
                        .base_delay
                        .saturating_mul(1 << shift)
                        .min(self.max_delay);
                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = delay + StdDuration::from_millis(jitter_ms);

                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_attempt = attempt_dt.as_millis() as u64,
                        elapsed_ms_total = total_dt.as_millis() as u64,
                        ?delay,
                        error = %e,
                        "chat() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

/// OpenAI-compatible chat-completion transport.
///
/// Built once at startup and shared read-only for the life of the process.
pub struct OpenAiChat {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl fmt::Debug for OpenAiChat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiChat")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl OpenAiChat {
    pub fn new(settings: &LlmSettings, api_key: Option<&str>) -> Result<Self, ChatError> {
        let api_key = api_key
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(ChatError::MissingApiKey)?;
        let http = reqwest::Client::builder()
            .timeout(StdDuration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            endpoint: format!("{}/chat/completions", settings.base_url.trim_end_matches('/')),
            api_key: api_key.to_string(),
            model: settings.model.clone(),
        })
    }
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct WireFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    response_format: WireFormat,
    messages: [WireMessage<'a>; 2],
}

#[derive(Deserialize)]
struct WireResponse {
    #[serde(default)]
    choices: Vec<WireChoice>,
    #[serde(default)]
    usage: Option<WireUsage>,
    #[serde(default)]
    model: String,
}

#[derive(Deserialize)]
struct WireChoice {
    message: WireChoiceMessage,
}

#[derive(Deserialize)]
struct WireChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize, Default)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
    #[serde(default)]
    total_tokens: u64,
}

impl WireResponse {
    fn into_chat_response(self) -> Result<ChatResponse, ChatError> {
        let choice = self.choices.into_iter().next().ok_or(ChatError::NoChoices)?;
        let usage = self.usage.unwrap_or_default();
        Ok(ChatResponse {
            content: choice.message.content.unwrap_or_default(),
            usage: Usage {
                prompt_tokens: usage.prompt_tokens,
                completion_tokens: usage.completion_tokens,
                total_tokens: usage.total_tokens,
            },
            model: self.model,
        })
    }
}

impl ChatCompletion for OpenAiChat {
    #[instrument(level = "info", skip_all, fields(model = %self.model))]
    async fn chat(&self, request: ChatRequest<'_>) -> Result<ChatResponse, ChatError> {
        let t0 = Instant::now();
        let body = WireRequest {
            model: &self.model,
            response_format: WireFormat {
                kind: "json_object",
            },
            messages: [
                WireMessage {
                    role: "system",
                    content: request.system_prompt,
                },
                WireMessage {
                    role: "user",
                    content: request.user_message,
                },
            ],
        };
        info!(bytes = request.user_message.len(), "Sending chat completion request");

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), elapsed_ms = t0.elapsed().as_millis() as u64, "Chat completion rejected");
            return Err(ChatError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed = response.json::<WireResponse>().await?.into_chat_response()?;
        info!(
            total_tokens = parsed.usage.total_tokens,
            model = %parsed.model,
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Chat completion received"
        );
        Ok(parsed)
    }
}

//! Chat-completions backend
//!
//! The fallback only needs one non-streaming call per escalated turn, so the
//! backend is a thin client for the OpenAI chat-completions protocol. Any
//! compatible server works (OpenAI, vLLM, Ollama's `/v1` endpoint).

use std::time::{Duration, Instant};

use async_trait::async_trait;
use kiosk_agent_config::FallbackConfig;
use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::prompt::Message;
use crate::LlmError;

/// Text produced by one completion
#[derive(Debug, Clone)]
pub struct GenerationResult {
    pub text: String,
    /// Completion tokens reported by the server, 0 when absent
    pub tokens: usize,
    /// Wall time including retries
    pub total_time_ms: u64,
}

/// Chat model the fallback talks to
#[async_trait]
pub trait LlmBackend: Send + Sync {
    async fn generate(&self, messages: &[Message]) -> Result<GenerationResult, LlmError>;

    fn model_name(&self) -> &str;
}

/// Client settings
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    /// Base URL up to and including the version segment, e.g. `.../v1`
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: usize,
    pub temperature: f32,
    pub timeout: Duration,
    /// Extra attempts after the first one for transient failures
    pub max_retries: u32,
    /// Delay before the first retry; doubled for each further retry
    pub initial_backoff: Duration,
    /// Ask the server for a JSON object reply (`response_format`)
    pub json_mode: bool,
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self::with_key(&FallbackConfig::default(), String::new())
    }
}

impl OpenAIConfig {
    /// Build from settings; the API key is read from `api_key_env`
    pub fn from_settings(config: &FallbackConfig) -> Self {
        let api_key = std::env::var(&config.api_key_env).unwrap_or_default();
        Self::with_key(config, api_key)
    }

    fn with_key(config: &FallbackConfig, api_key: String) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            api_key,
            model: config.model.clone(),
            max_tokens: config.max_tokens as usize,
            temperature: config.temperature,
            timeout: Duration::from_secs(config.timeout_secs),
            max_retries: config.max_retries,
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            json_mode: true,
        }
    }

    /// Self-hosted server that needs no key
    pub fn local(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            model: model.into(),
            ..Default::default()
        }
    }

    fn is_local(&self) -> bool {
        ["http://localhost", "http://127.0.0.1", "http://[::1]"]
            .iter()
            .any(|prefix| self.endpoint.starts_with(prefix))
    }

    /// Delay before retry number `retry` (1-based)
    fn backoff(&self, retry: u32) -> Duration {
        self.initial_backoff
            .saturating_mul(2u32.saturating_pow(retry.saturating_sub(1)))
    }
}

/// OpenAI-compatible chat client
#[derive(Clone)]
pub struct OpenAIBackend {
    config: OpenAIConfig,
    client: Client,
    url: String,
}

impl OpenAIBackend {
    /// Fails when a remote endpoint has no key or the HTTP client cannot be built
    pub fn new(config: OpenAIConfig) -> Result<Self, LlmError> {
        if config.api_key.trim().is_empty() && !config.is_local() {
            return Err(LlmError::Configuration(format!(
                "no API key for {}",
                config.endpoint
            )));
        }

        let mut headers = header::HeaderMap::new();
        if !config.api_key.is_empty() {
            let bearer = header::HeaderValue::from_str(&format!("Bearer {}", config.api_key))
                .map_err(|e| LlmError::Configuration(format!("invalid API key: {}", e)))?;
            headers.insert(header::AUTHORIZATION, bearer);
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| LlmError::Configuration(format!("HTTP client: {}", e)))?;

        let url = format!("{}/chat/completions", config.endpoint.trim_end_matches('/'));
        Ok(Self {
            config,
            client,
            url,
        })
    }

    pub fn config(&self) -> &OpenAIConfig {
        &self.config
    }

    fn request_body<'a>(&'a self, messages: &'a [Message]) -> CompletionRequest<'a> {
        CompletionRequest {
            model: &self.config.model,
            messages: messages
                .iter()
                .map(|m| WireMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            response_format: self
                .config
                .json_mode
                .then_some(ResponseFormat { kind: "json_object" }),
        }
    }

    async fn attempt(&self, body: &CompletionRequest<'_>) -> Result<CompletionResponse, LlmError> {
        let response = self.client.post(&self.url).json(body).send().await?;

        let status = response.status();
        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| LlmError::InvalidResponse(e.to_string()));
        }
        let detail = response.text().await.unwrap_or_default();
        Err(status_error(status, &detail))
    }
}

/// Rate limits and server errors are transient, other statuses are not
fn status_error(status: StatusCode, detail: &str) -> LlmError {
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        LlmError::Network(format!("{}: {}", status, detail))
    } else {
        LlmError::Api(format!("{}: {}", status, detail))
    }
}

fn is_transient(error: &LlmError) -> bool {
    matches!(error, LlmError::Network(_) | LlmError::Timeout)
}

#[async_trait]
impl LlmBackend for OpenAIBackend {
    async fn generate(&self, messages: &[Message]) -> Result<GenerationResult, LlmError> {
        let started = Instant::now();
        let body = self.request_body(messages);

        let mut retry = 0;
        let response = loop {
            match self.attempt(&body).await {
                Ok(response) => break response,
                Err(e) if is_transient(&e) && retry < self.config.max_retries => {
                    retry += 1;
                    let delay = self.config.backoff(retry);
                    tracing::warn!(
                        model = %self.config.model,
                        error = %e,
                        retry,
                        max_retries = self.config.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        "Chat completion failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                },
                Err(e) => return Err(e),
            }
        };

        let tokens = response.usage.map_or(0, |u| u.completion_tokens);
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse("empty choices".to_string()))?;
        let text = choice
            .message
            .content
            .ok_or_else(|| LlmError::InvalidResponse("choice without content".to_string()))?;

        let total_time_ms = started.elapsed().as_millis() as u64;
        tracing::debug!(
            model = %self.config.model,
            tokens,
            retries = retry,
            total_time_ms,
            finish_reason = choice.finish_reason.as_deref().unwrap_or("unknown"),
            "Chat completion done"
        );
        Ok(GenerationResult {
            text,
            tokens,
            total_time_ms,
        })
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    max_tokens: usize,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
    usage: Option<CompletionUsage>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: ReplyMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompletionUsage {
    completion_tokens: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiosk_agent_config::constants::endpoints;

    fn backend() -> OpenAIBackend {
        OpenAIBackend::new(OpenAIConfig {
            api_key: "sk-test".to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_default_config_follows_settings() {
        let config = OpenAIConfig::default();
        assert_eq!(config.endpoint, "https://api.openai.com/v1");
        assert_eq!(config.model, endpoints::DEFAULT_MODEL);
        assert!(config.api_key.is_empty());
        assert!(config.json_mode);
    }

    #[test]
    fn test_remote_endpoint_requires_key() {
        assert!(OpenAIBackend::new(OpenAIConfig::default()).is_err());
        assert!(OpenAIBackend::new(OpenAIConfig::local("http://localhost:8000/v1", "llama-3")).is_ok());
        assert_eq!(backend().url, "https://api.openai.com/v1/chat/completions");
    }

    #[test]
    fn test_request_body() {
        let backend = backend();
        let messages = [Message::system("시스템"), Message::user("아메리카노")];
        let json = serde_json::to_value(backend.request_body(&messages)).unwrap();
        assert_eq!(json["model"], "gpt-4o");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "아메리카노");
        assert_eq!(json["response_format"]["type"], "json_object");
    }

    #[test]
    fn test_backoff_doubles() {
        let config = OpenAIConfig {
            initial_backoff: Duration::from_millis(100),
            ..Default::default()
        };
        assert_eq!(config.backoff(1), Duration::from_millis(100));
        assert_eq!(config.backoff(2), Duration::from_millis(200));
        assert_eq!(config.backoff(4), Duration::from_millis(800));
    }

    #[test]
    fn test_from_settings() {
        let settings = FallbackConfig {
            api_key_env: "KIOSK_AGENT_TEST_UNSET_KEY".to_string(),
            max_retries: 5,
            ..Default::default()
        };
        let config = OpenAIConfig::from_settings(&settings);
        assert!(config.api_key.is_empty());
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.initial_backoff, Duration::from_millis(100));
    }

    #[test]
    fn test_transient_statuses() {
        assert!(is_transient(&status_error(StatusCode::TOO_MANY_REQUESTS, "")));
        assert!(is_transient(&status_error(StatusCode::BAD_GATEWAY, "")));
        assert!(!is_transient(&status_error(StatusCode::UNAUTHORIZED, "")));
        assert!(is_transient(&LlmError::Timeout));
    }
}

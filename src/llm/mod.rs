//! Language model collaborator
//!
//! The pipeline only needs "prompt in, text out". Providers are HTTP clients behind
//! the [`TextGenerator`] trait so tests and alternative backends can be swapped in.

pub mod gemini;
pub mod openai;

pub use gemini::GeminiClient;
pub use openai::OpenAiClient;

use crate::config::LlmConfig;
use crate::error::{CollaboratorError, ConfigError, InsightError};
use std::sync::Arc;
use std::time::Duration;

/// A system instruction plus user content
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
    pub temperature: f32,
}

impl Prompt {
    pub fn new(system: impl Into<String>, user: impl Into<String>, temperature: f32) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            temperature,
        }
    }
}

/// Generates text from a prompt
#[async_trait::async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &Prompt) -> Result<String, CollaboratorError>;

    fn model_name(&self) -> &str;
}

/// Generator used when no provider is configured; every call fails
pub struct DisabledGenerator;

#[async_trait::async_trait]
impl TextGenerator for DisabledGenerator {
    async fn generate(&self, _prompt: &Prompt) -> Result<String, CollaboratorError> {
        Err(CollaboratorError::Disabled)
    }

    fn model_name(&self) -> &str {
        "disabled"
    }
}

/// Build the generator selected by `llm.provider`
pub fn create_generator(config: &LlmConfig) -> Result<Arc<dyn TextGenerator>, InsightError> {
    match config.provider.as_str() {
        "gemini" => {
            let api_key = read_api_key(&config.api_key_env).ok_or_else(|| {
                ConfigError::MissingRequired(format!(
                    "environment variable {} must hold the Gemini API key",
                    config.api_key_env
                ))
            })?;
            Ok(Arc::new(GeminiClient::new(config, api_key)?))
        }
        "openai" => {
            let api_key = read_api_key(&config.api_key_env);
            Ok(Arc::new(OpenAiClient::new(config, api_key)?))
        }
        "disabled" => {
            tracing::warn!("LLM provider disabled; summaries and answers will be unavailable");
            Ok(Arc::new(DisabledGenerator))
        }
        other => Err(ConfigError::InvalidValue {
            key: "llm.provider".to_string(),
            reason: format!("unknown provider '{}'", other),
        }
        .into()),
    }
}

fn read_api_key(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|key| !key.trim().is_empty())
}

pub(crate) fn http_client(timeout_secs: u64) -> Result<reqwest::Client, CollaboratorError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| CollaboratorError::Llm(format!("Failed to build HTTP client: {}", e)))
}

/// Send a request, retrying rate limits (429), server errors and network failures
/// with exponential backoff. Returns the successful response body.
pub(crate) async fn send_with_retry(
    provider: &str,
    max_retries: u32,
    timeout_secs: u64,
    build: impl Fn() -> reqwest::RequestBuilder,
    error_message: impl Fn(&str) -> Option<String>,
) -> Result<String, CollaboratorError> {
    let mut last_err = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            // 1s, 2s, 4s, ...
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            tracing::debug!("Retrying {} request in {:?}", provider, delay);
            tokio::time::sleep(delay).await;
        }

        let response = match build().send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                last_err = Some(CollaboratorError::Timeout(timeout_secs));
                continue;
            }
            Err(e) => {
                last_err = Some(CollaboratorError::Llm(format!(
                    "{} request failed: {}",
                    provider, e
                )));
                continue;
            }
        };

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            CollaboratorError::Llm(format!("Failed to read {} response: {}", provider, e))
        })?;

        if status.is_success() {
            return Ok(body);
        }

        let message = error_message(&body).unwrap_or(body);
        let err = CollaboratorError::Llm(format!(
            "{} API error ({}): {}",
            provider,
            status.as_u16(),
            message
        ));

        if status.as_u16() == 429 || status.is_server_error() {
            last_err = Some(err);
            continue;
        }
        return Err(err);
    }

    Err(last_err.unwrap_or_else(|| {
        CollaboratorError::Llm(format!("{} request failed after retries", provider))
    }))
}

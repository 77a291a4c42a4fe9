//! OpenAI-compatible `chat/completions` client (OpenAI, Ollama, vLLM, ...)

use super::{Prompt, TextGenerator, http_client, send_with_retry};
use crate::config::LlmConfig;
use crate::error::CollaboratorError;
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

pub struct OpenAiClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    max_output_tokens: u32,
    max_retries: u32,
    timeout_secs: u64,
}

impl OpenAiClient {
    pub fn new(config: &LlmConfig, api_key: Option<String>) -> Result<Self, CollaboratorError> {
        Ok(Self {
            client: http_client(config.timeout_secs)?,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: config.model.clone(),
            api_key,
            max_output_tokens: config.max_output_tokens,
            max_retries: config.max_retries,
            timeout_secs: config.timeout_secs,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct OpenAiError {
    error: OpenAiErrorDetail,
}

#[derive(Deserialize)]
struct OpenAiErrorDetail {
    message: String,
}

fn build_request<'a>(model: &'a str, prompt: &'a Prompt, max_tokens: u32) -> ChatRequest<'a> {
    ChatRequest {
        model,
        messages: vec![
            ChatMessage {
                role: "system",
                content: &prompt.system,
            },
            ChatMessage {
                role: "user",
                content: &prompt.user,
            },
        ],
        temperature: prompt.temperature,
        max_tokens,
    }
}

fn parse_response(body: &str) -> Result<String, CollaboratorError> {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| CollaboratorError::Llm(format!("Failed to parse chat response: {}", e)))?;

    let text = response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .unwrap_or_default();

    let text = text.trim();
    if text.is_empty() {
        return Err(CollaboratorError::EmptyResponse);
    }
    Ok(text.to_string())
}

#[async_trait::async_trait]
impl TextGenerator for OpenAiClient {
    async fn generate(&self, prompt: &Prompt) -> Result<String, CollaboratorError> {
        let body = build_request(&self.model, prompt, self.max_output_tokens);
        let endpoint = self.endpoint();

        let response = send_with_retry(
            "OpenAI",
            self.max_retries,
            self.timeout_secs,
            || {
                let request = self.client.post(&endpoint).json(&body);
                match &self.api_key {
                    Some(key) => request.bearer_auth(key),
                    None => request,
                }
            },
            |text| {
                serde_json::from_str::<OpenAiError>(text)
                    .ok()
                    .map(|e| e.error.message)
            },
        )
        .await?;

        parse_response(&response)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

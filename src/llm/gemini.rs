//! Google Gemini `generateContent` client

use super::{Prompt, TextGenerator, http_client, send_with_retry};
use crate::config::LlmConfig;
use crate::error::CollaboratorError;
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
    max_output_tokens: u32,
    max_retries: u32,
    timeout_secs: u64,
}

impl GeminiClient {
    pub fn new(config: &LlmConfig, api_key: String) -> Result<Self, CollaboratorError> {
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
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct GeminiError {
    error: GeminiErrorDetail,
}

#[derive(Deserialize)]
struct GeminiErrorDetail {
    message: String,
}

fn build_request(prompt: &Prompt, max_output_tokens: u32) -> GenerateRequest<'_> {
    GenerateRequest {
        system_instruction: Content {
            role: None,
            parts: vec![Part {
                text: &prompt.system,
            }],
        },
        contents: vec![Content {
            role: Some("user"),
            parts: vec![Part { text: &prompt.user }],
        }],
        generation_config: GenerationConfig {
            temperature: prompt.temperature,
            max_output_tokens,
        },
    }
}

/// Concatenated text of the first candidate
fn parse_response(body: &str) -> Result<String, CollaboratorError> {
    let response: GenerateResponse = serde_json::from_str(body)
        .map_err(|e| CollaboratorError::Llm(format!("Failed to parse Gemini response: {}", e)))?;

    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    let text = text.trim().to_string();
    if text.is_empty() {
        return Err(CollaboratorError::EmptyResponse);
    }
    Ok(text)
}

#[async_trait::async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &Prompt) -> Result<String, CollaboratorError> {
        let body = build_request(prompt, self.max_output_tokens);
        let endpoint = self.endpoint();

        let response = send_with_retry(
            "Gemini",
            self.max_retries,
            self.timeout_secs,
            || {
                self.client
                    .post(&endpoint)
                    .header("x-goog-api-key", &self.api_key)
                    .json(&body)
            },
            |text| {
                serde_json::from_str::<GeminiError>(text)
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let prompt = Prompt::new("Be brief.", "Summarize this.", 0.2);
        let value = serde_json::to_value(build_request(&prompt, 256)).unwrap();

        assert_eq!(value["systemInstruction"]["parts"][0]["text"], "Be brief.");
        assert!(value["systemInstruction"].get("role").is_none());
        assert_eq!(value["contents"][0]["role"], "user");
        assert_eq!(value["contents"][0]["parts"][0]["text"], "Summarize this.");
        assert_eq!(value["generationConfig"]["maxOutputTokens"], 256);
        assert!((value["generationConfig"]["temperature"].as_f64().unwrap() - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_parse_response_joins_parts() {
        let body = r#"{"candidates": [{"content": {"parts": [{"text": "Adds two "}, {"text": "numbers.\n"}]}}]}"#;
        assert_eq!(parse_response(body).unwrap(), "Adds two numbers.");
    }

    #[test]
    fn test_parse_response_without_candidates() {
        assert!(matches!(
            parse_response(r#"{"candidates": []}"#),
            Err(CollaboratorError::EmptyResponse)
        ));
        assert!(matches!(
            parse_response(r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#),
            Err(CollaboratorError::EmptyResponse)
        ));
    }

    #[test]
    fn test_parse_response_invalid_json() {
        assert!(matches!(
            parse_response("<html>"),
            Err(CollaboratorError::Llm(_))
        ));
    }

    #[test]
    fn test_endpoint() {
        let config = LlmConfig {
            base_url: Some("http://localhost:8080/v1beta/".to_string()),
            model: "gemini-2.0-flash".to_string(),
            ..Default::default()
        };
        let client = GeminiClient::new(&config, "key".to_string()).unwrap();
        assert_eq!(
            client.endpoint(),
            "http://localhost:8080/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }
}

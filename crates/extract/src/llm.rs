use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

use crate::error::ExtractError;

/// A text-completion backend that answers with JSON content.
#[async_trait]
pub trait CompletionApi: Send + Sync {
    async fn complete(&self, model: &str, system: &str, prompt: &str) -> Result<String, ExtractError>;
}

#[derive(Clone)]
pub struct OpenAiClient {
    base_url: String,
    api_key: String,
    temperature: f32,
    max_tokens: u32,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<ErrorDetail>,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: Option<String>,
}

impl OpenAiClient {
    pub fn new(base_url: String, api_key: String, timeout: Duration) -> Result<Self, ExtractError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ExtractError::Transport(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            temperature: 0.5,
            max_tokens: 1000,
            client,
        })
    }

    pub fn with_sampling(mut self, temperature: f32, max_tokens: u32) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }

    fn build_request<'a>(&self, model: &'a str, system: &'a str, prompt: &'a str) -> ChatRequest<'a> {
        ChatRequest {
            model,
            messages: vec![
                ChatMessage { role: "system", content: system },
                ChatMessage { role: "user", content: prompt },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            response_format: ResponseFormat { format_type: "json_object" },
        }
    }
}

#[async_trait]
impl CompletionApi for OpenAiClient {
    async fn complete(&self, model: &str, system: &str, prompt: &str) -> Result<String, ExtractError> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = self.build_request(model, system, prompt);

        debug!(model, "Sending prompt to completion API");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ExtractError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = upstream_message(&body, status.canonical_reason().unwrap_or("Unknown error"));
            error!(status = status.as_u16(), message = %message, "Completion API error");
            return Err(ExtractError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| ExtractError::Parse(e.to_string()))?;

        first_content(chat)
    }
}

fn first_content(chat: ChatResponse) -> Result<String, ExtractError> {
    chat.choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| ExtractError::Parse("no content in completion response".to_string()))
}

/// `error.message` from an upstream error body, or the status text.
fn upstream_message(body: &str, fallback: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .and_then(|e| e.message)
        .unwrap_or_else(|| fallback.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::SYSTEM_PROMPT;

    fn client() -> OpenAiClient {
        OpenAiClient::new(
            "https://api.openai.com/v1/".to_string(),
            "sk-test".to_string(),
            Duration::from_secs(5),
        )
        .unwrap()
        .with_sampling(0.2, 500)
    }

    #[test]
    fn test_request_body() {
        let client = client();
        let request = client.build_request("gpt-4o", SYSTEM_PROMPT, "Extract things");
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["model"], "gpt-4o");
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["content"], "Extract things");
        assert_eq!(value["max_tokens"], 500);
        assert_eq!(value["response_format"]["type"], "json_object");
        assert_eq!(client.base_url, "https://api.openai.com/v1");
    }

    #[test]
    fn test_upstream_message() {
        let body = r#"{"error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}}"#;
        assert_eq!(upstream_message(body, "Unauthorized"), "Incorrect API key provided");
        assert_eq!(upstream_message("<html>", "Bad Gateway"), "Bad Gateway");
    }

    #[test]
    fn test_first_content() {
        let chat: ChatResponse = serde_json::from_str(
            r#"{"choices": [{"message": {"role": "assistant", "content": "{\"results\": []}"}}]}"#,
        )
        .unwrap();
        assert_eq!(first_content(chat).unwrap(), "{\"results\": []}");

        let empty: ChatResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        let err = first_content(empty).unwrap_err();
        assert!(err.to_string().starts_with("Failed to parse API response"));
    }
}

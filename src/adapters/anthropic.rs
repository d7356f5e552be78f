//! Anthropic Messages API client used as the extraction service.

use crate::domain::ports::LlmClient;
use crate::utils::error::{EnrichError, ExtractionError};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://api.anthropic.com/v1/messages";
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
const API_VERSION: &str = "2023-06-01";

#[derive(Debug, Clone)]
pub struct AnthropicSettings {
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout: Duration,
}

impl Default for AnthropicSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 1024,
            temperature: 0.2,
            timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Deserialize)]
struct ContentBlock {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ApiResponse {
    content: Vec<ContentBlock>,
}

#[derive(Clone)]
pub struct AnthropicClient {
    client: reqwest::Client,
    settings: AnthropicSettings,
}

impl AnthropicClient {
    pub fn new(settings: AnthropicSettings) -> Result<Self, EnrichError> {
        let client = reqwest::Client::builder().timeout(settings.timeout).build()?;
        Ok(Self { client, settings })
    }

    async fn call_api(&self, system_prompt: &str, user_prompt: &str) -> Result<String, ExtractionError> {
        let response = self
            .client
            .post(&self.settings.endpoint)
            .header("x-api-key", &self.settings.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(&serde_json::json!({
                "model": &self.settings.model,
                "max_tokens": self.settings.max_tokens,
                "temperature": self.settings.temperature,
                "system": system_prompt,
                "messages": [{"role": "user", "content": user_prompt}]
            }))
            .send()
            .await
            .map_err(|e| ExtractionError::ServiceError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ExtractionError::ServiceError(format!(
                "Anthropic API error {}: {}",
                status, body
            )));
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| ExtractionError::ServiceError(format!("unreadable response body: {}", e)))?;

        let text: String = api_response
            .content
            .into_iter()
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("");
        if text.trim().is_empty() {
            return Err(ExtractionError::MalformedResponse { raw_text: text });
        }
        Ok(text)
    }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, ExtractionError> {
        tracing::debug!("🤖 Sending {} chars to {}", user_prompt.len(), self.settings.model);
        self.call_api(system_prompt, user_prompt).await
    }

    fn model_name(&self) -> &str {
        &self.settings.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn client_for(server: &MockServer) -> AnthropicClient {
        AnthropicClient::new(AnthropicSettings {
            endpoint: server.url("/v1/messages"),
            api_key: "test-key".into(),
            timeout: Duration::from_secs(5),
            ..AnthropicSettings::default()
        })
        .unwrap()
    }

    #[test]
    fn test_default_settings() {
        let client = AnthropicClient::new(AnthropicSettings::default()).unwrap();
        assert_eq!(client.model_name(), DEFAULT_MODEL);
    }

    #[tokio::test]
    async fn test_complete_sends_headers_and_joins_text_blocks() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/v1/messages")
                .header("x-api-key", "test-key")
                .header("anthropic-version", API_VERSION)
                .json_body_partial(r#"{"max_tokens": 1024, "system": "sys"}"#);
            then.status(200).json_body(serde_json::json!({
                "content": [
                    {"type": "text", "text": "{\"worksAt\": "},
                    {"type": "text", "text": "\"Acme\"}"}
                ]
            }));
        });

        let text = client_for(&server).complete("sys", "user").await.unwrap();
        mock.assert();
        assert_eq!(text, r#"{"worksAt": "Acme"}"#);
    }

    #[tokio::test]
    async fn test_complete_service_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/v1/messages");
            then.status(529).body(r#"{"type":"error","error":{"type":"overloaded_error"}}"#);
        });

        let err = client_for(&server).complete("sys", "user").await.unwrap_err();
        assert!(matches!(err, ExtractionError::ServiceError(msg) if msg.contains("529")));
    }

    #[tokio::test]
    async fn test_complete_empty_content_is_malformed() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/v1/messages");
            then.status(200).json_body(serde_json::json!({ "content": [] }));
        });

        let err = client_for(&server).complete("sys", "user").await.unwrap_err();
        assert!(matches!(err, ExtractionError::MalformedResponse { .. }));
    }
}

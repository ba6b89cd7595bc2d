//! Google Gemini backend
//!
//! Calls the `generateContent` endpoint of the Generative Language API.
//!
//! # Configuration
//!
//! Environment variables:
//! - `GEMINI_API_KEY`: API key (required)
//! - `GEMINI_MODEL`: Model name (default: gemini-2.0-flash-exp)
//! - `GEMINI_HOST`: Base URL (default: https://generativelanguage.googleapis.com)

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::prompts::RenderedPrompt;

use super::{http_client, timeout_from_env, truncate_for_log, AIBackend};

/// Default public API endpoint
pub const DEFAULT_GEMINI_HOST: &str = "https://generativelanguage.googleapis.com";

/// Default model
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash-exp";

/// Header carrying the API key (keeps the key out of URLs and access logs)
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Gemini backend
#[derive(Clone)]
pub struct GeminiBackend {
    http_client: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiBackend {
    /// Create a backend for the public API
    pub fn new(api_key: &str, model: &str) -> Self {
        Self::with_host(DEFAULT_GEMINI_HOST, api_key, model)
    }

    /// Create a backend for a custom endpoint (proxies, test servers)
    pub fn with_host(base_url: &str, api_key: &str, model: &str) -> Self {
        Self::with_timeout(base_url, api_key, model, timeout_from_env())
    }

    pub fn with_timeout(base_url: &str, api_key: &str, model: &str, timeout: Duration) -> Self {
        Self {
            http_client: http_client(timeout),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
        }
    }

    /// Create from environment variables
    ///
    /// Required: `GEMINI_API_KEY`
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())?;
        let model =
            std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_GEMINI_MODEL.to_string());
        let host = std::env::var("GEMINI_HOST").unwrap_or_else(|_| DEFAULT_GEMINI_HOST.to_string());
        Some(Self::with_host(&host, &api_key, &model))
    }

    fn model_url(&self) -> String {
        format!("{}/v1beta/models/{}", self.base_url, self.model)
    }
}

/// `generateContent` request body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
}

/// `generateContent` response body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

/// Concatenate the text parts of the first candidate
fn response_text(response: GenerateContentResponse) -> Result<String> {
    let Some(candidate) = response.candidates.into_iter().next() else {
        let reason = response
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .unwrap_or_else(|| "no candidates returned".to_string());
        return Err(Error::Ai(format!("Gemini returned no content: {}", reason)));
    };

    Ok(candidate
        .content
        .map(|c| {
            c.parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default())
}

#[async_trait]
impl AIBackend for GeminiBackend {
    async fn generate(&self, prompt: &RenderedPrompt) -> Result<String> {
        let request = GenerateContentRequest {
            system_instruction: prompt.system.as_ref().map(|s| Content {
                role: None,
                parts: vec![Part {
                    text: Some(s.clone()),
                }],
            }),
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(prompt.user.clone()),
                }],
            }],
            generation_config: GenerationConfig { temperature: 0.4 },
        };

        let response = self
            .http_client
            .post(format!("{}:generateContent", self.model_url()))
            .header(API_KEY_HEADER, &self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Ai(format!(
                "Gemini API error {}: {}",
                status,
                truncate_for_log(&body)
            )));
        }

        let parsed: GenerateContentResponse = response.json().await?;
        let text = response_text(parsed)?;
        debug!(model = %self.model, "Gemini response: {}", truncate_for_log(&text));
        Ok(text)
    }

    async fn health_check(&self) -> bool {
        match self
            .http_client
            .get(self.model_url())
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn host(&self) -> &str {
        &self.base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockGeminiServer;

    fn prompt(user: &str) -> RenderedPrompt {
        RenderedPrompt {
            system: Some("Be brief.".to_string()),
            user: user.to_string(),
        }
    }

    #[test]
    fn test_response_text_joins_parts() {
        let response: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Hello "},{"text":"there"}]},"finishReason":"STOP"}]}"#,
        )
        .unwrap();
        assert_eq!(response_text(response).unwrap(), "Hello there");
    }

    #[test]
    fn test_response_text_blocked_prompt() {
        let response: GenerateContentResponse =
            serde_json::from_str(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#).unwrap();
        let err = response_text(response).unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn test_request_serialization() {
        let request = GenerateContentRequest {
            system_instruction: None,
            contents: vec![Content {
                role: Some("user".into()),
                parts: vec![Part {
                    text: Some("hi".into()),
                }],
            }],
            generation_config: GenerationConfig { temperature: 0.4 },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("systemInstruction").is_none());
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hi");
        assert!(json["generationConfig"]["temperature"].is_number());
    }

    #[tokio::test]
    async fn test_generate_against_mock_server() {
        let server = MockGeminiServer::start_with_reply("Food").await;
        let backend = GeminiBackend::with_host(
            &server.url(),
            MockGeminiServer::API_KEY,
            "gemini-2.0-flash-exp",
        );

        let text = backend.generate(&prompt("Categorize: pizza")).await.unwrap();
        assert_eq!(text, "Food");

        let requests = server.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0]["contents"][0]["parts"][0]["text"],
            "Categorize: pizza"
        );
        assert_eq!(
            requests[0]["systemInstruction"]["parts"][0]["text"],
            "Be brief."
        );
    }

    #[tokio::test]
    async fn test_generate_rejected_api_key() {
        let server = MockGeminiServer::start_with_reply("Food").await;
        let backend = GeminiBackend::with_host(&server.url(), "wrong-key", "gemini-2.0-flash-exp");

        let err = backend.generate(&prompt("x")).await.unwrap_err();
        assert!(matches!(err, Error::Ai(_)));
        assert!(!backend.health_check().await);
    }

    #[tokio::test]
    async fn test_generate_quota_exceeded() {
        let server = MockGeminiServer::start_failing(axum::http::StatusCode::TOO_MANY_REQUESTS).await;
        let backend = GeminiBackend::with_host(
            &server.url(),
            MockGeminiServer::API_KEY,
            "gemini-2.0-flash-exp",
        );

        let err = backend.generate(&prompt("x")).await.unwrap_err();
        assert!(err.to_string().contains("429"));
        assert!(server.requests().is_empty());
    }

    #[tokio::test]
    async fn test_health_check_against_mock_server() {
        let server = MockGeminiServer::start_with_reply("ok").await;
        let backend = GeminiBackend::with_host(
            &server.url(),
            MockGeminiServer::API_KEY,
            "gemini-2.0-flash-exp",
        );
        assert!(backend.health_check().await);
    }
}

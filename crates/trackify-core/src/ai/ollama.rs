//! Ollama backend implementation
//!
//! HTTP client for a self-hosted Ollama server (`/api/generate`).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::prompts::RenderedPrompt;

use super::{http_client, timeout_from_env, truncate_for_log, AIBackend};

/// Ollama backend
#[derive(Clone)]
pub struct OllamaBackend {
    http_client: Client,
    base_url: String,
    model: String,
}

impl OllamaBackend {
    pub fn new(base_url: &str, model: &str) -> Self {
        Self::with_timeout(base_url, model, timeout_from_env())
    }

    pub fn with_timeout(base_url: &str, model: &str, timeout: Duration) -> Self {
        Self {
            http_client: http_client(timeout),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }

    /// Create from environment variables
    ///
    /// Required: `OLLAMA_HOST`
    /// Optional: `OLLAMA_MODEL` (default: llama3.2)
    pub fn from_env() -> Option<Self> {
        let host = std::env::var("OLLAMA_HOST").ok()?;
        let model = std::env::var("OLLAMA_MODEL").unwrap_or_else(|_| "llama3.2".to_string());
        Some(Self::new(&host, &model))
    }
}

/// Request to Ollama API
#[derive(Debug, Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    stream: bool,
}

/// Response from Ollama API
#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
}

#[async_trait]
impl AIBackend for OllamaBackend {
    async fn generate(&self, prompt: &RenderedPrompt) -> Result<String> {
        let request = OllamaRequest {
            model: &self.model,
            prompt: &prompt.user,
            system: prompt.system.as_deref(),
            stream: false,
        };

        let response = self
            .http_client
            .post(format!("{}/api/generate", self.base_url))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Ai(format!(
                "Ollama API error {}: {}",
                status,
                truncate_for_log(&body)
            )));
        }

        let ollama_response: OllamaResponse = response.json().await?;
        debug!("Ollama response: {}", truncate_for_log(&ollama_response.response));

        Ok(ollama_response.response)
    }

    async fn health_check(&self) -> bool {
        match self
            .http_client
            .get(format!("{}/api/tags", self.base_url))
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

    #[test]
    fn test_request_omits_missing_system() {
        let request = OllamaRequest {
            model: "llama3.2",
            prompt: "hi",
            system: None,
            stream: false,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("system").is_none());
        assert_eq!(json["stream"], false);
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let backend = OllamaBackend::new("http://localhost:11434/", "llama3.2");
        assert_eq!(backend.host(), "http://localhost:11434");
        assert_eq!(backend.model(), "llama3.2");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_error() {
        let backend = OllamaBackend::with_timeout(
            "http://127.0.0.1:9",
            "llama3.2",
            Duration::from_millis(500),
        );
        let prompt = RenderedPrompt {
            system: None,
            user: "hi".to_string(),
        };
        assert!(backend.generate(&prompt).await.is_err());
        assert!(!backend.health_check().await);
    }
}

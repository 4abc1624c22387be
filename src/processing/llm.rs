//! LLM client for summaries and answers
//!
//! Talks to the Anthropic Messages API or a local Ollama server, depending on
//! `Settings::llm_backend`.

use crate::settings::{LlmBackend, Settings};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const ANTHROPIC_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic API message format
#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

/// Anthropic API request format
#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<Message>,
}

/// Anthropic API response format
#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
    usage: Option<AnthropicUsage>,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u64,
    output_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

/// Ollama /api/generate request (non-streaming)
#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
}

/// Configured text-generation client
#[derive(Clone)]
pub struct LlmClient {
    backend: LlmBackend,
    http: reqwest::Client,
    anthropic_api_key: Option<String>,
    anthropic_model: String,
    ollama_url: String,
    ollama_model: String,
}

impl LlmClient {
    pub fn from_settings(settings: &Settings) -> Result<Self, String> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.http_timeout_secs))
            .build()
            .map_err(|e| format!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            backend: settings.llm_backend,
            http,
            anthropic_api_key: settings.anthropic_api_key(),
            anthropic_model: settings.anthropic_model.clone(),
            ollama_url: settings.ollama_url.trim_end_matches('/').to_string(),
            ollama_model: settings.ollama_model.clone(),
        })
    }

    pub fn backend(&self) -> LlmBackend {
        self.backend
    }

    /// Send one prompt and return the model's text
    pub async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, String> {
        let text = match self.backend {
            LlmBackend::Anthropic => self.complete_anthropic(prompt, max_tokens).await?,
            LlmBackend::Ollama => self.complete_ollama(prompt).await?,
        };

        let text = text.trim().to_string();
        if text.is_empty() {
            return Err("Model returned an empty response".to_string());
        }
        Ok(text)
    }

    async fn complete_anthropic(&self, prompt: &str, max_tokens: u32) -> Result<String, String> {
        let api_key = self.anthropic_api_key.as_deref().ok_or("ANTHROPIC_API_KEY not set")?;

        let request = AnthropicRequest {
            model: self.anthropic_model.clone(),
            max_tokens,
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        };

        let response = self.http
            .post(ANTHROPIC_URL)
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| format!("HTTP request failed: {}", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(format!("API error {}: {}", status, body));
        }

        let api_response: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| format!("Failed to parse response: {}", e))?;

        if let Some(usage) = &api_response.usage {
            debug!("Anthropic usage: {} input / {} output tokens", usage.input_tokens, usage.output_tokens);
        }

        Ok(join_text_blocks(&api_response))
    }

    async fn complete_ollama(&self, prompt: &str) -> Result<String, String> {
        let request = OllamaRequest {
            model: self.ollama_model.clone(),
            prompt: prompt.to_string(),
            stream: false,
        };

        let response = self.http
            .post(format!("{}/api/generate", self.ollama_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| format!("Ollama request failed (is `ollama serve` running?): {}", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(format!("Ollama error {}: {}", status, body));
        }

        let api_response: OllamaResponse = response
            .json()
            .await
            .map_err(|e| format!("Failed to parse Ollama response: {}", e))?;

        Ok(api_response.response)
    }
}

/// Concatenate the text blocks of a Messages API response
fn join_text_blocks(response: &AnthropicResponse) -> String {
    response
        .content
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_anthropic_response() {
        let json = r#"{
            "content": [{"type": "text", "text": "A brief overview"}, {"type": "text", "text": " of climate change."}],
            "usage": {"input_tokens": 120, "output_tokens": 9}
        }"#;
        let response: AnthropicResponse = serde_json::from_str(json).unwrap();
        assert_eq!(join_text_blocks(&response), "A brief overview of climate change.");
        assert_eq!(response.usage.unwrap().output_tokens, 9);
    }

    #[test]
    fn test_parse_anthropic_response_without_usage() {
        let json = r#"{"content": [{"type": "tool_use"}]}"#;
        let response: AnthropicResponse = serde_json::from_str(json).unwrap();
        assert_eq!(join_text_blocks(&response), "");
    }

    #[test]
    fn test_parse_ollama_response() {
        let json = r#"{"model": "qwen2.5:7b", "response": "Greenhouse gases.", "done": true}"#;
        let response: OllamaResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.response, "Greenhouse gases.");
    }

    #[tokio::test]
    async fn test_missing_api_key() {
        let mut settings = Settings::default();
        settings.anthropic_api_key = None;
        let mut client = LlmClient::from_settings(&settings).unwrap();
        // Environment keys would make this test depend on the machine
        client.anthropic_api_key = None;

        let err = client.complete("hello", 10).await.unwrap_err();
        assert!(err.contains("ANTHROPIC_API_KEY"));
    }

    #[test]
    fn test_ollama_url_trailing_slash() {
        let mut settings = Settings::default();
        settings.llm_backend = LlmBackend::Ollama;
        settings.ollama_url = "http://gpu-box:11434/".to_string();
        let client = LlmClient::from_settings(&settings).unwrap();
        assert_eq!(client.ollama_url, "http://gpu-box:11434");
        assert_eq!(client.backend(), LlmBackend::Ollama);
    }
}

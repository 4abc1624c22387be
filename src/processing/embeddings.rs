//! Embedding client for document chunks and questions
//!
//! With the "anthropic" backend embeddings come from the OpenAI API
//! (Anthropic has no embedding endpoint); with "ollama" they come from the
//! local Ollama server.

use crate::settings::{LlmBackend, Settings};
use crate::utils::safe_truncate;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const OPENAI_EMBEDDINGS_URL: &str = "https://api.openai.com/v1/embeddings";

/// Roughly 8000 tokens
const MAX_EMBED_BYTES: usize = 30_000;

/// OpenAI embeddings API request format
#[derive(Debug, Serialize)]
struct OpenAiEmbeddingRequest {
    model: String,
    input: Vec<String>,
}

/// OpenAI embeddings API response format
#[derive(Debug, Deserialize)]
struct OpenAiEmbeddingResponse {
    data: Vec<EmbeddingData>,
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    total_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Debug, Serialize)]
struct OllamaEmbeddingRequest {
    model: String,
    prompt: String,
}

#[derive(Debug, Deserialize)]
struct OllamaEmbeddingResponse {
    embedding: Vec<f32>,
}

#[derive(Clone)]
pub struct Embedder {
    backend: LlmBackend,
    http: reqwest::Client,
    openai_api_key: Option<String>,
    openai_model: String,
    ollama_url: String,
    ollama_model: String,
}

impl Embedder {
    pub fn from_settings(settings: &Settings) -> Result<Self, String> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.http_timeout_secs))
            .build()
            .map_err(|e| format!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            backend: settings.llm_backend,
            http,
            openai_api_key: settings.openai_api_key(),
            openai_model: settings.openai_embedding_model.clone(),
            ollama_url: settings.ollama_url.trim_end_matches('/').to_string(),
            ollama_model: settings.ollama_embedding_model.clone(),
        })
    }

    /// Embed a single text (a question)
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, String> {
        self.embed_batch(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| "No embedding in response".to_string())
    }

    /// Embed many texts, preserving input order
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, String> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        match self.backend {
            LlmBackend::Anthropic => self.embed_openai(texts).await,
            LlmBackend::Ollama => {
                let mut out = Vec::with_capacity(texts.len());
                for text in texts {
                    out.push(self.embed_ollama(text).await?);
                }
                Ok(out)
            }
        }
    }

    async fn embed_openai(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, String> {
        let api_key = self.openai_api_key.as_deref().ok_or("OPENAI_API_KEY not set")?;

        let request = OpenAiEmbeddingRequest {
            model: self.openai_model.clone(),
            input: texts
                .iter()
                .map(|t| safe_truncate(t, MAX_EMBED_BYTES).to_string())
                .collect(),
        };

        let response = self.http
            .post(OPENAI_EMBEDDINGS_URL)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| format!("Embedding HTTP request failed: {}", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(format!("OpenAI embedding API error {}: {}", status, body));
        }

        let api_response: OpenAiEmbeddingResponse = response
            .json()
            .await
            .map_err(|e| format!("Failed to parse embedding response: {}", e))?;

        if let Some(usage) = &api_response.usage {
            debug!("OpenAI embeddings: {} tokens for {} inputs", usage.total_tokens, texts.len());
        }

        order_by_index(api_response.data, texts.len())
    }

    async fn embed_ollama(&self, text: &str) -> Result<Vec<f32>, String> {
        let request = OllamaEmbeddingRequest {
            model: self.ollama_model.clone(),
            prompt: safe_truncate(text, MAX_EMBED_BYTES).to_string(),
        };

        let response = self.http
            .post(format!("{}/api/embeddings", self.ollama_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| format!("Ollama embedding request failed: {}", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(format!("Ollama embedding error {}: {}", status, body));
        }

        let api_response: OllamaEmbeddingResponse = response
            .json()
            .await
            .map_err(|e| format!("Failed to parse Ollama embedding response: {}", e))?;

        if api_response.embedding.is_empty() {
            return Err(format!("Ollama model '{}' returned an empty embedding", self.ollama_model));
        }
        Ok(api_response.embedding)
    }
}

/// The API may return items out of order; put them back by `index`
fn order_by_index(mut data: Vec<EmbeddingData>, expected: usize) -> Result<Vec<Vec<f32>>, String> {
    if data.len() != expected {
        return Err(format!("Expected {} embeddings, got {}", expected, data.len()));
    }
    data.sort_by_key(|d| d.index);
    Ok(data.into_iter().map(|d| d.embedding).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_by_index() {
        let json = r#"{
            "data": [
                {"object": "embedding", "index": 1, "embedding": [0.0, 1.0]},
                {"object": "embedding", "index": 0, "embedding": [1.0, 0.0]}
            ],
            "usage": {"prompt_tokens": 4, "total_tokens": 4}
        }"#;
        let response: OpenAiEmbeddingResponse = serde_json::from_str(json).unwrap();
        let ordered = order_by_index(response.data, 2).unwrap();
        assert_eq!(ordered, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn test_order_by_index_count_mismatch() {
        let data = vec![EmbeddingData { index: 0, embedding: vec![1.0] }];
        assert!(order_by_index(data, 3).is_err());
    }

    #[tokio::test]
    async fn test_empty_batch_needs_no_backend() {
        let embedder = Embedder::from_settings(&Settings::default()).unwrap();
        assert!(embedder.embed_batch(&[]).await.unwrap().is_empty());
    }
}

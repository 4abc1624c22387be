//! Application settings storage
//!
//! Stores configuration like API keys and model names in a JSON file in the
//! data directory. API keys can also come from the environment, which takes
//! precedence over the stored value.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// File name of the settings file inside the data directory
pub const SETTINGS_FILE: &str = "settings.json";

/// Default file name of the feedback log inside the data directory
pub const FEEDBACK_FILE: &str = "feedback.csv";

/// Which service generates summaries and answers
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LlmBackend {
    Anthropic,
    Ollama,
}

impl LlmBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            LlmBackend::Anthropic => "anthropic",
            LlmBackend::Ollama => "ollama",
        }
    }
}

impl std::str::FromStr for LlmBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "anthropic" => Ok(LlmBackend::Anthropic),
            "ollama" => Ok(LlmBackend::Ollama),
            _ => Err(format!("Unknown backend '{}' (expected anthropic or ollama)", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// LLM backend: "anthropic" or "ollama" (default: "anthropic")
    #[serde(default = "default_llm_backend")]
    pub llm_backend: LlmBackend,
    #[serde(default)]
    pub anthropic_api_key: Option<String>,
    #[serde(default = "default_anthropic_model")]
    pub anthropic_model: String,
    /// Used for embeddings when the backend is "anthropic"
    #[serde(default)]
    pub openai_api_key: Option<String>,
    #[serde(default = "default_openai_embedding_model")]
    pub openai_embedding_model: String,
    #[serde(default = "default_ollama_url")]
    pub ollama_url: String,
    #[serde(default = "default_ollama_model")]
    pub ollama_model: String,
    #[serde(default = "default_ollama_embedding_model")]
    pub ollama_embedding_model: String,
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Override for the feedback log location (default: <data_dir>/feedback.csv)
    #[serde(default)]
    pub feedback_csv: Option<PathBuf>,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    /// Idle sessions are discarded after this long
    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: u64,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
    /// Number of chunks handed to the model as context for an answer
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_max_summary_input")]
    pub max_summary_input_chars: usize,
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,
}

fn default_llm_backend() -> LlmBackend {
    LlmBackend::Anthropic
}

fn default_anthropic_model() -> String {
    "claude-haiku-4-5-20251001".to_string()
}

fn default_openai_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "qwen2.5:7b".to_string()
}

fn default_ollama_embedding_model() -> String {
    "nomic-embed-text".to_string()
}

fn default_bind() -> String {
    "127.0.0.1:8501".to_string()
}

fn default_max_upload_bytes() -> usize {
    20 * 1024 * 1024 // 20MB
}

fn default_session_ttl() -> u64 {
    3600 // 1 hour
}

fn default_chunk_size() -> usize {
    1000
}

fn default_chunk_overlap() -> usize {
    200
}

fn default_top_k() -> usize {
    4
}

fn default_max_summary_input() -> usize {
    12_000
}

fn default_http_timeout() -> u64 {
    120
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            llm_backend: default_llm_backend(),
            anthropic_api_key: None,
            anthropic_model: default_anthropic_model(),
            openai_api_key: None,
            openai_embedding_model: default_openai_embedding_model(),
            ollama_url: default_ollama_url(),
            ollama_model: default_ollama_model(),
            ollama_embedding_model: default_ollama_embedding_model(),
            bind: default_bind(),
            feedback_csv: None,
            max_upload_bytes: default_max_upload_bytes(),
            session_ttl_secs: default_session_ttl(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            top_k: default_top_k(),
            max_summary_input_chars: default_max_summary_input(),
            http_timeout_secs: default_http_timeout(),
        }
    }
}

impl Settings {
    /// Load settings from disk or fall back to defaults
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Settings::default();
        }
        match fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!("Ignoring unparsable settings file {}: {}", path.display(), e);
                Settings::default()
            }),
            Err(e) => {
                warn!("Failed to read settings file {}: {}", path.display(), e);
                Settings::default()
            }
        }
    }

    /// Load `settings.json` from the data directory
    pub fn load_from_dir(data_dir: &Path) -> Self {
        Self::load(&data_dir.join(SETTINGS_FILE))
    }

    /// Save settings to disk
    pub fn save(&self, path: &Path) -> Result<(), String> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize settings: {}", e))?;

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config directory: {}", e))?;
        }

        fs::write(path, content)
            .map_err(|e| format!("Failed to write settings: {}", e))?;

        Ok(())
    }

    /// Anthropic API key (checks env var first, then stored setting)
    pub fn anthropic_api_key(&self) -> Option<String> {
        key_from_env("ANTHROPIC_API_KEY").or_else(|| non_empty(self.anthropic_api_key.as_deref()))
    }

    /// OpenAI API key (checks env var first, then stored setting)
    pub fn openai_api_key(&self) -> Option<String> {
        key_from_env("OPENAI_API_KEY").or_else(|| non_empty(self.openai_api_key.as_deref()))
    }

    /// Where the feedback log lives
    pub fn feedback_path(&self, data_dir: &Path) -> PathBuf {
        self.feedback_csv
            .clone()
            .unwrap_or_else(|| data_dir.join(FEEDBACK_FILE))
    }
}

fn key_from_env(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|k| !k.is_empty())
}

fn non_empty(key: Option<&str>) -> Option<String> {
    key.filter(|k| !k.is_empty()).map(str::to_string)
}

/// Default data directory (`<platform data dir>/research-analyzer`)
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|p| p.join("research-analyzer"))
        .unwrap_or_else(|| PathBuf::from("."))
}

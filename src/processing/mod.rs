//! Document processing: text extraction, summarization and retrieval
//!
//! The controller only talks to the [`DocumentProcessor`] trait. The
//! production implementation is [`rag::RagProcessor`]:
//! 1. `pdf_extractor` pulls plain text out of the PDF
//! 2. `llm` writes the summary and answers questions
//! 3. `embeddings` + `vector_store` chunk, embed and search the document

pub mod embeddings;
pub mod llm;
pub mod pdf_extractor;
pub mod rag;
pub mod vector_store;

#[cfg(test)]
pub mod testing;

use crate::error::ProcessingError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Prompt used to summarize an uploaded article; `{text}` is the only placeholder
pub const SUMMARY_PROMPT: &str = "Write a concise summary of the following:\n{text}\nCONCISE SUMMARY:\n";

/// Interpolate the document text into a prompt template
pub fn render_prompt(template: &str, text: &str) -> String {
    template.replacen("{text}", text, 1)
}

/// Opaque reference to an indexed document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StoreHandle(Uuid);

impl StoreHandle {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for StoreHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for StoreHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Everything the dashboard needs from one PDF
#[async_trait]
pub trait DocumentProcessor: Send + Sync {
    /// Pull plain text out of PDF bytes
    async fn extract(&self, pdf_bytes: &[u8]) -> Result<String, ProcessingError>;

    /// Summarize `text` using a template with a `{text}` placeholder
    async fn summarize(&self, text: &str, prompt_template: &str) -> Result<String, ProcessingError>;

    /// Store the document for retrieval and return its handle
    async fn index(&self, text: &str) -> Result<StoreHandle, ProcessingError>;

    /// Answer a question using only the indexed document
    async fn query(&self, question: &str, handle: StoreHandle) -> Result<String, ProcessingError>;
}

//! Production document processor: pdf-extract + LLM + embedding retrieval

use super::embeddings::Embedder;
use super::llm::LlmClient;
use super::pdf_extractor::extract_text_from_pdf;
use super::vector_store::{chunk_text, Chunk, Collection, VectorStore};
use super::{render_prompt, DocumentProcessor, StoreHandle};
use crate::error::ProcessingError;
use crate::settings::Settings;
use crate::utils::safe_truncate;
use async_trait::async_trait;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

const SUMMARY_MAX_TOKENS: u32 = 600;
const ANSWER_MAX_TOKENS: u32 = 500;

/// Instructions placed before the retrieved chunks in the answer prompt
const ANSWER_INSTRUCTIONS: &str = "Use the following pieces of context to answer the question at the end. \
If you don't know the answer, just say that you don't know, don't try to make up an answer.";

pub struct RagProcessor {
    llm: LlmClient,
    embedder: Embedder,
    store: VectorStore,
    chunk_size: usize,
    chunk_overlap: usize,
    top_k: usize,
    max_summary_input_bytes: usize,
}

impl RagProcessor {
    /// Build from settings; collections are persisted under `<data_dir>/vectors`
    pub fn from_settings(settings: &Settings, data_dir: &Path) -> Result<Self, String> {
        Ok(Self {
            llm: LlmClient::from_settings(settings)?,
            embedder: Embedder::from_settings(settings)?,
            store: VectorStore::new(data_dir.join("vectors")),
            chunk_size: settings.chunk_size,
            chunk_overlap: settings.chunk_overlap,
            top_k: settings.top_k.max(1),
            max_summary_input_bytes: settings.max_summary_input_chars,
        })
    }
}

/// Fill the answer prompt with numbered context chunks
fn answer_prompt(question: &str, context: &[String]) -> String {
    let context = context
        .iter()
        .enumerate()
        .map(|(i, c)| format!("[{}] {}", i + 1, c))
        .collect::<Vec<_>>()
        .join("\n\n");
    // One pass, so placeholder-like text inside the chunks is never substituted
    format!("{}\n\n{}\n\nQuestion: {}\nHelpful Answer:", ANSWER_INSTRUCTIONS, context, question)
}

#[async_trait]
impl DocumentProcessor for RagProcessor {
    async fn extract(&self, pdf_bytes: &[u8]) -> Result<String, ProcessingError> {
        let start = Instant::now();
        let bytes = pdf_bytes.to_vec();
        let text = tokio::task::spawn_blocking(move || extract_text_from_pdf(&bytes))
            .await
            .map_err(|e| ProcessingError::Extraction(format!("Extraction task failed: {}", e)))?
            .map_err(ProcessingError::Extraction)?;

        info!("Extracted {} chars in {}ms", text.len(), start.elapsed().as_millis());
        Ok(text)
    }

    async fn summarize(&self, text: &str, prompt_template: &str) -> Result<String, ProcessingError> {
        let input = safe_truncate(text, self.max_summary_input_bytes);
        if input.len() < text.len() {
            debug!("Summary input truncated from {} to {} bytes", text.len(), input.len());
        }

        let prompt = render_prompt(prompt_template, input);
        self.llm
            .complete(&prompt, SUMMARY_MAX_TOKENS)
            .await
            .map_err(ProcessingError::Summarization)
    }

    async fn index(&self, text: &str) -> Result<StoreHandle, ProcessingError> {
        let pieces = chunk_text(text, self.chunk_size, self.chunk_overlap);
        if pieces.is_empty() {
            return Err(ProcessingError::Indexing("Document has no text to index".to_string()));
        }

        let embeddings = self.embedder
            .embed_batch(&pieces)
            .await
            .map_err(ProcessingError::Indexing)?;

        let chunks = pieces
            .into_iter()
            .zip(embeddings)
            .map(|(text, embedding)| Chunk { text, embedding })
            .collect();

        self.store
            .insert(Collection { chunks })
            .map_err(ProcessingError::Indexing)
    }

    async fn query(&self, question: &str, handle: StoreHandle) -> Result<String, ProcessingError> {
        let query_embedding = self.embedder
            .embed(question)
            .await
            .map_err(ProcessingError::Retrieval)?;

        let context = self.store
            .search(handle, &query_embedding, self.top_k)
            .map_err(ProcessingError::Retrieval)?;
        debug!("Retrieved {} chunks from {}", context.len(), handle);

        self.llm
            .complete(&answer_prompt(question, &context), ANSWER_MAX_TOKENS)
            .await
            .map_err(ProcessingError::Retrieval)
    }
}

//! Scripted document processor for controller and router tests

use super::{DocumentProcessor, StoreHandle};
use crate::error::ProcessingError;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Which adapter step should fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailAt {
    Extract,
    Summarize,
    Index,
    Query,
}

pub struct FakeProcessor {
    pub text: String,
    pub summary: String,
    pub answer: String,
    pub handle: StoreHandle,
    pub fail_at: Option<FailAt>,
    pub extract_calls: AtomicUsize,
    pub summarize_calls: AtomicUsize,
    pub index_calls: AtomicUsize,
    pub query_calls: AtomicUsize,
    /// Prompts and (question, handle) pairs seen, for assertions
    pub prompts: Mutex<Vec<String>>,
    pub queries: Mutex<Vec<(String, StoreHandle)>>,
}

impl FakeProcessor {
    pub fn new() -> Self {
        Self {
            text: "Climate change is...".to_string(),
            summary: "A brief overview of climate change.".to_string(),
            answer: "Mostly greenhouse gas emissions from burning fossil fuels.".to_string(),
            handle: StoreHandle::new(),
            fail_at: None,
            extract_calls: AtomicUsize::new(0),
            summarize_calls: AtomicUsize::new(0),
            index_calls: AtomicUsize::new(0),
            query_calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_at(step: FailAt) -> Self {
        Self { fail_at: Some(step), ..Self::new() }
    }

    pub fn calls(&self) -> (usize, usize, usize, usize) {
        (
            self.extract_calls.load(Ordering::SeqCst),
            self.summarize_calls.load(Ordering::SeqCst),
            self.index_calls.load(Ordering::SeqCst),
            self.query_calls.load(Ordering::SeqCst),
        )
    }
}

#[async_trait]
impl DocumentProcessor for FakeProcessor {
    async fn extract(&self, _pdf_bytes: &[u8]) -> Result<String, ProcessingError> {
        self.extract_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_at == Some(FailAt::Extract) {
            return Err(ProcessingError::Extraction("scanned PDF".to_string()));
        }
        Ok(self.text.clone())
    }

    async fn summarize(&self, text: &str, prompt_template: &str) -> Result<String, ProcessingError> {
        self.summarize_calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(super::render_prompt(prompt_template, text));
        if self.fail_at == Some(FailAt::Summarize) {
            return Err(ProcessingError::Summarization("model unavailable".to_string()));
        }
        Ok(self.summary.clone())
    }

    async fn index(&self, _text: &str) -> Result<StoreHandle, ProcessingError> {
        self.index_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_at == Some(FailAt::Index) {
            return Err(ProcessingError::Indexing("embedding quota exceeded".to_string()));
        }
        Ok(self.handle)
    }

    async fn query(&self, question: &str, handle: StoreHandle) -> Result<String, ProcessingError> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().unwrap().push((question.to_string(), handle));
        if self.fail_at == Some(FailAt::Query) {
            return Err(ProcessingError::Retrieval("vector store offline".to_string()));
        }
        Ok(self.answer.clone())
    }
}

//! Error types shared by the controller, the feedback store and the web layer

use thiserror::Error;

/// Failures surfaced by the document processing adapter
#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("Text extraction failed: {0}")]
    Extraction(String),
    #[error("Summary generation failed: {0}")]
    Summarization(String),
    #[error("Saving to the vector store failed: {0}")]
    Indexing(String),
    #[error("Getting a response failed: {0}")]
    Retrieval(String),
}

/// The user asked for something the session is not ready for
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PreconditionError {
    #[error("Please upload a PDF before this method")]
    NoDocument,
    #[error("Please generate a summary before giving a feedback")]
    NoSummary,
    #[error("Please enter a question")]
    EmptyQuestion,
}

/// The feedback log could not be read or written
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Feedback file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Feedback file is malformed: {0}")]
    Csv(#[from] csv::Error),
    #[error("Feedback file has unexpected columns: {0}")]
    UnexpectedHeader(String),
    #[error("Unreadable timestamp '{0}' in feedback file")]
    InvalidTimestamp(String),
    #[error("Failed to acquire feedback writer lock")]
    LockPoisoned,
}

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error(transparent)]
    Processing(#[from] ProcessingError),
    #[error(transparent)]
    Precondition(#[from] PreconditionError),
}

//! Interaction controller
//!
//! Turns user actions (upload, ask, give feedback) into calls on the document
//! processor and the feedback log, and moves the session flags forward.

use crate::error::{ControllerError, PreconditionError};
use crate::feedback::{FeedbackLabel, FeedbackRecord, FeedbackStore};
use crate::processing::{DocumentProcessor, SUMMARY_PROMPT};
use crate::session::{ProcessedDocument, SessionState};
use crate::utils::preview;
use std::sync::Arc;
use tracing::{info, warn};

pub struct Controller {
    processor: Arc<dyn DocumentProcessor>,
    feedback: Arc<FeedbackStore>,
    prompt_template: String,
}

impl Controller {
    pub fn new(processor: Arc<dyn DocumentProcessor>, feedback: Arc<FeedbackStore>) -> Self {
        Self {
            processor,
            feedback,
            prompt_template: SUMMARY_PROMPT.to_string(),
        }
    }

    pub fn feedback_store(&self) -> &Arc<FeedbackStore> {
        &self.feedback
    }

    /// Extract, summarize, then index the upload.
    ///
    /// The session only changes when all three steps succeed; the first
    /// failure aborts the cycle.
    pub async fn process_upload(
        &self,
        session: &mut SessionState,
        pdf_bytes: &[u8],
        file_name: &str,
    ) -> Result<ProcessedDocument, ControllerError> {
        info!("Processing upload '{}' ({} bytes)", file_name, pdf_bytes.len());

        let extracted_text = self.processor.extract(pdf_bytes).await?;
        let summary = self.processor.summarize(&extracted_text, &self.prompt_template).await?;
        let handle = self.processor.index(&extracted_text).await?;

        let document = ProcessedDocument {
            file_name: file_name.to_string(),
            extracted_text,
            summary,
            handle,
        };
        session.set_document(document.clone());

        info!("Upload '{}' ready: handle {}, summary \"{}\"", file_name, handle, preview(&document.summary, 60));
        Ok(document)
    }

    /// Answer a question against the session's document
    pub async fn ask(&self, session: &SessionState, query: &str) -> Result<String, ControllerError> {
        let handle = session
            .current_store_handle()
            .ok_or(PreconditionError::NoDocument)?;

        let query = query.trim();
        if query.is_empty() {
            return Err(PreconditionError::EmptyQuestion.into());
        }

        let answer = self.processor.query(query, handle).await?;
        info!("Answered \"{}\" against {}", preview(query, 60), handle);
        Ok(answer)
    }

    /// Record a Yes/No verdict on the current summary.
    ///
    /// Returns `Ok(true)` only when a row was written. A session that already
    /// gave feedback gets `Ok(false)` without touching the log; a failed write
    /// also gives `Ok(false)` and leaves feedback enabled so the user can retry.
    pub fn submit_feedback(
        &self,
        session: &mut SessionState,
        label: FeedbackLabel,
    ) -> Result<bool, PreconditionError> {
        let summary = session.current_summary().ok_or(PreconditionError::NoSummary)?;

        if session.feedback_disabled() {
            return Ok(false);
        }

        let record = FeedbackRecord::now(summary, label);
        match self.feedback.append(&record) {
            Ok(()) => {
                session.disable_feedback();
                info!("Saved '{}' feedback to {}", label, self.feedback.path().display());
                Ok(true)
            }
            Err(e) => {
                warn!("Failed to save feedback: {}", e);
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProcessingError;
    use crate::processing::testing::{FailAt, FakeProcessor};

    struct Fixture {
        _dir: tempfile::TempDir,
        processor: Arc<FakeProcessor>,
        controller: Controller,
    }

    fn fixture(processor: FakeProcessor) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let feedback = Arc::new(FeedbackStore::new(dir.path().join("feedback.csv")));
        let processor = Arc::new(processor);
        let controller = Controller::new(processor.clone(), feedback);
        Fixture { _dir: dir, processor, controller }
    }

    #[tokio::test]
    async fn test_full_scenario() {
        let fx = fixture(FakeProcessor::new());
        let mut session = SessionState::new();

        let doc = fx.controller.process_upload(&mut session, b"%PDF-1.7", "climate.pdf").await.unwrap();
        assert_eq!(doc.extracted_text, "Climate change is...");
        assert_eq!(doc.summary, "A brief overview of climate change.");
        assert_eq!(doc.handle, fx.processor.handle);
        assert!(session.pdf_present());

        // The fixed template was used with the extracted text
        assert_eq!(
            fx.processor.prompts.lock().unwrap()[0],
            "Write a concise summary of the following:\nClimate change is...\nCONCISE SUMMARY:\n"
        );

        let answer = fx.controller.ask(&session, "What causes climate change?").await.unwrap();
        assert_eq!(answer, fx.processor.answer);
        assert_eq!(
            fx.processor.queries.lock().unwrap()[0],
            ("What causes climate change?".to_string(), fx.processor.handle)
        );

        assert!(fx.controller.submit_feedback(&mut session, FeedbackLabel::Yes).unwrap());
        assert!(session.feedback_disabled());

        // Second submission in the same session is rejected
        assert!(!fx.controller.submit_feedback(&mut session, FeedbackLabel::No).unwrap());

        let records = fx.controller.feedback_store().load_all().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].label, FeedbackLabel::Yes);
        assert_eq!(records[0].summary, "A brief overview of climate change.");
    }

    #[tokio::test]
    async fn test_ask_without_upload_never_reaches_processor() {
        let fx = fixture(FakeProcessor::new());
        let session = SessionState::new();

        let err = fx.controller.ask(&session, "What causes climate change?").await.unwrap_err();
        assert!(matches!(err, ControllerError::Precondition(PreconditionError::NoDocument)));
        assert_eq!(fx.processor.calls(), (0, 0, 0, 0));
    }

    #[tokio::test]
    async fn test_ask_empty_question() {
        let fx = fixture(FakeProcessor::new());
        let mut session = SessionState::new();
        fx.controller.process_upload(&mut session, b"%PDF", "a.pdf").await.unwrap();

        let err = fx.controller.ask(&session, "   ").await.unwrap_err();
        assert!(matches!(err, ControllerError::Precondition(PreconditionError::EmptyQuestion)));
        assert_eq!(fx.processor.calls().3, 0);
    }

    #[tokio::test]
    async fn test_ask_surfaces_retrieval_error() {
        let fx = fixture(FakeProcessor::failing_at(FailAt::Query));
        let mut session = SessionState::new();
        fx.controller.process_upload(&mut session, b"%PDF", "a.pdf").await.unwrap();

        let err = fx.controller.ask(&session, "Why?").await.unwrap_err();
        assert!(matches!(err, ControllerError::Processing(ProcessingError::Retrieval(_))));
    }

    #[tokio::test]
    async fn test_extraction_failure_aborts_cycle() {
        let fx = fixture(FakeProcessor::failing_at(FailAt::Extract));
        let mut session = SessionState::new();

        let err = fx.controller.process_upload(&mut session, b"%PDF", "a.pdf").await.unwrap_err();
        assert!(matches!(err, ControllerError::Processing(ProcessingError::Extraction(_))));
        assert_eq!(fx.processor.calls(), (1, 0, 0, 0));
        assert!(!session.pdf_present());
    }

    #[tokio::test]
    async fn test_summary_failure_skips_indexing() {
        let fx = fixture(FakeProcessor::failing_at(FailAt::Summarize));
        let mut session = SessionState::new();

        let err = fx.controller.process_upload(&mut session, b"%PDF", "a.pdf").await.unwrap_err();
        assert!(matches!(err, ControllerError::Processing(ProcessingError::Summarization(_))));
        assert_eq!(fx.processor.calls(), (1, 1, 0, 0));
        assert!(!session.pdf_present());
        assert!(session.current_summary().is_none());
    }

    #[tokio::test]
    async fn test_index_failure_leaves_session_untouched() {
        let fx = fixture(FakeProcessor::failing_at(FailAt::Index));
        let mut session = SessionState::new();

        let err = fx.controller.process_upload(&mut session, b"%PDF", "a.pdf").await.unwrap_err();
        assert!(matches!(err, ControllerError::Processing(ProcessingError::Indexing(_))));
        assert!(!session.pdf_present());
        assert!(session.current_store_handle().is_none());
    }

    #[test]
    fn test_feedback_requires_summary() {
        let fx = fixture(FakeProcessor::new());
        let mut session = SessionState::new();

        let err = fx.controller.submit_feedback(&mut session, FeedbackLabel::Yes).unwrap_err();
        assert_eq!(err, PreconditionError::NoSummary);
        assert!(!fx.controller.feedback_store().exists());
        assert!(!session.feedback_disabled());
    }

    #[tokio::test]
    async fn test_failed_write_keeps_feedback_enabled() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should be makes every write fail
        let blocked = dir.path().join("feedback.csv");
        std::fs::create_dir(&blocked).unwrap();

        let processor = Arc::new(FakeProcessor::new());
        let controller = Controller::new(processor, Arc::new(FeedbackStore::new(&blocked)));
        let mut session = SessionState::new();
        controller.process_upload(&mut session, b"%PDF", "a.pdf").await.unwrap();

        assert!(!controller.submit_feedback(&mut session, FeedbackLabel::No).unwrap());
        assert!(!session.feedback_disabled());
    }

    #[tokio::test]
    async fn test_second_upload_replaces_document() {
        let fx = fixture(FakeProcessor::new());
        let mut session = SessionState::new();
        fx.controller.process_upload(&mut session, b"%PDF", "first.pdf").await.unwrap();
        fx.controller.process_upload(&mut session, b"%PDF", "second.pdf").await.unwrap();

        assert_eq!(session.document().unwrap().file_name, "second.pdf");
        assert_eq!(fx.processor.calls(), (2, 2, 2, 0));
    }
}

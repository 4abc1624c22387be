//! PDF text extraction wrapper
//!
//! Wraps pdf-extract crate with error handling for:
//! - Non-PDF uploads
//! - Scanned/image-only PDFs (no text layer)
//! - Corrupted PDFs, including ones that make the parser panic

use crate::utils::looks_like_pdf;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Extracted text shorter than this is treated as "no text layer"
const MIN_TEXT_CHARS: usize = 20;

/// Extract full text from PDF bytes
///
/// Returns error for non-PDF input and for PDFs without extractable text
pub fn extract_text_from_pdf(pdf_bytes: &[u8]) -> Result<String, String> {
    if !looks_like_pdf(pdf_bytes) {
        return Err("Upload is not a PDF file".to_string());
    }

    let text = catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(pdf_bytes)))
        .map_err(|_| "PDF parser crashed on this file (corrupted or unsupported PDF)".to_string())?
        .map_err(|e| format!("Failed to read PDF: {}", e))?;

    let text = normalize_whitespace(&text);
    if text.chars().count() < MIN_TEXT_CHARS {
        return Err("No extractable text found (scanned or image-only PDF?)".to_string());
    }

    Ok(text)
}

/// Collapse runs of spaces and blank lines left behind by the PDF layout
fn normalize_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut blank_run = 0;

    for line in text.lines() {
        let line = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if line.is_empty() {
            blank_run += 1;
            if blank_run == 1 && !out.is_empty() {
                out.push('\n');
            }
            continue;
        }
        blank_run = 0;
        out.push_str(&line);
        out.push('\n');
    }

    out.trim_end().to_string()
}

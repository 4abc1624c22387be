//! Climate Change Research Analyzer
//!
//! Upload a research article as PDF, read an LLM-generated summary, ask
//! questions answered from the indexed text, and rate the summary. Ratings
//! are kept in a CSV feedback log and charted on a dashboard.

pub mod controller;
pub mod error;
pub mod feedback;
pub mod processing;
pub mod session;
pub mod settings;
pub mod utils;
pub mod web;

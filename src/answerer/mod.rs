//! Natural language question answering over the document index.
//!
//! This module provides `QueryOrchestrator`, which retrieves the most
//! relevant chunks for a question, stuffs them into a single grounded prompt
//! and asks the configured model for an answer.

mod orchestrator;
mod types;

pub use orchestrator::{QueryOrchestrator, RetrievalSettings, build_prompt};
pub use types::{
    EXIT_SENTINEL, QueryError, QueryOutcome, QueryResponse, QueryStage, is_ignored_input,
};

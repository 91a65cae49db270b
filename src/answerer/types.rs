//! Types for question answering results.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::llm::ModelError;
use crate::retrieval::{DocumentChunk, SearchError};

/// Literal input that is treated as "do nothing".
pub const EXIT_SENTINEL: &str = "exit";

/// Returns true if `question` should be ignored without querying anything.
///
/// # Examples
///
/// ```
/// use askdocs::answerer::is_ignored_input;
///
/// assert!(is_ignored_input("   "));
/// assert!(is_ignored_input("exit"));
/// assert!(!is_ignored_input("What is the refund policy?"));
/// ```
pub fn is_ignored_input(question: &str) -> bool {
    let trimmed = question.trim();
    trimmed.is_empty() || trimmed == EXIT_SENTINEL
}

/// Pipeline stage in which a query failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStage {
    Retrieval,
    Generation,
}

impl fmt::Display for QueryStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Retrieval => write!(f, "retrieval"),
            Self::Generation => write!(f, "generation"),
        }
    }
}

/// Errors surfaced to the caller of a single query.
///
/// None of these invalidate the engine; the next query can proceed.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Initialization has not finished yet.
    #[error("the query engine is still loading; try again shortly")]
    NotReady,

    /// Initialization failed, so no query can ever be served.
    #[error("the query engine is unavailable: {0}")]
    Unavailable(String),

    #[error("retrieval failed: {0}")]
    Retrieval(#[source] SearchError),

    #[error("generation failed: {0}")]
    Generation(#[source] ModelError),
}

impl QueryError {
    /// Returns the pipeline stage that failed, if the query got that far.
    pub fn stage(&self) -> Option<QueryStage> {
        match self {
            Self::Retrieval(_) => Some(QueryStage::Retrieval),
            Self::Generation(_) => Some(QueryStage::Generation),
            Self::NotReady | Self::Unavailable(_) => None,
        }
    }
}

/// A generated answer and the chunks it was grounded on.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResponse {
    question: String,
    answer: String,
    sources: Vec<DocumentChunk>,
    elapsed: Duration,
}

impl QueryResponse {
    pub fn new(
        question: String,
        answer: String,
        sources: Vec<DocumentChunk>,
        elapsed: Duration,
    ) -> Self {
        Self {
            question,
            answer,
            sources,
            elapsed,
        }
    }

    /// Returns the question exactly as submitted.
    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn answer(&self) -> &str {
        &self.answer
    }

    /// Returns the source chunks in retrieval order.
    pub fn sources(&self) -> &[DocumentChunk] {
        &self.sources
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Returns the wall-clock time spent on retrieval plus generation.
    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }
}

/// Result of submitting a question.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    /// Empty or sentinel input; nothing was run.
    Ignored,
    Answered(QueryResponse),
}

impl QueryOutcome {
    /// Returns the response if the question was answered.
    pub fn response(&self) -> Option<&QueryResponse> {
        match self {
            Self::Answered(response) => Some(response),
            Self::Ignored => None,
        }
    }

    pub fn is_ignored(&self) -> bool {
        matches!(self, Self::Ignored)
    }
}

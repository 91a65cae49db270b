//! Retrieval-augmented question answering.

use std::sync::Arc;
use std::time::Instant;

use crate::config::RuntimeConfig;
use crate::llm::{GenerationParams, ModelInvoker};
use crate::retrieval::{DocumentChunk, Retriever};

use super::types::{QueryError, QueryOutcome, QueryResponse, is_ignored_input};

/// Instruction that opens the grounded "stuff" prompt.
const PROMPT_PREAMBLE: &str = "Use the following pieces of context to answer the question at the end. If you don't know the answer, just say that you don't know, don't try to make up an answer.";

/// Settings the orchestrator needs from the runtime configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrievalSettings {
    pub chunk_count: usize,
    pub generation: GenerationParams,
}

impl RetrievalSettings {
    pub fn from_config(config: &RuntimeConfig) -> Self {
        Self {
            chunk_count: config.retrieved_chunk_count,
            generation: GenerationParams::from_config(config),
        }
    }
}

/// Answers questions by retrieving chunks and asking the model once.
///
/// Holds no per-query state: identical questions run the whole pipeline
/// again.
pub struct QueryOrchestrator {
    retriever: Arc<dyn Retriever>,
    model: Arc<dyn ModelInvoker>,
    settings: RetrievalSettings,
}

impl QueryOrchestrator {
    #[must_use]
    pub fn new(
        retriever: Arc<dyn Retriever>,
        model: Arc<dyn ModelInvoker>,
        settings: RetrievalSettings,
    ) -> Self {
        Self {
            retriever,
            model,
            settings,
        }
    }

    pub fn settings(&self) -> RetrievalSettings {
        self.settings
    }

    /// Answers `question` against the index.
    ///
    /// Empty input and the literal `exit` return `QueryOutcome::Ignored`
    /// without calling the retriever or the model.
    ///
    /// # Errors
    ///
    /// `QueryError::Retrieval` or `QueryError::Generation` with the
    /// collaborator's error, unmodified.
    pub fn answer(&self, question: &str) -> Result<QueryOutcome, QueryError> {
        if is_ignored_input(question) {
            return Ok(QueryOutcome::Ignored);
        }

        let start = Instant::now();

        let hits = self
            .retriever
            .search(question, self.settings.chunk_count)
            .map_err(QueryError::Retrieval)?;
        let sources: Vec<DocumentChunk> = hits.into_iter().map(|hit| hit.chunk).collect();

        let prompt = build_prompt(question, &sources);
        let answer = self
            .model
            .generate(&prompt, self.settings.generation)
            .map_err(QueryError::Generation)?;

        let elapsed = start.elapsed();
        tracing::info!(
            sources = sources.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "answered question"
        );

        Ok(QueryOutcome::Answered(QueryResponse::new(
            question.to_string(),
            answer.trim().to_string(),
            sources,
            elapsed,
        )))
    }
}

/// Stuffs every chunk into one context block next to the question.
///
/// Nothing is dropped to fit a size budget; an oversized prompt is the
/// model's problem.
pub fn build_prompt(question: &str, sources: &[DocumentChunk]) -> String {
    let context = sources
        .iter()
        .map(|chunk| chunk.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    // Single pass, so braces inside chunks or the question stay literal.
    format!("{PROMPT_PREAMBLE}\n\n{context}\n\nQuestion: {question}\nHelpful Answer:")
}

pub mod answerer;
pub mod config;
pub mod engine;
pub mod llm;
pub mod render;
pub mod retrieval;
pub mod tui;
pub mod utils;

pub use answerer::{QueryError, QueryOrchestrator, QueryOutcome, QueryResponse};
pub use config::{ConfigError, RuntimeConfig};
pub use engine::{
    Components, EngineEvent, InitError, InitializationState, LocalComponents, LogSink,
    QueryEngine, StatusSink,
};
pub use llm::{GenerationParams, ModelBackend, ModelError, ModelInvoker};
pub use retrieval::{
    DocumentChunk, Embedder, IndexError, IndexHandle, Retriever, ScoredChunk, SearchError,
};

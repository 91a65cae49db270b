//! Local LLM backends behind a single blocking `generate` contract.
//!
//! The backend selector from the configuration is parsed exactly once, in
//! [`load_model`]. After that callers only see `dyn ModelInvoker`.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::config::RuntimeConfig;

mod gpt4all;
mod llama_cpp;

pub use gpt4all::{Gpt4AllInvoker, Gpt4AllInvokerBuilder};
pub use llama_cpp::LlamaCppInvoker;

/// Errors that can occur while loading or invoking a model.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The configured backend selector is not one we know.
    #[error(
        "Model type {0} is not supported. Please choose one of the following: LlamaCpp, GPT4All"
    )]
    UnsupportedBackend(String),

    /// The weights file does not exist.
    #[error("model weights not found at {0}")]
    WeightsNotFound(PathBuf),

    /// The backend process could not be started.
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The backend process exited unsuccessfully.
    #[error("model process exited with {status}: {stderr}")]
    Process { status: String, stderr: String },

    /// Network-related errors talking to a local inference server.
    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    /// HTTP errors with status code
    #[error("HTTP error: status {status}")]
    Http { status: u16 },

    /// The backend answered with an unusable body.
    #[error("Model API error: {message}")]
    Api { message: String },

    /// Invalid URL configuration error
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// The supported local inference engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelBackend {
    /// llama.cpp running GGUF weights on CPU/GPU.
    LlamaCpp,
    /// The GPT4All desktop's local completion server.
    Gpt4All,
}

impl ModelBackend {
    /// Parses a backend selector.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::UnsupportedBackend` for anything other than
    /// `LlamaCpp` or `GPT4All`.
    pub fn parse(name: &str) -> Result<Self, ModelError> {
        match name.trim() {
            "LlamaCpp" => Ok(Self::LlamaCpp),
            "GPT4All" => Ok(Self::Gpt4All),
            other => Err(ModelError::UnsupportedBackend(other.to_string())),
        }
    }
}

impl fmt::Display for ModelBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LlamaCpp => write!(f, "LlamaCpp"),
            Self::Gpt4All => write!(f, "GPT4All"),
        }
    }
}

/// Per-call generation limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationParams {
    pub max_tokens: u32,
    pub batch_size: u32,
}

impl GenerationParams {
    pub fn from_config(config: &RuntimeConfig) -> Self {
        Self {
            max_tokens: config.max_output_tokens,
            batch_size: config.batch_size,
        }
    }
}

/// Trait for LLM backends.
///
/// Invocation is synchronous and may take many seconds. No retries or
/// timeouts are layered on top of what the backend itself does.
pub trait ModelInvoker: Send + Sync {
    /// Generates a completion for `prompt`.
    fn generate(&self, prompt: &str, params: GenerationParams) -> Result<String, ModelError>;

    /// Returns which engine this invoker drives.
    fn backend(&self) -> ModelBackend;
}

/// Builds the invoker selected by `config.model_type`.
///
/// # Errors
///
/// Returns `ModelError::UnsupportedBackend` before touching any resources if
/// the selector is unknown, or the backend's own construction error.
pub fn load_model(config: &RuntimeConfig) -> Result<Box<dyn ModelInvoker>, ModelError> {
    let backend = ModelBackend::parse(&config.model_type)?;
    tracing::info!(%backend, path = %config.model_path.display(), "loading model");

    let invoker: Box<dyn ModelInvoker> = match backend {
        ModelBackend::LlamaCpp => Box::new(LlamaCppInvoker::new(
            &config.llama_cpp_bin,
            &config.model_path,
        )?),
        ModelBackend::Gpt4All => Box::new(
            Gpt4AllInvokerBuilder::new()
                .base_url(&config.gpt4all_host)
                .model_path(&config.model_path)
                .build()?,
        ),
    };

    Ok(invoker)
}

//! Runtime configuration resolved from the process environment.
//!
//! Every setting comes from a named environment variable. A `.env` file can
//! seed the environment first (see [`load_dotenv`]). Resolution itself never
//! mutates anything; it only reads through a lookup function so tests can
//! supply their own variables.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Embeddings model identifier used when the index was built.
pub const EMBEDDINGS_MODEL_NAME: &str = "EMBEDDINGS_MODEL_NAME";
/// Directory holding the persisted vector index.
pub const PERSIST_DIRECTORY: &str = "PERSIST_DIRECTORY";
/// Backend selector, `LlamaCpp` or `GPT4All`.
pub const MODEL_TYPE: &str = "MODEL_TYPE";
/// Path to the model weights file.
pub const MODEL_PATH: &str = "MODEL_PATH";
/// Maximum number of tokens the model may generate.
pub const MODEL_N_CTX: &str = "MODEL_N_CTX";
/// Prompt batch size handed to the backend.
pub const MODEL_N_BATCH: &str = "MODEL_N_BATCH";
/// Number of chunks retrieved per question.
pub const TARGET_SOURCE_CHUNKS: &str = "TARGET_SOURCE_CHUNKS";
/// Base URL of the embeddings server.
pub const EMBEDDINGS_HOST: &str = "EMBEDDINGS_HOST";
/// llama.cpp command-line binary.
pub const LLAMA_CPP_BIN: &str = "LLAMA_CPP_BIN";
/// Base URL of the GPT4All local API server.
pub const GPT4ALL_HOST: &str = "GPT4ALL_HOST";

pub const DEFAULT_BATCH_SIZE: u32 = 8;
pub const DEFAULT_CHUNK_COUNT: usize = 4;
pub const DEFAULT_EMBEDDINGS_HOST: &str = "http://localhost:11434";
pub const DEFAULT_LLAMA_CPP_BIN: &str = "llama-cli";
pub const DEFAULT_GPT4ALL_HOST: &str = "http://localhost:4891";

/// Errors raised while resolving configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is unset or blank.
    #[error("missing required environment variable {0}")]
    Missing(String),

    /// A variable is set but its value cannot be used.
    #[error("invalid value {value:?} for {key}: expected a positive integer")]
    Invalid { key: String, value: String },

    /// An explicitly requested env file could not be loaded.
    #[error("failed to load env file {path}: {message}")]
    EnvFile { path: PathBuf, message: String },
}

/// Settings shared by the retrieval index and the model invoker.
///
/// Created once at startup and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub embeddings_model_name: String,
    pub index_location: PathBuf,
    /// Raw backend selector; parsed into a `ModelBackend` when the model is loaded.
    pub model_type: String,
    pub model_path: PathBuf,
    pub max_output_tokens: u32,
    pub batch_size: u32,
    pub retrieved_chunk_count: usize,
    pub embeddings_host: String,
    pub llama_cpp_bin: String,
    pub gpt4all_host: String,
}

impl RuntimeConfig {
    /// Resolves configuration from the current process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` for the first absent required key and
    /// `ConfigError::Invalid` for unparseable numbers.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::resolve_with(|key| std::env::var(key).ok())
    }

    /// Resolves configuration through an arbitrary variable lookup.
    ///
    /// Required keys are checked in a fixed order, so the reported missing
    /// key does not depend on hash ordering or the caller.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::collections::HashMap;
    /// use askdocs::config::{ConfigError, RuntimeConfig};
    ///
    /// let vars: HashMap<&str, &str> = HashMap::from([
    ///     ("EMBEDDINGS_MODEL_NAME", "all-minilm"),
    ///     ("PERSIST_DIRECTORY", "db"),
    ///     ("MODEL_TYPE", "LlamaCpp"),
    ///     ("MODEL_N_CTX", "512"),
    /// ]);
    /// let err = RuntimeConfig::resolve_with(|k| vars.get(k).map(|v| v.to_string())).unwrap_err();
    /// assert_eq!(err, ConfigError::Missing("MODEL_PATH".to_string()));
    /// ```
    pub fn resolve_with<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required = |key: &str| get(key).ok_or_else(|| ConfigError::Missing(key.to_string()));

        let embeddings_model_name = required(EMBEDDINGS_MODEL_NAME)?;
        let index_location = PathBuf::from(required(PERSIST_DIRECTORY)?);
        let model_type = required(MODEL_TYPE)?;
        let model_path = PathBuf::from(required(MODEL_PATH)?);
        let max_output_tokens = parse_positive(MODEL_N_CTX, &required(MODEL_N_CTX)?)?;

        let batch_size = match get(MODEL_N_BATCH) {
            Some(value) => parse_positive(MODEL_N_BATCH, &value)?,
            None => DEFAULT_BATCH_SIZE,
        };
        let retrieved_chunk_count = match get(TARGET_SOURCE_CHUNKS) {
            Some(value) => parse_positive(TARGET_SOURCE_CHUNKS, &value)?,
            None => DEFAULT_CHUNK_COUNT,
        };

        Ok(Self {
            embeddings_model_name,
            index_location,
            model_type,
            model_path,
            max_output_tokens,
            batch_size,
            retrieved_chunk_count,
            embeddings_host: get(EMBEDDINGS_HOST)
                .unwrap_or_else(|| DEFAULT_EMBEDDINGS_HOST.to_string()),
            llama_cpp_bin: get(LLAMA_CPP_BIN).unwrap_or_else(|| DEFAULT_LLAMA_CPP_BIN.to_string()),
            gpt4all_host: get(GPT4ALL_HOST).unwrap_or_else(|| DEFAULT_GPT4ALL_HOST.to_string()),
        })
    }
}

/// Parses a strictly positive integer setting.
fn parse_positive<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialEq + Default,
{
    match value.parse::<T>() {
        Ok(parsed) if parsed != T::default() => Ok(parsed),
        _ => Err(ConfigError::Invalid {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Seeds the process environment from an env file.
///
/// With `None`, a `.env` in the working directory (or a parent) is loaded
/// if present; its absence is fine. With an explicit path the file must
/// exist. Variables already set in the environment are never overridden.
///
/// # Errors
///
/// Returns `ConfigError::EnvFile` when an explicit file cannot be read or
/// parsed.
pub fn load_dotenv(path: Option<&Path>) -> Result<(), ConfigError> {
    match path {
        Some(path) => {
            dotenvy::from_path(path).map_err(|e| ConfigError::EnvFile {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
            tracing::debug!(path = %path.display(), "loaded env file");
        }
        None => {
            if let Ok(found) = dotenvy::dotenv() {
                tracing::debug!(path = %found.display(), "loaded .env");
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn full_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            (EMBEDDINGS_MODEL_NAME, "all-minilm"),
            (PERSIST_DIRECTORY, "/srv/index"),
            (MODEL_TYPE, "LlamaCpp"),
            (MODEL_PATH, "/models/ggml-model-q4_0.gguf"),
            (MODEL_N_CTX, "1000"),
        ])
    }

    fn resolve(vars: &HashMap<&'static str, &'static str>) -> Result<RuntimeConfig, ConfigError> {
        RuntimeConfig::resolve_with(|key| vars.get(key).map(|v| v.to_string()))
    }

    #[test]
    fn resolves_required_keys_and_applies_defaults() {
        let config = resolve(&full_env()).expect("config should resolve");

        assert_eq!(config.embeddings_model_name, "all-minilm");
        assert_eq!(config.index_location, PathBuf::from("/srv/index"));
        assert_eq!(config.model_type, "LlamaCpp");
        assert_eq!(config.model_path, PathBuf::from("/models/ggml-model-q4_0.gguf"));
        assert_eq!(config.max_output_tokens, 1000);
        assert_eq!(config.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(config.retrieved_chunk_count, DEFAULT_CHUNK_COUNT);
        assert_eq!(config.embeddings_host, DEFAULT_EMBEDDINGS_HOST);
        assert_eq!(config.llama_cpp_bin, DEFAULT_LLAMA_CPP_BIN);
        assert_eq!(config.gpt4all_host, DEFAULT_GPT4ALL_HOST);
    }

    #[test]
    fn optional_keys_override_defaults() {
        let mut vars = full_env();
        vars.insert(MODEL_N_BATCH, "16");
        vars.insert(TARGET_SOURCE_CHUNKS, "6");
        vars.insert(GPT4ALL_HOST, "http://127.0.0.1:9000");

        let config = resolve(&vars).expect("config should resolve");
        assert_eq!(config.batch_size, 16);
        assert_eq!(config.retrieved_chunk_count, 6);
        assert_eq!(config.gpt4all_host, "http://127.0.0.1:9000");
    }

    #[test]
    fn missing_model_path_is_reported_by_name() {
        let mut vars = full_env();
        vars.remove(MODEL_PATH);

        assert_eq!(
            resolve(&vars),
            Err(ConfigError::Missing("MODEL_PATH".to_string()))
        );
    }

    #[test]
    fn blank_required_value_counts_as_missing() {
        let mut vars = full_env();
        vars.insert(EMBEDDINGS_MODEL_NAME, "   ");

        assert_eq!(
            resolve(&vars),
            Err(ConfigError::Missing(EMBEDDINGS_MODEL_NAME.to_string()))
        );
    }

    #[test]
    fn first_missing_key_wins_in_declaration_order() {
        let vars = HashMap::from([(MODEL_N_CTX, "100")]);

        assert_eq!(
            resolve(&vars),
            Err(ConfigError::Missing(EMBEDDINGS_MODEL_NAME.to_string()))
        );
    }

    #[test]
    fn unparseable_numbers_are_rejected() {
        let mut vars = full_env();
        vars.insert(MODEL_N_BATCH, "eight");

        let err = resolve(&vars).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                key: MODEL_N_BATCH.to_string(),
                value: "eight".to_string(),
            }
        );
        assert!(err.to_string().contains("MODEL_N_BATCH"));
    }

    #[test]
    fn zero_chunk_count_is_rejected() {
        let mut vars = full_env();
        vars.insert(TARGET_SOURCE_CHUNKS, "0");

        assert!(matches!(
            resolve(&vars),
            Err(ConfigError::Invalid { key, .. }) if key == TARGET_SOURCE_CHUNKS
        ));
    }

    #[test]
    fn unknown_backend_name_still_resolves() {
        // The selector is validated when the model is loaded, not here.
        let mut vars = full_env();
        vars.insert(MODEL_TYPE, "OpenAI");

        let config = resolve(&vars).expect("config should resolve");
        assert_eq!(config.model_type, "OpenAI");
    }

    #[test]
    fn resolution_is_repeatable() {
        let vars = full_env();
        assert_eq!(resolve(&vars), resolve(&vars));
    }

    #[test]
    fn explicit_env_file_must_exist() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let missing = dir.path().join("nope.env");

        let err = load_dotenv(Some(&missing)).unwrap_err();
        assert!(matches!(err, ConfigError::EnvFile { .. }));
    }
}

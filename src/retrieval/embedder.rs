/// Embedding function used to turn questions into vectors.
///
/// `OllamaEmbedder` talks to an Ollama-compatible `/api/embed` endpoint with
/// a blocking HTTP client. Tests substitute their own `Embedder`.
use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while embedding text.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// Network-related errors (connection failures, DNS resolution, etc.)
    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    /// HTTP errors with status code
    #[error("HTTP error: status {status}")]
    Http { status: u16 },

    /// The server answered with something other than an embedding
    #[error("Embedding API error: {message}")]
    Api { message: String },

    /// Invalid URL configuration error
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// Trait for embedding providers.
///
/// Implementations must be shareable across threads since the index handle
/// is built on the initializer thread and queried from the interaction thread.
pub trait Embedder: Send + Sync {
    /// Embeds a single piece of text.
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Returns the embeddings model identifier.
    fn model_name(&self) -> &str;
}

/// Builder for constructing `OllamaEmbedder` instances.
///
/// # Examples
///
/// ```
/// use askdocs::retrieval::OllamaEmbedderBuilder;
///
/// let embedder = OllamaEmbedderBuilder::new()
///     .base_url("http://localhost:11434")
///     .model("all-minilm")
///     .build()
///     .expect("Failed to create embedder");
/// ```
#[derive(Debug, Default)]
pub struct OllamaEmbedderBuilder {
    base_url: Option<String>,
    model: Option<String>,
}

impl OllamaEmbedderBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base URL of the embeddings server.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the embeddings model name.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Builds the `OllamaEmbedder`.
    ///
    /// Falls back to `http://localhost:11434` when no base URL was given.
    ///
    /// # Errors
    ///
    /// Returns `EmbeddingError::InvalidUrl` if the base URL does not parse and
    /// `EmbeddingError::Api` if no model name was set.
    pub fn build(self) -> Result<OllamaEmbedder, EmbeddingError> {
        let base_url = self
            .base_url
            .unwrap_or_else(|| crate::config::DEFAULT_EMBEDDINGS_HOST.to_string());
        let base_url = base_url.trim_end_matches('/').to_string();
        let model = self.model.filter(|m| !m.is_empty()).ok_or_else(|| EmbeddingError::Api {
            message: "no embeddings model configured".to_string(),
        })?;

        reqwest::Url::parse(&base_url)
            .map_err(|e| EmbeddingError::InvalidUrl(format!("{}: {}", base_url, e)))?;

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(EmbeddingError::Network)?;

        Ok(OllamaEmbedder {
            client,
            base_url,
            model,
        })
    }
}

/// Blocking client for an Ollama-compatible embeddings endpoint.
pub struct OllamaEmbedder {
    client: reqwest::blocking::Client,
    base_url: String,
    model: String,
}

impl OllamaEmbedder {
    /// Returns the base URL configured for this embedder.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Embedder for OllamaEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let url = format!("{}/api/embed", self.base_url);
        let request_body = serde_json::json!({
            "model": self.model,
            "input": text,
        });

        let response = self
            .client
            .post(&url)
            .json(&request_body)
            .send()
            .map_err(EmbeddingError::Network)?;

        let status = response.status();
        if !status.is_success() {
            return Err(EmbeddingError::Http {
                status: status.as_u16(),
            });
        }

        let json: serde_json::Value = response.json().map_err(EmbeddingError::Network)?;
        parse_embed_response(&json)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Extracts the first vector from an `/api/embed` response body.
fn parse_embed_response(json: &serde_json::Value) -> Result<Vec<f32>, EmbeddingError> {
    let first = json
        .get("embeddings")
        .and_then(|v| v.as_array())
        .and_then(|arr| arr.first())
        .and_then(|v| v.as_array())
        .ok_or_else(|| EmbeddingError::Api {
            message: "Missing 'embeddings' field in API response".to_string(),
        })?;

    first
        .iter()
        .map(|v| {
            v.as_f64().map(|f| f as f32).ok_or_else(|| EmbeddingError::Api {
                message: "Non-numeric value in embedding".to_string(),
            })
        })
        .collect()
}

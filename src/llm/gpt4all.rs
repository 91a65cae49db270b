/// GPT4All backend.
///
/// The GPT4All desktop application exposes an OpenAI-compatible completion
/// server on localhost. This module provides a blocking client for it that
/// names the model by the file name of the configured weights.
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::{GenerationParams, ModelBackend, ModelError, ModelInvoker};

/// Per-request timeout for completions.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(600);

/// Builder for constructing `Gpt4AllInvoker` instances.
///
/// # Examples
///
/// ```no_run
/// use askdocs::llm::Gpt4AllInvokerBuilder;
///
/// let invoker = Gpt4AllInvokerBuilder::new()
///     .base_url("http://localhost:4891")
///     .model_path("models/ggml-gpt4all-j-v1.3-groovy.bin")
///     .build()
///     .expect("Failed to create invoker");
/// ```
#[derive(Debug, Default)]
pub struct Gpt4AllInvokerBuilder {
    base_url: Option<String>,
    model_path: Option<PathBuf>,
}

impl Gpt4AllInvokerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base URL of the GPT4All API server.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the weights file; its file name is sent as the model name.
    pub fn model_path(mut self, path: impl AsRef<Path>) -> Self {
        self.model_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Builds the `Gpt4AllInvoker`.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::WeightsNotFound` if the weights file is missing,
    /// `ModelError::InvalidUrl` if the base URL does not parse, or
    /// `ModelError::Network` if the HTTP client cannot be created.
    pub fn build(self) -> Result<Gpt4AllInvoker, ModelError> {
        let base_url = self
            .base_url
            .unwrap_or_else(|| crate::config::DEFAULT_GPT4ALL_HOST.to_string());
        let base_url = base_url.trim_end_matches('/').to_string();

        let model_path = self.model_path.unwrap_or_default();
        if !model_path.is_file() {
            return Err(ModelError::WeightsNotFound(model_path));
        }
        let model = model_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| ModelError::WeightsNotFound(model_path.clone()))?;

        reqwest::Url::parse(&base_url)
            .map_err(|e| ModelError::InvalidUrl(format!("{}: {}", base_url, e)))?;

        // Generation on CPU is slow; the timeout only guards against a hung server.
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(ModelError::Network)?;

        Ok(Gpt4AllInvoker {
            client,
            base_url,
            model,
        })
    }
}

/// Blocking client for the GPT4All completion server.
pub struct Gpt4AllInvoker {
    client: reqwest::blocking::Client,
    base_url: String,
    model: String,
}

impl Gpt4AllInvoker {
    /// Returns the base URL configured for this invoker.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the model name sent with each request.
    pub fn model(&self) -> &str {
        &self.model
    }

    fn request_body(&self, prompt: &str, params: GenerationParams) -> serde_json::Value {
        // The server has no batch-size knob; params.batch_size is unused here.
        serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "max_tokens": params.max_tokens,
            "temperature": 0.7,
            "stream": false
        })
    }
}

impl ModelInvoker for Gpt4AllInvoker {
    fn generate(&self, prompt: &str, params: GenerationParams) -> Result<String, ModelError> {
        let url = format!("{}/v1/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&self.request_body(prompt, params))
            .send()
            .map_err(ModelError::Network)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ModelError::Http {
                status: status.as_u16(),
            });
        }

        let json: serde_json::Value = response.json().map_err(ModelError::Network)?;
        parse_completion(&json)
    }

    fn backend(&self) -> ModelBackend {
        ModelBackend::Gpt4All
    }
}

/// Extracts `choices[0].text` from a completion response.
fn parse_completion(json: &serde_json::Value) -> Result<String, ModelError> {
    json.get("choices")
        .and_then(|v| v.as_array())
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.get("text"))
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .ok_or_else(|| ModelError::Api {
            message: "Missing 'choices[0].text' field in API response".to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weights() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let path = dir.path().join("ggml-gpt4all-j-v1.3-groovy.bin");
        std::fs::write(&path, b"weights").expect("failed to write weights");
        (dir, path)
    }

    #[test]
    fn model_name_is_weights_file_name() {
        let (_dir, path) = weights();
        let invoker = Gpt4AllInvokerBuilder::new()
            .model_path(&path)
            .build()
            .expect("should build");

        assert_eq!(invoker.model(), "ggml-gpt4all-j-v1.3-groovy.bin");
        assert_eq!(invoker.base_url(), crate::config::DEFAULT_GPT4ALL_HOST);
    }

    #[test]
    fn missing_weights_are_rejected() {
        let result = Gpt4AllInvokerBuilder::new()
            .model_path("/no/such/model.bin")
            .build();

        assert!(matches!(result, Err(ModelError::WeightsNotFound(_))));
    }

    #[test]
    fn invalid_url_is_rejected() {
        let (_dir, path) = weights();
        let result = Gpt4AllInvokerBuilder::new()
            .base_url("::not a url::")
            .model_path(&path)
            .build();

        assert!(matches!(result, Err(ModelError::InvalidUrl(_))));
    }

    #[test]
    fn request_body_carries_limits() {
        let (_dir, path) = weights();
        let invoker = Gpt4AllInvokerBuilder::new()
            .model_path(&path)
            .build()
            .expect("should build");

        let body = invoker.request_body(
            "Question?",
            GenerationParams {
                max_tokens: 300,
                batch_size: 8,
            },
        );
        assert_eq!(body["prompt"], "Question?");
        assert_eq!(body["max_tokens"], 300);
        assert_eq!(body["stream"], false);
    }

    #[test]
    fn parses_completion_text() {
        let json = serde_json::json!({
            "choices": [{ "text": " Refunds are accepted within 30 days. \n", "index": 0 }]
        });

        assert_eq!(
            parse_completion(&json).expect("should parse"),
            "Refunds are accepted within 30 days."
        );
    }

    #[test]
    fn missing_choices_is_an_api_error() {
        let json = serde_json::json!({ "error": "model not loaded" });

        assert!(matches!(
            parse_completion(&json),
            Err(ModelError::Api { .. })
        ));
    }
}

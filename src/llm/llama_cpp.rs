//! llama.cpp backend driven through its command-line binary.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use super::{GenerationParams, ModelBackend, ModelError, ModelInvoker};

/// Runs GGUF weights with the llama.cpp CLI, one process per prompt.
#[derive(Debug, Clone)]
pub struct LlamaCppInvoker {
    program: String,
    model_path: PathBuf,
}

impl LlamaCppInvoker {
    /// Creates an invoker for the weights at `model_path`.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::WeightsNotFound` if `model_path` is not a file.
    pub fn new(program: impl Into<String>, model_path: &Path) -> Result<Self, ModelError> {
        if !model_path.is_file() {
            return Err(ModelError::WeightsNotFound(model_path.to_path_buf()));
        }

        Ok(Self {
            program: program.into(),
            model_path: model_path.to_path_buf(),
        })
    }

    /// Builds the argument list for one generation.
    fn args(&self, prompt: &str, params: GenerationParams) -> Vec<String> {
        vec![
            "-m".to_string(),
            self.model_path.display().to_string(),
            "-n".to_string(),
            params.max_tokens.to_string(),
            "-b".to_string(),
            params.batch_size.to_string(),
            "--no-display-prompt".to_string(),
            "-no-cnv".to_string(),
            "-p".to_string(),
            prompt.to_string(),
        ]
    }
}

impl ModelInvoker for LlamaCppInvoker {
    fn generate(&self, prompt: &str, params: GenerationParams) -> Result<String, ModelError> {
        tracing::debug!(program = %self.program, max_tokens = params.max_tokens, "running llama.cpp");

        let output = Command::new(&self.program)
            .args(self.args(prompt, params))
            .output()
            .map_err(|source| ModelError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        completion_from_output(output)
    }

    fn backend(&self) -> ModelBackend {
        ModelBackend::LlamaCpp
    }
}

/// Turns a finished process into the generated text.
fn completion_from_output(output: Output) -> Result<String, ModelError> {
    if !output.status.success() {
        return Err(ModelError::Process {
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

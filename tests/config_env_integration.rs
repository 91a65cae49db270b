//! Integration tests for resolving configuration from the process
//! environment and from env files.
//!
//! These tests mutate process-wide environment variables, so they run
//! serially.

use std::io::Write;

use askdocs::config::{ConfigError, RuntimeConfig, load_dotenv};
use serial_test::serial;
use tempfile::NamedTempFile;

const KEYS: [&str; 10] = [
    "EMBEDDINGS_MODEL_NAME",
    "PERSIST_DIRECTORY",
    "MODEL_TYPE",
    "MODEL_PATH",
    "MODEL_N_CTX",
    "MODEL_N_BATCH",
    "TARGET_SOURCE_CHUNKS",
    "EMBEDDINGS_HOST",
    "LLAMA_CPP_BIN",
    "GPT4ALL_HOST",
];

fn clear_env() {
    for key in KEYS {
        // SAFETY: tests in this file are #[serial] and spawn no threads.
        unsafe { std::env::remove_var(key) };
    }
}

fn set_env(pairs: &[(&str, &str)]) {
    for (key, value) in pairs {
        // SAFETY: tests in this file are #[serial] and spawn no threads.
        unsafe { std::env::set_var(key, value) };
    }
}

fn set_required() {
    set_env(&[
        ("EMBEDDINGS_MODEL_NAME", "all-minilm"),
        ("PERSIST_DIRECTORY", "db"),
        ("MODEL_TYPE", "GPT4All"),
        ("MODEL_PATH", "models/ggml-gpt4all-j-v1.3-groovy.bin"),
        ("MODEL_N_CTX", "1000"),
    ]);
}

#[test]
#[serial]
fn resolves_from_environment_with_defaults() {
    clear_env();
    set_required();

    let config = RuntimeConfig::from_env().expect("config should resolve");

    assert_eq!(config.embeddings_model_name, "all-minilm");
    assert_eq!(config.index_location.to_str(), Some("db"));
    assert_eq!(config.model_type, "GPT4All");
    assert_eq!(config.max_output_tokens, 1000);
    assert_eq!(config.batch_size, 8);
    assert_eq!(config.retrieved_chunk_count, 4);
    assert_eq!(config.embeddings_host, "http://localhost:11434");

    clear_env();
}

#[test]
#[serial]
fn optional_overrides_are_honoured() {
    clear_env();
    set_required();
    set_env(&[("MODEL_N_BATCH", "16"), ("TARGET_SOURCE_CHUNKS", "2")]);

    let config = RuntimeConfig::from_env().expect("config should resolve");

    assert_eq!(config.batch_size, 16);
    assert_eq!(config.retrieved_chunk_count, 2);

    clear_env();
}

#[test]
#[serial]
fn missing_model_path_is_reported_by_name() {
    clear_env();
    set_required();
    // SAFETY: tests in this file are #[serial] and spawn no threads.
    unsafe { std::env::remove_var("MODEL_PATH") };

    let err = RuntimeConfig::from_env().unwrap_err();
    assert_eq!(err, ConfigError::Missing("MODEL_PATH".to_string()));
    assert!(err.to_string().contains("MODEL_PATH"));

    clear_env();
}

#[test]
#[serial]
fn env_file_seeds_missing_variables_without_overriding() {
    clear_env();
    set_env(&[("MODEL_TYPE", "LlamaCpp")]);

    let mut file = NamedTempFile::new().expect("temp env file");
    writeln!(
        file,
        "EMBEDDINGS_MODEL_NAME=all-minilm\n\
         PERSIST_DIRECTORY=db\n\
         MODEL_TYPE=GPT4All\n\
         MODEL_PATH=models/model.bin\n\
         MODEL_N_CTX=512"
    )
    .expect("write env file");

    load_dotenv(Some(file.path())).expect("env file should load");
    let config = RuntimeConfig::from_env().expect("config should resolve");

    assert_eq!(config.model_type, "LlamaCpp");
    assert_eq!(config.max_output_tokens, 512);

    clear_env();
}

#[test]
#[serial]
fn explicit_env_file_must_exist() {
    let dir = tempfile::tempdir().expect("tempdir");
    let missing = dir.path().join("nope.env");

    let err = load_dotenv(Some(&missing)).unwrap_err();
    assert!(matches!(err, ConfigError::EnvFile { .. }));
}

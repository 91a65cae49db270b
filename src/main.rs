use std::path::PathBuf;

use anyhow::{Context, Result};
use askdocs::config::{ConfigError, load_dotenv};
use askdocs::engine::{EngineEvent, InitializationState, LocalComponents, QueryEngine, StatusSink};
use askdocs::render::{RenderOptions, render_response};
use askdocs::{QueryError, QueryOutcome, RuntimeConfig};
use clap::{Parser, Subcommand};

/// askdocs - ask questions about your documents with a local LLM
#[derive(Parser)]
#[command(name = "askdocs")]
#[command(about = "Ask questions about a private document index using a local LLM")]
#[command(version)]
struct Cli {
    /// Load environment variables from this file instead of ./.env
    #[arg(long, value_name = "PATH", global = true)]
    env_file: Option<PathBuf>,

    /// Do not print the source passages used for each answer
    #[arg(short = 'S', long, global = true)]
    hide_source: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Launch interactive terminal UI (default)
    Tui,
    /// Answer a single question and exit
    Ask(AskCommand),
}

/// Answer a single question
#[derive(Parser)]
struct AskCommand {
    /// The question to ask
    #[arg(value_name = "QUESTION")]
    question: String,
}

fn main() {
    let cli = Cli::parse();

    let result = run(&cli);

    if let Err(e) = result {
        // Determine exit code based on error type
        let exit_code = if is_user_error(&e) { 1 } else { 2 };
        eprintln!("Error: {e:#}");
        std::process::exit(exit_code);
    }
}

fn run(cli: &Cli) -> Result<()> {
    // Logging is best effort; the app works without a log file.
    match askdocs::utils::get_log_path() {
        Ok(path) => {
            if let Err(e) = askdocs::utils::init_logging(&path) {
                eprintln!("Warning: logging disabled: {e:#}");
            }
        }
        Err(e) => eprintln!("Warning: logging disabled: {e:#}"),
    }

    load_dotenv(cli.env_file.as_deref()).context("Failed to load environment")?;

    let options = RenderOptions {
        hide_sources: cli.hide_source,
    };

    match &cli.command {
        None | Some(Commands::Tui) => askdocs::tui::run(LocalComponents, options),
        Some(Commands::Ask(cmd)) => handle_ask(cmd, options),
    }
}

/// Determines if an error is a user error (vs internal error).
///
/// User errors are configuration problems the user can fix by editing the
/// environment, and empty questions.
fn is_user_error(error: &anyhow::Error) -> bool {
    error.chain().any(|cause| cause.downcast_ref::<ConfigError>().is_some())
        || error.to_string().contains("cannot be empty")
}

/// Prints engine status lines to stderr.
struct StderrSink;

impl StatusSink for StderrSink {
    fn publish(&self, event: EngineEvent) {
        if let EngineEvent::Status(line) = event {
            eprintln!("{line}");
        }
    }
}

/// Handles the ask command by initializing inline and answering once.
fn handle_ask(cmd: &AskCommand, options: RenderOptions) -> Result<()> {
    if cmd.question.trim().is_empty() {
        anyhow::bail!("Question cannot be empty");
    }
    // The exit sentinel is a silent no-op, as in the TUI.
    if askdocs::answerer::is_ignored_input(&cmd.question) {
        return Ok(());
    }

    // Resolve up front so configuration mistakes exit as user errors.
    RuntimeConfig::from_env().context("Invalid configuration")?;

    let engine = QueryEngine::new();
    if let InitializationState::Failed(reason) = engine.initialize(&LocalComponents, &StderrSink)
    {
        anyhow::bail!("Initialization failed: {reason}");
    }

    print_outcome(engine.answer(&cmd.question), options)
}

/// Prints an answered question to stdout.
fn print_outcome(outcome: Result<QueryOutcome, QueryError>, options: RenderOptions) -> Result<()> {
    match outcome.context("Query failed")? {
        QueryOutcome::Answered(response) => {
            println!("{}", render_response(&response, options));
        }
        QueryOutcome::Ignored => {}
    }
    Ok(())
}

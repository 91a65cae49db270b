//! One-shot initialization pipeline and the shared query engine.
//!
//! `QueryEngine` owns the process-wide initialization state. A background
//! thread resolves the configuration, opens the index, loads the model and
//! assembles a `QueryOrchestrator`, then publishes it together with the
//! `Ready` transition under a single write lock. Readers either see the
//! finished orchestrator or no orchestrator at all.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::Sender;
use std::sync::{Arc, PoisonError, RwLock};
use std::thread::{self, JoinHandle};

use thiserror::Error;

use crate::answerer::{
    QueryError, QueryOrchestrator, QueryOutcome, RetrievalSettings, is_ignored_input,
};
use crate::config::{ConfigError, RuntimeConfig};
use crate::llm::{self, ModelError, ModelInvoker};
use crate::retrieval::{IndexError, IndexHandle, Retriever};

pub const OPENING_INDEX_STATUS: &str = "Loading document index ...";
pub const LOADING_MODEL_STATUS: &str = "Loading Language Model - please wait ...";
pub const INITIALIZING_CHAIN_STATUS: &str = "Initializing query chain ...";
pub const READY_STATUS: &str = "Ready. Ask a question about your documents.";

/// Name of the background initialization thread.
pub const INIT_THREAD_NAME: &str = "askdocs-init";

/// Lifecycle of the engine. Moves forward only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitializationState {
    NotStarted,
    Loading,
    Ready,
    Failed(String),
}

impl InitializationState {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    /// Returns true once initialization has finished, successfully or not.
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Ready | Self::Failed(_))
    }
}

impl fmt::Display for InitializationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotStarted => write!(f, "not started"),
            Self::Loading => write!(f, "loading"),
            Self::Ready => write!(f, "ready"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Errors that stop the initialization pipeline.
#[derive(Debug, Error)]
pub enum InitError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("index error: {0}")]
    Index(#[from] IndexError),

    #[error("model error: {0}")]
    Model(#[from] ModelError),

    #[error("failed to start initialization thread: {0}")]
    Thread(#[source] std::io::Error),

    #[error("initialization panicked: {0}")]
    Panicked(String),
}

/// Something the engine reports to the interaction layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Human-readable progress line, to be shown verbatim.
    Status(String),
    /// A state transition.
    State(InitializationState),
}

/// Receiver of engine progress.
///
/// This is the only status channel; nothing is printed directly.
pub trait StatusSink: Send {
    fn publish(&self, event: EngineEvent);
}

impl StatusSink for Sender<EngineEvent> {
    fn publish(&self, event: EngineEvent) {
        // A closed receiver means the UI is gone; nothing left to tell.
        let _ = self.send(event);
    }
}

/// Sink that only records events in the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl StatusSink for LogSink {
    fn publish(&self, event: EngineEvent) {
        match event {
            EngineEvent::Status(line) => tracing::info!("{line}"),
            EngineEvent::State(state) => tracing::debug!(%state, "engine state changed"),
        }
    }
}

/// Factory for the collaborators built during initialization.
///
/// Each method is called at most once per engine, in declaration order, and
/// only if the previous one succeeded.
pub trait Components: Send {
    fn resolve_config(&self) -> Result<RuntimeConfig, ConfigError>;

    fn open_index(&self, config: &RuntimeConfig) -> Result<Arc<dyn Retriever>, IndexError>;

    fn load_model(&self, config: &RuntimeConfig) -> Result<Arc<dyn ModelInvoker>, ModelError>;
}

/// Production wiring: environment config, on-disk index, local model.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalComponents;

impl Components for LocalComponents {
    fn resolve_config(&self) -> Result<RuntimeConfig, ConfigError> {
        RuntimeConfig::from_env()
    }

    fn open_index(&self, config: &RuntimeConfig) -> Result<Arc<dyn Retriever>, IndexError> {
        Ok(Arc::new(IndexHandle::open(config)?))
    }

    fn load_model(&self, config: &RuntimeConfig) -> Result<Arc<dyn ModelInvoker>, ModelError> {
        Ok(Arc::from(llm::load_model(config)?))
    }
}

/// Runs the ordered pipeline and returns the assembled orchestrator.
///
/// # Errors
///
/// Returns the first stage failure; later stages are not attempted.
pub fn build_orchestrator(
    components: &dyn Components,
    sink: &dyn StatusSink,
) -> Result<QueryOrchestrator, InitError> {
    let config = components.resolve_config()?;
    tracing::debug!(?config, "resolved configuration");

    sink.publish(EngineEvent::Status(OPENING_INDEX_STATUS.to_string()));
    let retriever = components.open_index(&config)?;

    sink.publish(EngineEvent::Status(LOADING_MODEL_STATUS.to_string()));
    let model = components.load_model(&config)?;

    sink.publish(EngineEvent::Status(INITIALIZING_CHAIN_STATUS.to_string()));
    Ok(QueryOrchestrator::new(
        retriever,
        model,
        RetrievalSettings::from_config(&config),
    ))
}

enum Phase {
    NotStarted,
    Loading,
    Ready(Arc<QueryOrchestrator>),
    Failed(String),
}

/// Process-wide query engine.
///
/// Only the initialization pipeline writes to it; everything else reads.
pub struct QueryEngine {
    phase: RwLock<Phase>,
}

impl Default for QueryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryEngine {
    pub fn new() -> Self {
        Self {
            phase: RwLock::new(Phase::NotStarted),
        }
    }

    /// Returns a snapshot of the initialization state.
    pub fn state(&self) -> InitializationState {
        match &*self.phase.read().unwrap_or_else(PoisonError::into_inner) {
            Phase::NotStarted => InitializationState::NotStarted,
            Phase::Loading => InitializationState::Loading,
            Phase::Ready(_) => InitializationState::Ready,
            Phase::Failed(reason) => InitializationState::Failed(reason.clone()),
        }
    }

    /// Starts initialization on a background thread.
    ///
    /// Returns `None` without doing anything if initialization was already
    /// started, including after it finished or failed.
    pub fn start<C, S>(self: &Arc<Self>, components: C, sink: S) -> Option<JoinHandle<()>>
    where
        C: Components + 'static,
        S: StatusSink + 'static,
    {
        if !self.begin(&sink) {
            return None;
        }

        let engine = Arc::clone(self);
        let spawned = thread::Builder::new()
            .name(INIT_THREAD_NAME.to_string())
            .spawn(move || engine.run(&components, &sink));

        match spawned {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::error!(error = %e, "could not spawn initialization thread");
                let reason = InitError::Thread(e).to_string();
                self.set_phase(Phase::Failed(reason));
                None
            }
        }
    }

    /// Runs initialization on the calling thread and returns the final state.
    ///
    /// Like [`start`](Self::start), this does nothing if initialization was
    /// already started; the current state is returned instead.
    pub fn initialize(
        &self,
        components: &dyn Components,
        sink: &dyn StatusSink,
    ) -> InitializationState {
        if self.begin(sink) {
            self.run(components, sink);
        }
        self.state()
    }

    /// Answers a question once the engine is ready.
    ///
    /// Empty or sentinel input is ignored in every state.
    ///
    /// # Errors
    ///
    /// `QueryError::NotReady` while loading, `QueryError::Unavailable` after
    /// a failed initialization, otherwise whatever the orchestrator reports.
    pub fn answer(&self, question: &str) -> Result<QueryOutcome, QueryError> {
        if is_ignored_input(question) {
            return Ok(QueryOutcome::Ignored);
        }

        // Clone the handle out so the lock is not held during generation.
        let orchestrator = match &*self.phase.read().unwrap_or_else(PoisonError::into_inner) {
            Phase::Ready(orchestrator) => Arc::clone(orchestrator),
            Phase::Failed(reason) => return Err(QueryError::Unavailable(reason.clone())),
            Phase::NotStarted | Phase::Loading => return Err(QueryError::NotReady),
        };

        orchestrator.answer(question)
    }

    /// Moves `NotStarted` to `Loading`. Returns false if already started.
    fn begin(&self, sink: &dyn StatusSink) -> bool {
        {
            let mut phase = self.phase.write().unwrap_or_else(PoisonError::into_inner);
            if !matches!(*phase, Phase::NotStarted) {
                tracing::debug!("initialization already started; ignoring");
                return false;
            }
            *phase = Phase::Loading;
        }
        sink.publish(EngineEvent::State(InitializationState::Loading));
        true
    }

    fn run(&self, components: &dyn Components, sink: &dyn StatusSink) {
        // A panicking collaborator must still settle the engine as Failed.
        let built = panic::catch_unwind(AssertUnwindSafe(|| {
            build_orchestrator(components, sink)
        }))
        .unwrap_or_else(|payload| Err(InitError::Panicked(panic_message(payload.as_ref()))));

        match built {
            Ok(orchestrator) => {
                self.set_phase(Phase::Ready(Arc::new(orchestrator)));
                tracing::info!("query engine ready");
                sink.publish(EngineEvent::Status(READY_STATUS.to_string()));
                sink.publish(EngineEvent::State(InitializationState::Ready));
            }
            Err(e) => {
                let reason = e.to_string();
                tracing::error!(error = %reason, "initialization failed");
                self.set_phase(Phase::Failed(reason.clone()));
                sink.publish(EngineEvent::Status(format!("Initialization failed: {reason}")));
                sink.publish(EngineEvent::State(InitializationState::Failed(reason)));
            }
        }
    }

    fn set_phase(&self, next: Phase) {
        *self.phase.write().unwrap_or_else(PoisonError::into_inner) = next;
    }
}

/// Extracts the message from a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

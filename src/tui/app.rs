use crate::answerer::{QueryError, QueryOutcome, is_ignored_input};
use crate::engine::{EngineEvent, InitializationState};
use crate::render::{RenderOptions, render_error, render_response};

/// Application state for the TUI.
///
/// Holds the transcript (status lines and answers), the question being typed
/// and the last known engine state.
#[derive(Debug, Clone)]
pub struct App {
    /// Rendered blocks, oldest first
    transcript: Vec<String>,
    /// Question input buffer
    input: String,
    /// Last engine state reported by the initializer
    engine_state: InitializationState,
    /// Question currently being answered, if any
    pending: Option<String>,
    /// Lines scrolled back from the bottom of the transcript
    scroll_back: u16,
    render_options: RenderOptions,
}

impl App {
    /// Creates a new App with an empty transcript.
    ///
    /// # Examples
    ///
    /// ```
    /// use askdocs::engine::InitializationState;
    /// use askdocs::render::RenderOptions;
    /// use askdocs::tui::App;
    ///
    /// let app = App::new(RenderOptions::default());
    /// assert!(app.transcript().is_empty());
    /// assert_eq!(app.engine_state(), &InitializationState::NotStarted);
    /// ```
    pub fn new(render_options: RenderOptions) -> Self {
        Self {
            transcript: Vec::new(),
            input: String::new(),
            engine_state: InitializationState::NotStarted,
            pending: None,
            scroll_back: 0,
            render_options,
        }
    }

    pub fn transcript(&self) -> &[String] {
        &self.transcript
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn engine_state(&self) -> &InitializationState {
        &self.engine_state
    }

    pub fn pending(&self) -> Option<&str> {
        self.pending.as_deref()
    }

    pub fn scroll_back(&self) -> u16 {
        self.scroll_back
    }

    /// Applies an event from the initialization pipeline.
    ///
    /// Status lines go into the transcript verbatim. State changes never
    /// move backwards: once settled, later `Loading` events are ignored.
    pub fn apply_engine_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::Status(line) => self.push_block(line),
            EngineEvent::State(state) => {
                if !self.engine_state.is_settled() {
                    self.engine_state = state;
                }
            }
        }
    }

    /// Returns true if a submission would be forwarded to the engine.
    pub fn accepts_questions(&self) -> bool {
        !matches!(self.engine_state, InitializationState::Failed(_)) && self.pending.is_none()
    }

    pub fn push_input_char(&mut self, c: char) {
        self.input.push(c);
    }

    pub fn pop_input_char(&mut self) {
        self.input.pop();
    }

    /// Takes the typed question for submission.
    ///
    /// Returns `None` and leaves the input untouched for empty or `exit`
    /// input. After a failed initialization nothing is forwarded and the
    /// input is kept so the user can copy it.
    pub fn take_submission(&mut self) -> Option<String> {
        if is_ignored_input(&self.input) || !self.accepts_questions() {
            return None;
        }

        let question = std::mem::take(&mut self.input);
        self.pending = Some(question.clone());
        self.scroll_back = 0;
        Some(question)
    }

    /// Records the result of answering `question`.
    pub fn record_outcome(&mut self, question: &str, outcome: Result<QueryOutcome, QueryError>) {
        self.pending = None;
        match outcome {
            Ok(QueryOutcome::Answered(response)) => {
                self.push_block(render_response(&response, self.render_options));
            }
            Ok(QueryOutcome::Ignored) => {}
            Err(e) => {
                tracing::warn!(error = %e, "query failed");
                self.push_block(render_error(question, &e));
            }
        }
    }

    pub fn scroll_up(&mut self, amount: u16) {
        self.scroll_back = self.scroll_back.saturating_add(amount);
    }

    pub fn scroll_down(&mut self, amount: u16) {
        self.scroll_back = self.scroll_back.saturating_sub(amount);
    }

    fn push_block(&mut self, block: String) {
        self.transcript.push(block);
        self.scroll_back = 0;
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new(RenderOptions::default())
    }
}

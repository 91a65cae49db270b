//! Terminal User Interface module for askdocs.
//!
//! Shows initialization progress and a scrolling transcript of questions,
//! answers and sources, using ratatui for rendering and crossterm for
//! terminal management. Initialization runs on a background thread; answers
//! are computed on this thread, one at a time.

use std::io;
use std::panic;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver};
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::{
    event::{self as crossterm_event, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};

use crate::engine::{
    Components, EngineEvent, INIT_THREAD_NAME, InitializationState, QueryEngine,
};
use crate::render::RenderOptions;

mod app;
pub mod event;
mod ui;

pub use app::App;

/// Initializes the terminal for TUI rendering.
///
/// # Errors
///
/// Returns an error if terminal initialization fails.
fn init_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend).context("failed to create terminal")?;
    Ok(terminal)
}

/// Restores the terminal to its original state.
///
/// This should always be called before exiting the TUI,
/// even in error cases, to prevent terminal corruption.
///
/// # Errors
///
/// Returns an error if terminal restoration fails.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor().context("failed to show cursor")?;
    Ok(())
}

/// Minimal terminal restoration for the panic hook.
fn restore_terminal_panic() {
    let _ = disable_raw_mode();
    let _ = execute!(io::stdout(), LeaveAlternateScreen);
}

/// Installs a panic hook that restores the terminal before panicking.
///
/// Panics on the initialization thread are contained by the engine, so the
/// terminal is left alone for those.
fn init_panic_hook() {
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        if std::thread::current().name() != Some(INIT_THREAD_NAME) {
            restore_terminal_panic();
        }
        original_hook(panic_info);
    }));
}

/// Moves every queued engine event into the app.
fn drain_engine_events(app: &mut App, events: &Receiver<EngineEvent>) {
    for event in events.try_iter() {
        app.apply_engine_event(event);
    }
}

/// Runs the main event loop for the TUI.
///
/// # Errors
///
/// Returns an error if event polling, rendering, or terminal operations fail.
/// Terminal state is always restored, even on error.
pub fn run_event_loop(
    app: &mut App,
    engine: &QueryEngine,
    events: &Receiver<EngineEvent>,
) -> Result<()> {
    let mut terminal = init_terminal()?;

    let result = run_event_loop_internal(app, engine, events, &mut terminal);

    if let Err(e) = restore_terminal(&mut terminal) {
        eprintln!("Error restoring terminal: {e}");
    }

    result
}

fn run_event_loop_internal(
    app: &mut App,
    engine: &QueryEngine,
    events: &Receiver<EngineEvent>,
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
) -> Result<()> {
    loop {
        drain_engine_events(app, events);

        terminal.draw(|frame| {
            ui::draw(frame, app);
        })?;

        if crossterm_event::poll(Duration::from_millis(100))?
            && let Event::Key(key) = crossterm_event::read()?
            && key.kind == KeyEventKind::Press
        {
            match event::handle_key_event(app, key) {
                event::Action::Quit => break,
                event::Action::Submit(question) => {
                    // Show the pending question before blocking on the answer.
                    terminal.draw(|frame| {
                        ui::draw(frame, app);
                    })?;
                    let outcome = engine.answer(&question);
                    app.record_outcome(&question, outcome);
                }
                event::Action::None => {}
            }
        }
    }

    Ok(())
}

/// Entry point for the TUI application.
///
/// Starts initialization in the background and runs the event loop until
/// the user quits.
///
/// # Errors
///
/// Returns an error if the terminal cannot be initialized or the event loop
/// fails.
pub fn run<C>(components: C, render_options: RenderOptions) -> Result<()>
where
    C: Components + 'static,
{
    init_panic_hook();

    let engine = Arc::new(QueryEngine::new());
    let (tx, rx) = mpsc::channel();
    let mut app = App::new(render_options);

    // Detached: the thread ends on its own once the pipeline settles.
    if engine.start(components, tx).is_none() {
        let state = engine.state();
        if let InitializationState::Failed(reason) = &state {
            app.apply_engine_event(EngineEvent::Status(format!(
                "Initialization failed: {reason}"
            )));
        }
        app.apply_engine_event(EngineEvent::State(state));
    }

    run_event_loop(&mut app, &engine, &rx).context("TUI event loop failed")?;

    Ok(())
}

//! Keyboard event handling for the TUI.
//!
//! Maps crossterm keyboard events to application state changes and to the
//! actions the event loop has to carry out.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use super::app::App;

/// What the event loop should do after a key press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    None,
    Quit,
    /// Answer this question.
    Submit(String),
}

/// Handles a keyboard event and updates the app state accordingly.
///
/// # Event Handling
///
/// - `Esc` / `Ctrl+C`: quit
/// - `Enter`: submit the typed question
/// - `Backspace`: delete the last character
/// - `Up` / `Down`, `PageUp` / `PageDown`: scroll the transcript
/// - any other character: append to the question
///
/// # Examples
///
/// ```
/// use askdocs::tui::{App, event::{Action, handle_key_event}};
/// use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
///
/// let mut app = App::default();
/// let key = KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE);
/// assert_eq!(handle_key_event(&mut app, key), Action::Quit);
/// ```
pub fn handle_key_event(app: &mut App, key: KeyEvent) -> Action {
    if key.code == KeyCode::Esc
        || (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL))
    {
        return Action::Quit;
    }

    match key.code {
        KeyCode::Enter => {
            return app.take_submission().map_or(Action::None, Action::Submit);
        }
        KeyCode::Char(c) if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT => {
            app.push_input_char(c);
        }
        KeyCode::Backspace => app.pop_input_char(),
        KeyCode::Up => app.scroll_up(1),
        KeyCode::Down => app.scroll_down(1),
        KeyCode::PageUp => app.scroll_up(10),
        KeyCode::PageDown => app.scroll_down(10),
        _ => {
            // Ignore other keys
        }
    }

    Action::None
}

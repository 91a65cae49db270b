//! UI rendering functions for the TUI.
//!
//! Lays out the transcript, the question input and a one-line status bar
//! using ratatui widgets.

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};

use super::app::App;
use crate::engine::InitializationState;

/// Main rendering function for the TUI.
///
/// # Arguments
///
/// * `frame` - The ratatui Frame to render into
/// * `app` - The application state containing transcript, input and engine state
pub fn draw(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),    // Transcript
            Constraint::Length(3), // Question input
            Constraint::Length(1), // Status bar
        ])
        .split(frame.area());

    render_transcript(frame, app, chunks[0]);
    render_input(frame, app, chunks[1]);
    render_status_bar(frame, app, chunks[2]);
}

/// Renders the transcript, pinned to the bottom unless scrolled back.
fn render_transcript(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title("askdocs");

    let mut text = app.transcript().join("\n\n");
    if let Some(question) = app.pending() {
        if !text.is_empty() {
            text.push_str("\n\n");
        }
        text.push_str(&format!("> Question:\n{question}\n> Thinking ..."));
    }

    let inner_width = area.width.saturating_sub(2);
    let inner_height = area.height.saturating_sub(2);
    let total = wrapped_line_count(&text, inner_width);
    let bottom = total.saturating_sub(inner_height);
    let offset = bottom.saturating_sub(app.scroll_back());

    let paragraph = Paragraph::new(text)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((offset, 0));

    frame.render_widget(paragraph, area);
}

/// Renders the question input with a cursor indicator.
fn render_input(frame: &mut Frame, app: &App, area: Rect) {
    let enabled = app.accepts_questions();
    let border_style = if enabled {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .title("Question")
        .border_style(border_style);

    let mut content = app.input().to_string();
    if enabled {
        content.push('█');
    }

    frame.render_widget(Paragraph::new(content).block(block), area);
}

/// Renders the engine state and key hints.
fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let key_style = Style::default().fg(Color::Cyan);
    let sep_style = Style::default().fg(Color::DarkGray);

    let (label, color) = match app.engine_state() {
        InitializationState::NotStarted | InitializationState::Loading => {
            ("loading".to_string(), Color::Yellow)
        }
        InitializationState::Ready if app.pending().is_some() => {
            ("answering".to_string(), Color::Yellow)
        }
        InitializationState::Ready => ("ready".to_string(), Color::Green),
        InitializationState::Failed(_) => ("unavailable".to_string(), Color::Red),
    };

    let line = Line::from(vec![
        Span::styled(label, Style::default().fg(color).add_modifier(Modifier::BOLD)),
        Span::styled(" | ", sep_style),
        Span::styled("Enter", key_style),
        Span::raw(": ask"),
        Span::styled(" | ", sep_style),
        Span::styled("↑/↓", key_style),
        Span::raw(": scroll"),
        Span::styled(" | ", sep_style),
        Span::styled("Esc", key_style),
        Span::raw(": quit"),
    ]);

    frame.render_widget(Paragraph::new(line), area);
}

/// Estimates how many rows `text` occupies when wrapped at `width` columns.
fn wrapped_line_count(text: &str, width: u16) -> u16 {
    if width == 0 {
        return 0;
    }
    let width = usize::from(width);
    let rows: usize = text
        .split('\n')
        .map(|line| line.chars().count().div_ceil(width).max(1))
        .sum();
    u16::try_from(rows).unwrap_or(u16::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineEvent;
    use ratatui::{Terminal, backend::TestBackend};

    fn render_to_string(app: &App, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).expect("test terminal");
        terminal.draw(|frame| draw(frame, app)).expect("draw should succeed");
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn wrapped_line_count_accounts_for_long_lines() {
        assert_eq!(wrapped_line_count("", 10), 1);
        assert_eq!(wrapped_line_count("short\nlines", 10), 2);
        assert_eq!(wrapped_line_count("abcdefghijklmnopqrstu", 10), 3);
        assert_eq!(wrapped_line_count("anything", 0), 0);
    }

    #[test]
    fn status_lines_and_loading_state_are_drawn() {
        let mut app = App::default();
        app.apply_engine_event(EngineEvent::State(InitializationState::Loading));
        app.apply_engine_event(EngineEvent::Status(
            "Loading Language Model - please wait ...".to_string(),
        ));

        let screen = render_to_string(&app, 80, 12);

        assert!(screen.contains("Loading Language Model - please wait ..."));
        assert!(screen.contains("loading"));
    }

    #[test]
    fn failed_state_is_shown_as_unavailable() {
        let mut app = App::default();
        app.apply_engine_event(EngineEvent::State(InitializationState::Failed(
            "no index".to_string(),
        )));

        let screen = render_to_string(&app, 80, 12);
        assert!(screen.contains("unavailable"));
    }

    #[test]
    fn pending_question_is_shown_while_answering() {
        let mut app = App::default();
        app.apply_engine_event(EngineEvent::State(InitializationState::Ready));
        for c in "refunds?".chars() {
            app.push_input_char(c);
        }
        app.take_submission().expect("should submit");

        let screen = render_to_string(&app, 80, 12);
        assert!(screen.contains("Thinking ..."));
        assert!(screen.contains("answering"));
    }

    #[test]
    fn transcript_follows_the_tail() {
        let mut app = App::default();
        for i in 0..30 {
            app.apply_engine_event(EngineEvent::Status(format!("line {i}")));
        }

        let screen = render_to_string(&app, 40, 12);
        assert!(screen.contains("line 29"));
        assert!(!screen.contains("line 0 "));
    }
}

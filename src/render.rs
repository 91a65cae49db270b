//! Text rendering of answers for the terminal front-ends.

use crate::answerer::{QueryError, QueryResponse};

/// Rendering switches shared by the TUI and the one-shot CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderOptions {
    /// Omit the source blocks after the answer.
    pub hide_sources: bool,
}

/// Renders one answered question.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use askdocs::answerer::QueryResponse;
/// use askdocs::render::{RenderOptions, render_response};
/// use askdocs::retrieval::DocumentChunk;
///
/// let response = QueryResponse::new(
///     "What is the refund policy?".to_string(),
///     "Within 30 days.".to_string(),
///     vec![DocumentChunk::new("Refunds within 30 days.", "policy.txt")],
///     Duration::from_millis(1234),
/// );
///
/// let text = render_response(&response, RenderOptions::default());
/// assert!(text.contains("> Answer (took 1.23 s.):"));
/// assert!(text.ends_with("> policy.txt:\nRefunds within 30 days."));
/// ```
pub fn render_response(response: &QueryResponse, options: RenderOptions) -> String {
    let mut out = format!(
        "> Question:\n{}\n> Answer (took {:.2} s.):\n{}",
        response.question(),
        response.elapsed_seconds(),
        response.answer()
    );

    if !options.hide_sources {
        for chunk in response.sources() {
            out.push_str(&format!("\n> {}:\n{}", chunk.source, chunk.content));
        }
    }

    out
}

/// Renders a failed query so it can be shown in place of an answer.
pub fn render_error(question: &str, error: &QueryError) -> String {
    format!("> Question:\n{}\n> Error: {}", question, error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::DocumentChunk;
    use std::time::Duration;

    fn response() -> QueryResponse {
        QueryResponse::new(
            "What is the refund policy?".to_string(),
            "Refunds are accepted within 30 days.".to_string(),
            vec![
                DocumentChunk::new("Refunds within 30 days.", "docs/policy.txt"),
                DocumentChunk::new("Contact support for refunds.", "docs/faq.txt"),
            ],
            Duration::from_secs_f64(2.346),
        )
    }

    #[test]
    fn renders_question_answer_and_sources_in_order() {
        let text = render_response(&response(), RenderOptions::default());

        assert_eq!(
            text,
            "> Question:\nWhat is the refund policy?\n\
             > Answer (took 2.35 s.):\nRefunds are accepted within 30 days.\n\
             > docs/policy.txt:\nRefunds within 30 days.\n\
             > docs/faq.txt:\nContact support for refunds."
        );
    }

    #[test]
    fn hide_sources_omits_source_blocks() {
        let text = render_response(&response(), RenderOptions { hide_sources: true });

        assert!(text.ends_with("Refunds are accepted within 30 days."));
        assert!(!text.contains("docs/policy.txt"));
    }

    #[test]
    fn elapsed_time_is_rounded_to_two_decimals() {
        let response = QueryResponse::new(
            "q".to_string(),
            "a".to_string(),
            Vec::new(),
            Duration::from_millis(50),
        );

        assert!(render_response(&response, RenderOptions::default()).contains("(took 0.05 s.)"));
    }

    #[test]
    fn render_error_names_the_question() {
        let text = render_error("refunds?", &QueryError::NotReady);

        assert!(text.starts_with("> Question:\nrefunds?"));
        assert!(text.contains("still loading"));
    }
}

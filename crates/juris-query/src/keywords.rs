//! Keyword expression extraction for ranked retrieval.

/// Maximum number of terms carried into an expression.
const MAX_TERMS: usize = 10;

/// Terms at or below this many characters are dropped as noise.
const MIN_TERM_CHARS: usize = 3;

/// Build an FTS match expression from a free-form question.
///
/// Whitespace-separated tokens longer than three characters are kept,
/// capped at ten, quoted, and joined with OR. Returns `None` when the
/// question yields no usable terms.
pub fn keyword_expression(question: &str) -> Option<String> {
    let terms: Vec<String> = question
        .split_whitespace()
        .filter(|term| term.chars().count() > MIN_TERM_CHARS)
        .take(MAX_TERMS)
        .map(quote_term)
        .collect();

    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" OR "))
    }
}

/// Quote a term for FTS so punctuation inside it cannot be parsed
/// as query syntax.
fn quote_term(term: &str) -> String {
    format!("\"{}\"", term.replace('"', "\"\""))
}

//! Story text normalization
//!
//! Shared by inference and training. The vectorizer vocabulary is built from
//! normalized text, so the transformation steps and their order must not
//! change without retraining.

use regex::Regex;
use std::sync::OnceLock;

static NON_LETTER: OnceLock<Regex> = OnceLock::new();
static WHITESPACE_RUN: OnceLock<Regex> = OnceLock::new();

fn non_letter() -> &'static Regex {
    NON_LETTER.get_or_init(|| Regex::new(r"[^a-z\s]").unwrap())
}

fn whitespace_run() -> &'static Regex {
    WHITESPACE_RUN.get_or_init(|| Regex::new(r"\s+").unwrap())
}

/// Normalize a raw story for vectorization.
///
/// 1. Lowercase
/// 2. Drop everything that is not `a-z` or whitespace (digits, punctuation)
/// 3. Collapse whitespace runs to one space and trim
pub fn normalize(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let lowered = text.to_lowercase();
    let letters_only = non_letter().replace_all(&lowered, "");
    whitespace_run()
        .replace_all(&letters_only, " ")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_digits_and_punctuation() {
        assert_eq!(normalize("As a User, I want... 123!"), "as a user i want");
    }

    #[test]
    fn test_empty_and_blank_input() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   \t\n "), "");
        assert_eq!(normalize("42 !!"), "");
    }

    #[test]
    fn test_collapses_mixed_whitespace() {
        assert_eq!(
            normalize("  reset\tmy\n\npassword   via  email "),
            "reset my password via email"
        );
    }

    #[test]
    fn test_removal_happens_before_collapse() {
        // "log - in" loses the dash first, leaving two spaces to collapse
        assert_eq!(normalize("log - in"), "log in");
        assert_eq!(normalize("e-mail"), "email");
    }

    #[test]
    fn test_non_ascii_letters_are_dropped() {
        assert_eq!(normalize("Café menu"), "caf menu");
    }

    #[test]
    fn test_idempotent() {
        let once = normalize("As an Admin, I want a PDF report (monthly)!");
        assert_eq!(normalize(&once), once);
    }
}

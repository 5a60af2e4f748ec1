//! Fuzzy token matching against a vocabulary.
//!
//! Site authors misspell, inflect and suffix the words we look for
//! ("факультета", "бакалавриата", "Копия"), so exact comparison is useless.
//! A token matches a vocabulary when its best normalized similarity against any
//! entry falls inside an inclusive confidence range.

use serde::{Deserialize, Serialize};

/// Inclusive similarity range a token must fall in to count as a match.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceRange {
    pub min: f64,
    pub max: f64,
}

impl Default for ConfidenceRange {
    fn default() -> Self {
        Self { min: 0.8, max: 1.0 }
    }
}

impl ConfidenceRange {
    pub fn contains(&self, ratio: f64) -> bool {
        ratio >= self.min && ratio <= self.max
    }
}

/// Similarity of two strings in `[0, 1]`, compared case-insensitively.
pub fn ratio(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(&a.to_lowercase(), &b.to_lowercase())
}

/// Best similarity of `token` against any vocabulary entry.
pub fn best_ratio<S: AsRef<str>>(token: &str, vocabulary: &[S]) -> f64 {
    vocabulary
        .iter()
        .map(|entry| ratio(token, entry.as_ref()))
        .fold(0.0, f64::max)
}

/// Whether `token` matches `vocabulary` within `range`.
///
/// Empty tokens never match, even against an empty vocabulary entry.
pub fn matches<S: AsRef<str>>(token: &str, vocabulary: &[S], range: ConfidenceRange) -> bool {
    !token.trim().is_empty() && range.contains(best_ratio(token, vocabulary))
}

/// Tokens from `tokens` that match `vocabulary`, in input order.
pub fn matching_tokens<'a, S: AsRef<str>>(
    tokens: &'a [String],
    vocabulary: &[S],
    range: ConfidenceRange,
) -> Vec<&'a str> {
    tokens
        .iter()
        .filter(|token| matches(token, vocabulary, range))
        .map(|token| token.as_str())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match() {
        assert_eq!(ratio("копия", "копия"), 1.0);
        assert!(matches("копия", &["копия"], ConfidenceRange::default()));
    }

    #[test]
    fn test_case_insensitive() {
        assert!(matches("Копия", &["копия"], ConfidenceRange::default()));
    }

    #[test]
    fn test_inflected_word_matches() {
        // one trailing letter on a ten letter word
        assert!(matches(
            "факультета",
            &["факультет"],
            ConfidenceRange::default()
        ));
        assert!(matches(
            "бакалавриата",
            &["бакалавриат", "магистратура"],
            ConfidenceRange::default()
        ));
    }

    #[test]
    fn test_unrelated_word_rejected() {
        assert!(!matches("группа", &["факультет"], ConfidenceRange::default()));
        assert!(!matches("", &["факультет"], ConfidenceRange::default()));
        assert!(!matches("  ", &[""], ConfidenceRange::default()));
    }

    #[test]
    fn test_range_upper_bound_is_inclusive() {
        let range = ConfidenceRange { min: 0.5, max: 1.0 };
        assert!(range.contains(1.0));
        assert!(range.contains(0.5));
        assert!(!range.contains(0.49));
    }

    #[test]
    fn test_matching_tokens_preserves_order() {
        let tokens: Vec<String> = ["Расписание", "копия", "курс", "Автосохраненный"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let found = matching_tokens(
            &tokens,
            &["автосохраненный", "копия"],
            ConfidenceRange::default(),
        );
        assert_eq!(found, vec!["копия", "Автосохраненный"]);
    }
}

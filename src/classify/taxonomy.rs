//! Taxonomy resolution and canonical path synthesis.

use super::naming::Tokenizer;
use super::similarity::{matches, ConfidenceRange};

/// Count sub-tokens of `segment` that fuzzy-match `vocabulary`.
pub fn score_segment<S: AsRef<str>>(
    segment: &str,
    tokenizer: &Tokenizer,
    vocabulary: &[S],
    range: ConfidenceRange,
) -> usize {
    tokenizer
        .split(&segment.to_lowercase())
        .iter()
        .filter(|token| matches(token, vocabulary, range))
        .count()
}

/// Pick the path segment that best describes a category.
///
/// The segment with the strictly highest positive score wins; an equal score
/// later in the path never replaces an earlier winner. Returns `None` when no
/// segment scores above zero.
pub fn resolve_category<S: AsRef<str>>(
    site_path: &str,
    tokenizer: &Tokenizer,
    vocabulary: &[S],
    range: ConfidenceRange,
) -> Option<String> {
    let mut best: Option<&str> = None;
    let mut best_score = 0;

    for segment in site_path.split('/') {
        let score = score_segment(segment, tokenizer, vocabulary, range);
        if score > best_score {
            best = Some(segment);
            best_score = score;
        }
    }

    best.map(|segment| segment.trim().to_string())
        .filter(|segment| !segment.is_empty())
}

/// Abbreviate one taxonomy element.
///
/// Words longer than two characters contribute their upper-cased initial;
/// course labels (`Курс 1-3`) keep their number as `К1-3`.
pub fn abbreviate(element: &str) -> String {
    if element.starts_with("Курс") {
        let suffix = element.split_whitespace().last().unwrap_or_default();
        return format!("К{}", suffix);
    }

    element
        .split_whitespace()
        .filter(|word| word.chars().count() > 2)
        .filter_map(|word| word.chars().next())
        .flat_map(char::to_uppercase)
        .collect()
}

/// Join abbreviated elements into a canonical path, skipping empty ones.
pub fn canonical_path<S: AsRef<str>>(elements: &[S]) -> String {
    elements
        .iter()
        .map(|element| abbreviate(element.as_ref().trim()))
        .filter(|abbr| !abbr.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEGREES: &[&str] = &["бакалавриат", "специалитет", "магистратура", "аспирантура", "степень"];

    fn tokenizer() -> Tokenizer {
        Tokenizer::new(&["_", " ", "(", ")", ",", ".", "\""])
    }

    #[test]
    fn test_resolve_category_picks_best_segment() {
        let path = "Расписания/Расписание занятий/Бакалавриат, специалитет/ФАСТИВ/1 курс.xlsx";
        let degree = resolve_category(path, &tokenizer(), DEGREES, ConfidenceRange::default());
        assert_eq!(degree.as_deref(), Some("Бакалавриат, специалитет"));
    }

    #[test]
    fn test_resolve_category_first_wins_on_tie() {
        let path = "Магистратура/Аспирантура/file.xlsx";
        let degree = resolve_category(path, &tokenizer(), DEGREES, ConfidenceRange::default());
        assert_eq!(degree.as_deref(), Some("Магистратура"));
    }

    #[test]
    fn test_resolve_category_unresolved() {
        let path = "Расписания/Прочее/file.xlsx";
        let degree = resolve_category(path, &tokenizer(), DEGREES, ConfidenceRange::default());
        assert_eq!(degree, None);
    }

    #[test]
    fn test_abbreviate() {
        assert_eq!(abbreviate("Расписание занятий"), "РЗ");
        assert_eq!(
            abbreviate("Факультет автоматизированных систем, транспорта и вооружений"),
            "ФАСТВ"
        );
        assert_eq!(abbreviate("Курс 1-3"), "К1-3");
        assert_eq!(abbreviate("Курс 2"), "К2");
        assert_eq!(abbreviate("и в"), "");
    }

    #[test]
    fn test_canonical_path_skips_empty() {
        let path = canonical_path(&["Расписание занятий", "", "Очная форма", "Курс 2"]);
        assert_eq!(path, "РЗ/ОФ/К2");
    }
}

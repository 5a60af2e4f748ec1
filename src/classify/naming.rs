//! Display and storage names derived from site paths and URLs.

use std::sync::LazyLock;

use regex::Regex;

use super::similarity::{matching_tokens, ConfidenceRange};

/// Trailing extension made of letters only (".xlsx", ".pdf", ".хлс").
static EXTENSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.[А-ЯЁA-Zа-яёa-z]*$").unwrap());
static TRAILING_HYPHEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-\s*$").unwrap());
static EMPTY_PARENS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\(\s*\)").unwrap());
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Splits text on any of a fixed set of delimiter strings.
///
/// Consecutive delimiters produce empty tokens, which never match anything
/// downstream.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    pattern: Option<Regex>,
}

impl Tokenizer {
    pub fn new<S: AsRef<str>>(delimiters: &[S]) -> Self {
        let alternatives: Vec<String> = delimiters
            .iter()
            .map(|d| d.as_ref())
            .filter(|d| !d.is_empty())
            .map(regex::escape)
            .collect();
        let pattern = if alternatives.is_empty() {
            None
        } else {
            Regex::new(&alternatives.join("|")).ok()
        };
        Self { pattern }
    }

    pub fn split(&self, text: &str) -> Vec<String> {
        match &self.pattern {
            Some(re) => re.split(text).map(str::to_string).collect(),
            None => vec![text.to_string()],
        }
    }
}

/// Last `/`-separated segment of a path or URL, percent-decoded.
///
/// Query strings and fragments are dropped first so that
/// `.../file.xlsx?download=1` still yields `file.xlsx`.
pub fn final_segment(path: &str) -> String {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    let last = path.rsplit('/').next().unwrap_or(path);
    urlencoding::decode(last)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| last.to_string())
}

/// Remove a trailing alphabetic extension.
pub fn strip_extension(name: &str) -> String {
    EXTENSION.replace(name, "").into_owned()
}

/// Extension of a file name without the dot, if any.
pub fn extension_of(name: &str) -> Option<String> {
    std::path::Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .map(str::to_string)
}

/// Collapse runs of whitespace into one space and trim.
pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").trim().to_string()
}

/// Clean a raw file name into a display name.
///
/// Removes boilerplate tokens (auto-save and copy markers) and then strips
/// dangling punctuation left behind until nothing changes. A name that would
/// become empty keeps its whitespace-collapsed form.
pub fn clean_display_name<S: AsRef<str>>(
    raw: &str,
    tokenizer: &Tokenizer,
    boilerplate: &[S],
    range: ConfidenceRange,
) -> String {
    let collapsed = collapse_whitespace(raw);
    let tokens = tokenizer.split(&collapsed);

    let mut name = collapsed.clone();
    for word in matching_tokens(&tokens, boilerplate, range) {
        name = name.replace(word, "");
    }

    loop {
        let before = name.clone();
        name = TRAILING_HYPHEN.replace(&name, "").into_owned();
        name = EMPTY_PARENS.replace_all(&name, "").into_owned();
        name = collapse_whitespace(&name);
        if name == before {
            break;
        }
    }

    if name.is_empty() {
        collapsed
    } else {
        name
    }
}

/// Short storage-safe file name: initials of the URL file name plus extension.
///
/// `Расписание 1 курс ФАСТИВ.xlsx` becomes `Р1КФ.xlsx`.
pub fn short_file_name(url: &str) -> String {
    let name = final_segment(url);
    let extension = extension_of(&name);
    let stem = match &extension {
        Some(ext) => name[..name.len() - ext.len() - 1].to_string(),
        None => name.clone(),
    };

    let initials: String = stem
        .split_whitespace()
        .filter_map(|word| word.chars().next())
        .flat_map(char::to_uppercase)
        .filter(|c| c.is_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    let initials = if initials.is_empty() {
        "file".to_string()
    } else {
        initials
    };

    match extension {
        Some(ext) => format!("{}.{}", initials, ext),
        None => initials,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenizer() -> Tokenizer {
        Tokenizer::new(&["_", " ", "(", ")", ",", ".", "\""])
    }

    #[test]
    fn test_final_segment_decodes() {
        assert_eq!(
            final_segment("https://example.org/files/%D0%9A%D1%83%D1%80%D1%81.xlsx"),
            "Курс.xlsx"
        );
        assert_eq!(final_segment("a/b/c.pdf?x=1#top"), "c.pdf");
        assert_eq!(final_segment("plain"), "plain");
    }

    #[test]
    fn test_strip_extension() {
        assert_eq!(strip_extension("Расписание 1 курс.xlsx"), "Расписание 1 курс");
        assert_eq!(strip_extension("no extension"), "no extension");
        // only the last extension goes
        assert_eq!(strip_extension("archive.tar.gz"), "archive.tar");
    }

    #[test]
    fn test_tokenizer_keeps_empty_tokens() {
        let tokens = tokenizer().split("a (b)");
        assert_eq!(tokens, vec!["a", "", "b", ""]);
    }

    #[test]
    fn test_tokenizer_without_delimiters() {
        let empty: [&str; 0] = [];
        assert_eq!(Tokenizer::new(&empty).split("a b"), vec!["a b"]);
    }

    #[test]
    fn test_clean_display_name_removes_boilerplate() {
        let name = clean_display_name(
            "Расписание   1 курс (копия)",
            &tokenizer(),
            &["автосохраненный", "копия"],
            ConfidenceRange::default(),
        );
        assert_eq!(name, "Расписание 1 курс");
    }

    #[test]
    fn test_clean_display_name_strips_dangling_hyphen() {
        let name = clean_display_name(
            "Магистратура - Копия",
            &tokenizer(),
            &["копия"],
            ConfidenceRange::default(),
        );
        assert_eq!(name, "Магистратура");
    }

    #[test]
    fn test_clean_display_name_fixed_point() {
        // removing the token leaves an empty group and a trailing hyphen behind
        let name = clean_display_name(
            "Заочная ( автосохраненный ) -",
            &tokenizer(),
            &["автосохраненный"],
            ConfidenceRange::default(),
        );
        assert_eq!(name, "Заочная");
    }

    #[test]
    fn test_clean_display_name_never_empty() {
        let name = clean_display_name(
            "Копия",
            &tokenizer(),
            &["копия"],
            ConfidenceRange::default(),
        );
        assert_eq!(name, "Копия");
    }

    #[test]
    fn test_short_file_name() {
        assert_eq!(
            short_file_name("https://example.org/f/Расписание 1 курс ФАСТИВ.xlsx"),
            "Р1КФ.xlsx"
        );
        assert_eq!(
            short_file_name("https://example.org/f/%D0%9E%D1%87%D0%BD%D0%B0%D1%8F%20%D1%84%D0%BE%D1%80%D0%BC%D0%B0.xls"),
            "ОФ.xls"
        );
        assert_eq!(short_file_name("https://example.org/"), "file");
        assert_eq!(short_file_name("https://example.org/README"), "R");
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("a.xlsx"), Some("xlsx".to_string()));
        assert_eq!(extension_of("a"), None);
    }
}

//! Course-number extraction from display names.

use std::collections::BTreeSet;

use super::naming::Tokenizer;
use crate::models::UNDEFINED;

/// Widest hyphen range accepted; anything wider is treated as malformed.
const MAX_RANGE_SPAN: u32 = 16;

/// Extract the set of course numbers mentioned in a display name.
///
/// Every token containing a course marker ("курс", "год") is followed by a
/// course specification: a number, a comma-separated list, or an inclusive
/// range (`1,3,5-7`). Malformed parts are skipped.
pub fn extract_courses<S: AsRef<str>>(
    name: &str,
    tokenizer: &Tokenizer,
    markers: &[S],
) -> BTreeSet<u32> {
    let parts = tokenizer.split(&name.to_lowercase());
    let mut courses = BTreeSet::new();

    for (i, part) in parts.iter().enumerate() {
        let is_marker = markers
            .iter()
            .any(|marker| !marker.as_ref().is_empty() && part.contains(marker.as_ref()));
        if !is_marker {
            continue;
        }
        if let Some(next) = parts.get(i + 1) {
            courses.extend(parse_course_spec(next));
        }
    }

    courses
}

/// Parse `1`, `1,3` or `5-7` style course specifications.
pub fn parse_course_spec(spec: &str) -> Vec<u32> {
    let mut numbers = Vec::new();

    for part in spec.split(',').map(str::trim) {
        if part.contains('-') {
            let bounds: Vec<&str> = part.split('-').collect();
            let first = bounds.first().and_then(|b| b.trim().parse::<u32>().ok());
            let last = bounds.last().and_then(|b| b.trim().parse::<u32>().ok());
            match (first, last) {
                (Some(start), Some(end)) if start <= end && end - start <= MAX_RANGE_SPAN => {
                    numbers.extend(start..=end);
                }
                _ => {
                    tracing::debug!("Skipping malformed course range '{}'", part);
                }
            }
        } else if !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()) {
            if let Ok(n) = part.parse() {
                numbers.push(n);
            }
        }
    }

    numbers
}

/// Human-readable course element of the canonical path.
pub fn course_label(courses: &BTreeSet<u32>) -> String {
    match (courses.first(), courses.last()) {
        (Some(first), Some(last)) if first == last => format!("Курс {}", first),
        (Some(first), Some(last)) => format!("Курс {}-{}", first, last),
        _ => UNDEFINED.to_string(),
    }
}

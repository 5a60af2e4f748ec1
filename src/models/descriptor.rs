//! Crawler output: one discovered file on the schedule site.

use serde::{Deserialize, Serialize};

/// A file reference produced by a crawl source.
///
/// `source_path` is the human-readable location of the file on the site
/// (section headings joined with `/`, ending in the file name), while
/// `source_url` is where the bytes can be downloaded from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDescriptor {
    pub source_path: String,
    pub source_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_changed_hint: Option<String>,
}

impl FileDescriptor {
    pub fn new(source_path: impl Into<String>, source_url: impl Into<String>) -> Self {
        Self {
            source_path: source_path.into(),
            source_url: source_url.into(),
            last_changed_hint: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.last_changed_hint = Some(hint.into());
        self
    }
}

/// Which family of schedules a crawl root publishes.
///
/// Crawl roots are paired with kinds by position, so the first configured
/// root yields classes schedules and the second exam schedules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleKind {
    /// Tag name recorded under the schedule-kind category.
    pub label: String,
    /// First element of the canonical path.
    pub title: String,
    /// Site path prefix under which this root's files are listed.
    #[serde(default)]
    pub start_path: String,
}

impl ScheduleKind {
    pub fn new(label: &str, title: &str, start_path: &str) -> Self {
        Self {
            label: label.to_string(),
            title: title.to_string(),
            start_path: start_path.to_string(),
        }
    }

    /// Default kinds, in crawl-root order.
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::new(
                "Занятия",
                "Расписание занятий",
                "Расписания/Расписание занятий/",
            ),
            Self::new(
                "Экзамены",
                "Расписание экзаменов",
                "Расписания/Расписание экзаменов/",
            ),
        ]
    }
}

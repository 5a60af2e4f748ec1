//! Tags attached to catalog resources.

use serde::{Deserialize, Serialize};

/// Placeholder used whenever a taxonomy category cannot be resolved.
pub const UNDEFINED: &str = "Неопределено";

/// Tag categories emitted by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagCategory {
    ScheduleKind,
    Degree,
    EducationForm,
    Faculty,
    Course,
}

impl TagCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ScheduleKind => "type_timetable",
            Self::Degree => "degree",
            Self::EducationForm => "education_form",
            Self::Faculty => "faculty",
            Self::Course => "course",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "type_timetable" => Some(Self::ScheduleKind),
            "degree" => Some(Self::Degree),
            "education_form" => Some(Self::EducationForm),
            "faculty" => Some(Self::Faculty),
            "course" => Some(Self::Course),
            _ => None,
        }
    }
}

/// A (name, category) pair. Unique across the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub category: String,
}

impl Tag {
    pub fn new(name: impl Into<String>, category: TagCategory) -> Self {
        Self {
            name: name.into(),
            category: category.as_str().to_string(),
        }
    }

    /// Tag for a category value, falling back to the sentinel when unresolved.
    pub fn or_undefined(value: Option<&str>, category: TagCategory) -> Self {
        Self::new(value.unwrap_or(UNDEFINED), category)
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_roundtrip_names() {
        for category in [
            TagCategory::ScheduleKind,
            TagCategory::Degree,
            TagCategory::EducationForm,
            TagCategory::Faculty,
            TagCategory::Course,
        ] {
            assert_eq!(TagCategory::from_str(category.as_str()), Some(category));
        }
        assert_eq!(TagCategory::from_str("unknown"), None);
    }

    #[test]
    fn test_or_undefined() {
        let tag = Tag::or_undefined(None, TagCategory::Degree);
        assert_eq!(tag.name, UNDEFINED);
        assert_eq!(tag.category, "degree");

        let tag = Tag::or_undefined(Some("Бакалавриат"), TagCategory::Degree);
        assert_eq!(tag.name, "Бакалавриат");
    }
}

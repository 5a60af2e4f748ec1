//! Classification and naming of crawled schedule files.
//!
//! Turns a [`FileDescriptor`] into a canonical catalog identity, a cleaned
//! display name, a short storage file name and a tag set. Everything here is a
//! pure function of the descriptor and [`ClassifierConfig`]; nothing fails,
//! unresolved categories fall back to the [`UNDEFINED`] sentinel instead.

mod course;
mod naming;
mod similarity;
mod taxonomy;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::models::{
    FileDescriptor, ResourceIdentity, ResourcePlan, ScheduleKind, Tag, TagCategory, UNDEFINED,
};

pub use course::{course_label, extract_courses, parse_course_spec};
pub use naming::{
    clean_display_name, collapse_whitespace, extension_of, final_segment, short_file_name,
    strip_extension, Tokenizer,
};
pub use similarity::{best_ratio, matches, ratio, ConfidenceRange};
pub use taxonomy::{abbreviate, canonical_path, resolve_category, score_segment};

/// Vocabularies and thresholds driving the heuristics.
///
/// Defaults reproduce the naming conventions of the production site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub degree_words: Vec<String>,
    pub education_form_words: Vec<String>,
    pub faculty_words: Vec<String>,
    /// Tokens removed from display names (auto-save and copy markers).
    pub boilerplate_words: Vec<String>,
    pub course_markers: Vec<String>,
    /// Delimiters for name and path tokenization.
    pub delimiters: Vec<String>,
    /// Delimiters for course scanning; must not include `,` or `-`.
    pub course_delimiters: Vec<String>,
    pub confidence: ConfidenceRange,
    /// Extensions the crawler treats as schedule files.
    pub file_extensions: Vec<String>,
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            degree_words: words(&[
                "бакалавриат",
                "специалитет",
                "магистратура",
                "аспирантура",
                "степень",
            ]),
            education_form_words: words(&["форма", "очная", "очно-заочная", "заочная"]),
            faculty_words: words(&[
                "факультет",
                "автоматизированных",
                "систем",
                "транспорта",
                "вооружений",
                "автомобильного",
                "технологии",
                "конструкционных",
                "материалов",
                "пищевых",
                "производств",
                "экономика",
                "управление",
                "электроника",
                "вычислительная",
                "техника",
                "химико-технологический",
                "иностранный",
                "вечерний",
                "технологический",
                "инженерный",
                "кадры",
            ]),
            boilerplate_words: words(&["автосохраненный", "копия"]),
            course_markers: words(&["курс", "год"]),
            delimiters: words(&["_", " ", "(", ")", ",", ".", "\""]),
            course_delimiters: words(&["_", " ", "(", ")", ".", "\""]),
            confidence: ConfidenceRange::default(),
            file_extensions: words(&["xls", "xlsx", "xlsm", "pdf", "doc", "docx"]),
        }
    }
}

/// Result of classifying one file.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub kind: String,
    pub display_name: String,
    /// Storage-safe name derived from the URL, extension included.
    pub short_name: String,
    /// Extension reported by the URL, without the dot.
    pub extension: Option<String>,
    pub degree: Option<String>,
    pub education_form: Option<String>,
    pub faculty: Option<String>,
    pub courses: BTreeSet<u32>,
    pub canonical_path: String,
    pub tags: Vec<Tag>,
}

impl Classification {
    pub fn identity(&self) -> ResourceIdentity {
        ResourceIdentity::new(&self.canonical_path, &self.display_name)
    }

    /// Desired catalog state for the resource this file belongs to.
    pub fn plan(&self, source_path: &str) -> ResourcePlan {
        let metadata = serde_json::json!({
            "type_timetable": self.kind,
            "degree": self.degree,
            "education_form": self.education_form,
            "faculty": self.faculty,
            "course": self.courses,
            "source_path": source_path,
        });
        ResourcePlan::builder(self.identity())
            .metadata(metadata)
            .tags(self.tags.iter().cloned())
            .build()
    }
}

/// Heuristic classifier over a fixed configuration.
#[derive(Debug, Clone)]
pub struct Classifier {
    config: ClassifierConfig,
    tokenizer: Tokenizer,
    course_tokenizer: Tokenizer,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(ClassifierConfig::default())
    }
}

impl Classifier {
    pub fn new(config: ClassifierConfig) -> Self {
        let tokenizer = Tokenizer::new(&config.delimiters);
        let course_tokenizer = Tokenizer::new(&config.course_delimiters);
        Self {
            config,
            tokenizer,
            course_tokenizer,
        }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Derive the display name from the last segment of a site path.
    pub fn display_name(&self, source_path: &str) -> String {
        let raw = strip_extension(&final_segment(source_path));
        clean_display_name(
            &raw,
            &self.tokenizer,
            &self.config.boilerplate_words,
            self.config.confidence,
        )
    }

    pub fn courses(&self, display_name: &str) -> BTreeSet<u32> {
        extract_courses(
            display_name,
            &self.course_tokenizer,
            &self.config.course_markers,
        )
    }

    fn category(&self, source_path: &str, vocabulary: &[String]) -> Option<String> {
        resolve_category(
            source_path,
            &self.tokenizer,
            vocabulary,
            self.config.confidence,
        )
    }

    /// Classify a descriptor crawled under the given schedule kind.
    pub fn classify(&self, descriptor: &FileDescriptor, kind: &ScheduleKind) -> Classification {
        let source_path = descriptor.source_path.as_str();

        let display_name = self.display_name(source_path);
        let degree = self.category(source_path, &self.config.degree_words);
        let education_form = self.category(source_path, &self.config.education_form_words);
        let faculty = self.category(source_path, &self.config.faculty_words);
        let courses = self.courses(&display_name);

        let elements = [
            kind.title.clone(),
            degree.clone().unwrap_or_default(),
            faculty.clone().unwrap_or_default(),
            education_form.clone().unwrap_or_default(),
            course_label(&courses),
        ];
        let canonical_path = canonical_path(&elements);

        let mut tags = vec![
            Tag::new(&kind.label, TagCategory::ScheduleKind),
            Tag::or_undefined(degree.as_deref(), TagCategory::Degree),
            Tag::or_undefined(education_form.as_deref(), TagCategory::EducationForm),
            Tag::or_undefined(faculty.as_deref(), TagCategory::Faculty),
        ];
        if courses.is_empty() {
            tags.push(Tag::new(UNDEFINED, TagCategory::Course));
        } else {
            tags.extend(
                courses
                    .iter()
                    .map(|course| Tag::new(course.to_string(), TagCategory::Course)),
            );
        }

        Classification {
            kind: kind.label.clone(),
            display_name,
            short_name: short_file_name(&descriptor.source_url),
            extension: extension_of(&final_segment(&descriptor.source_url)),
            degree,
            education_form,
            faculty,
            courses,
            canonical_path,
            tags,
        }
    }
}

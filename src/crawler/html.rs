//! Schedule index page crawl source.
//!
//! The site lists schedule files under nested headings ("Бакалавриат" >
//! "Факультет ..." > "Очная форма обучения"). The heading hierarchy above a
//! link becomes the directory part of its site path.

use std::collections::HashSet;

use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::{CrawlError, FileSource};
use crate::classify::{collapse_whitespace, extension_of, final_segment};
use crate::models::{FileDescriptor, ScheduleKind};

/// Attribute some index pages use to publish a file's modification time.
const MODIFIED_ATTR: &str = "data-modified";

/// Fetches an index page and extracts links to schedule files.
#[derive(Debug, Clone)]
pub struct HtmlIndexSource {
    client: Client,
    extensions: Vec<String>,
}

impl HtmlIndexSource {
    pub fn new(client: Client, extensions: Vec<String>) -> Self {
        Self { client, extensions }
    }

    async fn fetch_page(&self, url: &Url) -> Result<String, CrawlError> {
        let response = self.client.get(url.as_str()).send().await?;
        if !response.status().is_success() {
            return Err(CrawlError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }
        Ok(response.text().await?)
    }
}

#[async_trait]
impl FileSource for HtmlIndexSource {
    async fn discover(
        &self,
        root: &str,
        kind: &ScheduleKind,
    ) -> Result<Vec<FileDescriptor>, CrawlError> {
        let base = Url::parse(root)?;
        let body = self.fetch_page(&base).await?;
        let descriptors = parse_index(&body, &base, kind, &self.extensions);

        tracing::info!(
            "Found {} files for '{}' at {}",
            descriptors.len(),
            kind.label,
            root
        );
        Ok(descriptors)
    }
}

fn heading_level(name: &str) -> Option<usize> {
    match name {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        "h5" => Some(5),
        "h6" => Some(6),
        _ => None,
    }
}

fn element_text(element: &ElementRef) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

/// Extract file descriptors from an index page, in document order.
///
/// Links are kept when the file name in their resolved URL carries one of
/// `extensions`. The link text names the file; when it is empty the URL file
/// name is used instead. Repeated URLs are reported once.
pub fn parse_index<S: AsRef<str>>(
    html: &str,
    base: &Url,
    kind: &ScheduleKind,
    extensions: &[S],
) -> Vec<FileDescriptor> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("h1, h2, h3, h4, h5, h6, a[href]") else {
        return Vec::new();
    };

    let mut headings: Vec<(usize, String)> = Vec::new();
    let mut seen = HashSet::new();
    let mut descriptors = Vec::new();

    for element in document.select(&selector) {
        let name = element.value().name();

        if let Some(level) = heading_level(name) {
            let text = element_text(&element);
            if text.is_empty() {
                continue;
            }
            while headings.last().is_some_and(|(l, _)| *l >= level) {
                headings.pop();
            }
            headings.push((level, text));
            continue;
        }

        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let Ok(url) = base.join(href) else {
            tracing::debug!("Skipping unresolvable link '{}'", href);
            continue;
        };
        let url_name = final_segment(url.path());
        let Some(extension) = extension_of(&url_name) else {
            continue;
        };
        if !extensions
            .iter()
            .any(|e| e.as_ref().eq_ignore_ascii_case(&extension))
        {
            continue;
        }
        if !seen.insert(url.to_string()) {
            continue;
        }

        let text = element_text(&element);
        let file_name = if text.is_empty() {
            url_name
        } else if extension_of(&text).is_some_and(|e| e.eq_ignore_ascii_case(&extension)) {
            text
        } else {
            format!("{}.{}", text, extension)
        };

        let mut source_path = kind.start_path.clone();
        for (_, heading) in &headings {
            source_path.push_str(&heading.replace('/', "-"));
            source_path.push('/');
        }
        source_path.push_str(&file_name.replace('/', "-"));

        let mut descriptor = FileDescriptor::new(source_path, url.to_string());
        if let Some(modified) = element.value().attr(MODIFIED_ATTR) {
            descriptor = descriptor.with_hint(modified);
        }
        descriptors.push(descriptor);
    }

    descriptors
}

#[cfg(test)]
mod tests {
    use super::*;

    const INDEX: &str = r#"
        <html><body>
          <h1>Расписание занятий</h1>
          <h2>Бакалавриат, специалитет</h2>
          <h3>Факультет автоматизированных систем, транспорта и вооружений</h3>
          <h4>Очная форма обучения</h4>
          <ul>
            <li><a href="/upload/fastiv_1.xlsx" data-modified="2024-09-01 10:00:00">ФАСТИВ 1 курс</a></li>
            <li><a href="/upload/fastiv_2.xls">ФАСТИВ 2 курс.xls</a></li>
            <li><a href="/upload/fastiv_1.xlsx">дубликат</a></li>
            <li><a href="/news/">Новости</a></li>
          </ul>
          <h2>Магистратура</h2>
          <a href="https://cdn.example.org/m/%D0%9C1.pdf"></a>
        </body></html>
    "#;

    fn extensions() -> Vec<&'static str> {
        vec!["xls", "xlsx", "pdf"]
    }

    #[test]
    fn test_parse_index_builds_site_paths() {
        let base = Url::parse("https://www.example.org/student/raspisaniya/").unwrap();
        let kind = ScheduleKind::defaults().remove(0);

        let files = parse_index(INDEX, &base, &kind, &extensions());
        assert_eq!(files.len(), 3);

        assert_eq!(
            files[0].source_path,
            "Расписания/Расписание занятий/Расписание занятий/Бакалавриат, специалитет/\
             Факультет автоматизированных систем, транспорта и вооружений/\
             Очная форма обучения/ФАСТИВ 1 курс.xlsx"
        );
        assert_eq!(
            files[0].source_url,
            "https://www.example.org/upload/fastiv_1.xlsx"
        );
        assert_eq!(
            files[0].last_changed_hint.as_deref(),
            Some("2024-09-01 10:00:00")
        );

        assert!(files[1].source_path.ends_with("/ФАСТИВ 2 курс.xls"));
        assert_eq!(files[1].last_changed_hint, None);
    }

    #[test]
    fn test_heading_stack_pops_to_level() {
        let base = Url::parse("https://www.example.org/").unwrap();
        let kind = ScheduleKind::defaults().remove(0);

        let files = parse_index(INDEX, &base, &kind, &extensions());
        assert_eq!(
            files[2].source_path,
            "Расписания/Расписание занятий/Расписание занятий/Магистратура/М1.pdf"
        );
    }

    #[test]
    fn test_parse_index_ignores_unlisted_extensions() {
        let base = Url::parse("https://www.example.org/").unwrap();
        let kind = ScheduleKind::defaults().remove(0);

        let files = parse_index(INDEX, &base, &kind, &["pdf"]);
        assert_eq!(files.len(), 1);
    }
}

//! Durable storage of accepted file versions.
//!
//! Every changed file is handed to each enabled [`StorageBackend`] once. A
//! version is only recorded in the catalog after all of them have confirmed.

mod fanout;
mod local;
mod remote;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{NewVersion, ResourceIdentity};

pub use fanout::StorageFanout;
pub use local::LocalDiskBackend;
pub use remote::RemoteDriveBackend;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("upload failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{url} rejected upload with status {status}")]
    Rejected { url: String, status: u16 },
    #[error("unknown storage backend '{0}'")]
    UnknownBackend(String),
}

/// A place that can durably keep the bytes of a file version.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Name recorded next to each locator in the catalog.
    fn name(&self) -> &str;

    /// Store `local` for the given resource and version, returning a locator.
    async fn persist(
        &self,
        local: &Path,
        resource: &ResourceIdentity,
        version: &NewVersion,
    ) -> Result<String, StorageError>;

    /// Local path of a stored copy, when this backend keeps one.
    fn retrievable_path(&self, _locator: &str) -> Option<PathBuf> {
        None
    }
}

/// Replace characters that are unsafe in file and URL path segments.
pub(crate) fn sanitize_component(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let trimmed = sanitized.trim().trim_matches('.');
    if trimmed.is_empty() {
        "_".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Relative storage path of a version: canonical path, display name, then a
/// timestamped file name.
pub(crate) fn version_relative_path(resource: &ResourceIdentity, version: &NewVersion) -> PathBuf {
    let mut path = PathBuf::new();
    for element in resource.path.split('/').filter(|e| !e.is_empty()) {
        path.push(sanitize_component(element));
    }
    path.push(sanitize_component(&resource.name));
    path.push(format!(
        "{}_{}",
        version.timestamp.format("%Y%m%dT%H%M%S%.6f"),
        sanitize_component(&version.short_name)
    ));
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_sanitize_component() {
        assert_eq!(sanitize_component("ФАСТИВ курс 1"), "ФАСТИВ курс 1");
        assert_eq!(sanitize_component("a/b:c"), "a_b_c");
        assert_eq!(sanitize_component(".."), "_");
        assert_eq!(sanitize_component("  "), "_");
    }

    #[test]
    fn test_version_relative_path() {
        let resource = ResourceIdentity::new("РЗ/Б/К1", "Расписание 1 курс");
        let version = NewVersion {
            mimetype: "xlsx".into(),
            url: "https://example.org/a.xlsx".into(),
            timestamp: Utc.with_ymd_and_hms(2024, 9, 1, 8, 30, 0).unwrap(),
            last_changed: Utc.with_ymd_and_hms(2024, 9, 1, 8, 0, 0).unwrap(),
            hashsum: "abc".into(),
            short_name: "Р1К.xlsx".into(),
        };

        let path = version_relative_path(&resource, &version);
        let parts: Vec<String> = path
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            parts,
            vec![
                "РЗ",
                "Б",
                "К1",
                "Расписание 1 курс",
                "20240901T083000.000000_Р1К.xlsx"
            ]
        );
    }
}

//! JSON manifest crawl source.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{CrawlError, FileSource};
use crate::models::{FileDescriptor, ScheduleKind};

/// Reads descriptors from a JSON file keyed by schedule-kind label:
///
/// ```json
/// { "Занятия": [ { "source_path": "...", "source_url": "..." } ] }
/// ```
///
/// The crawl root is ignored; kinds missing from the manifest yield nothing.
#[derive(Debug, Clone)]
pub struct ManifestSource {
    path: PathBuf,
}

impl ManifestSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<HashMap<String, Vec<FileDescriptor>>, CrawlError> {
        let contents = tokio::fs::read_to_string(&self.path).await?;
        Ok(serde_json::from_str(&contents)?)
    }
}

#[async_trait]
impl FileSource for ManifestSource {
    async fn discover(
        &self,
        _root: &str,
        kind: &ScheduleKind,
    ) -> Result<Vec<FileDescriptor>, CrawlError> {
        let mut manifest = self.load().await?;
        Ok(manifest.remove(&kind.label).unwrap_or_default())
    }
}

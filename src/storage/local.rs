//! Local directory storage backend.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{version_relative_path, StorageBackend, StorageError};
use crate::models::{NewVersion, ResourceIdentity};

/// Copies versions under a root directory; locators are absolute paths.
#[derive(Debug, Clone)]
pub struct LocalDiskBackend {
    name: String,
    root: PathBuf,
}

impl LocalDiskBackend {
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl StorageBackend for LocalDiskBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn persist(
        &self,
        local: &Path,
        resource: &ResourceIdentity,
        version: &NewVersion,
    ) -> Result<String, StorageError> {
        let target = self.root.join(version_relative_path(resource, version));
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::copy(local, &target).await?;

        tracing::debug!("Stored {} at {}", resource, target.display());
        Ok(target.display().to_string())
    }

    fn retrievable_path(&self, locator: &str) -> Option<PathBuf> {
        let path = PathBuf::from(locator);
        path.is_file().then_some(path)
    }
}

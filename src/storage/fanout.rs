//! Fan-out of one accepted file to every enabled storage backend.

use std::path::Path;
use std::sync::Arc;

use super::{StorageBackend, StorageError};
use crate::models::{NewVersion, ResourceIdentity, StorageLocation};

/// The set of backends a pass writes to.
#[derive(Clone, Default)]
pub struct StorageFanout {
    backends: Vec<Arc<dyn StorageBackend>>,
}

impl StorageFanout {
    pub fn new(backends: Vec<Arc<dyn StorageBackend>>) -> Self {
        Self { backends }
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    pub fn backends(&self) -> &[Arc<dyn StorageBackend>] {
        &self.backends
    }

    /// Keep only the named backends; an empty list keeps all of them.
    pub fn restrict_to(self, names: &[String]) -> Result<Self, StorageError> {
        if names.is_empty() {
            return Ok(self);
        }
        if let Some(unknown) = names
            .iter()
            .find(|name| !self.backends.iter().any(|b| b.name() == name.as_str()))
        {
            return Err(StorageError::UnknownBackend(unknown.clone()));
        }
        let backends = self
            .backends
            .into_iter()
            .filter(|b| names.iter().any(|name| name == b.name()))
            .collect();
        Ok(Self { backends })
    }

    /// Persist to every backend, once each.
    ///
    /// Fails on the first backend error; locations already written by
    /// earlier backends are left in place and the caller records nothing.
    pub async fn persist_all(
        &self,
        local: &Path,
        resource: &ResourceIdentity,
        version: &NewVersion,
    ) -> Result<Vec<StorageLocation>, StorageError> {
        let mut locations = Vec::with_capacity(self.backends.len());

        for backend in &self.backends {
            match backend.persist(local, resource, version).await {
                Ok(locator) => locations.push(StorageLocation {
                    backend: backend.name().to_string(),
                    locator,
                }),
                Err(e) => {
                    tracing::warn!(
                        "Storage backend '{}' failed for {}: {}",
                        backend.name(),
                        resource,
                        e
                    );
                    return Err(e);
                }
            }
        }

        Ok(locations)
    }
}

impl std::fmt::Debug for StorageFanout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.backends.iter().map(|b| b.name()).collect();
        f.debug_struct("StorageFanout")
            .field("backends", &names)
            .finish()
    }
}

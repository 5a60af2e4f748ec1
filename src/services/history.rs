//! Version-history signal for downstream visualization.
//!
//! After a new version is appended, the stored copies of a resource that can
//! be read back locally are collected. Two or more of them are handed to a
//! [`HistoryObserver`], which can render a comparison between them.

use std::collections::HashSet;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::ResourceIdentity;
use crate::repository::{CatalogRepository, DbError};
use crate::storage::StorageFanout;

/// Fewer retrievable versions than this produce no signal.
pub const MIN_HISTORY_VERSIONS: usize = 2;

/// One stored version with a readable local copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub version_id: i32,
    pub path: PathBuf,
    pub last_changed: Option<DateTime<Utc>>,
}

/// Receives the ordered history of a resource that just changed.
#[async_trait]
pub trait HistoryObserver: Send + Sync {
    async fn on_history(&self, resource: &ResourceIdentity, history: &[HistoryEntry]);
}

/// Observer that only logs the signal.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingObserver;

#[async_trait]
impl HistoryObserver for LoggingObserver {
    async fn on_history(&self, resource: &ResourceIdentity, history: &[HistoryEntry]) {
        tracing::info!(
            "{} has {} stored versions available for comparison",
            resource,
            history.len()
        );
    }
}

/// Versions of a resource with a local copy, newest site change first.
///
/// Each version appears once even when several backends hold a copy; the
/// first backend in fan-out order wins.
pub async fn collect_history(
    catalog: &CatalogRepository,
    storage: &StorageFanout,
    resource_id: i32,
) -> Result<Vec<HistoryEntry>, DbError> {
    let mut seen = HashSet::new();
    let mut history = Vec::new();

    for backend in storage.backends() {
        for (version, locator) in catalog.version_locations(resource_id, backend.name()).await? {
            if seen.contains(&version.id) {
                continue;
            }
            if let Some(path) = backend.retrievable_path(&locator) {
                seen.insert(version.id);
                history.push(HistoryEntry {
                    version_id: version.id,
                    path,
                    last_changed: version.last_changed,
                });
            }
        }
    }

    history.sort_by(|a, b| b.last_changed.cmp(&a.last_changed));
    Ok(history)
}

/// Collect the history and signal the observer if there is enough of it.
///
/// Returns whether the observer was called.
pub async fn signal_history(
    catalog: &CatalogRepository,
    storage: &StorageFanout,
    observer: &dyn HistoryObserver,
    resource: &ResourceIdentity,
    resource_id: i32,
) -> Result<bool, DbError> {
    let history = collect_history(catalog, storage, resource_id).await?;
    if history.len() < MIN_HISTORY_VERSIONS {
        tracing::debug!(
            "{} has {} retrievable versions, no history signal",
            resource,
            history.len()
        );
        return Ok(false);
    }

    observer.on_history(resource, &history).await;
    Ok(true)
}

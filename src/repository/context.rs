//! Database context for managing connections and repository access.
//!
//! The CatalogContext is the primary entry point for all database operations.
//! It holds the connection pool and provides access to all repositories.

use std::path::Path;

use diesel_async::SimpleAsyncConnection;

use super::catalog::CatalogRepository;
use super::pool::{DbError, DbPool};
use super::settings::SettingsRepository;

const SQLITE_SCHEMA: &str = r#"
-- Canonical schedule artifacts
CREATE TABLE IF NOT EXISTS resources (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    path TEXT NOT NULL,
    metadata TEXT,
    deprecated BOOLEAN NOT NULL DEFAULT 0,
    last_update TEXT NOT NULL,
    UNIQUE(path, name)
);

-- Append-only content observations
CREATE TABLE IF NOT EXISTS file_versions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    resource_id INTEGER NOT NULL,
    mimetype TEXT,
    url TEXT,
    timestamp TEXT NOT NULL,
    last_changed TEXT,
    hashsum TEXT NOT NULL,
    FOREIGN KEY (resource_id) REFERENCES resources(id)
);

CREATE TABLE IF NOT EXISTS tags (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    category TEXT NOT NULL,
    UNIQUE(name, category)
);

CREATE TABLE IF NOT EXISTS resource_tags (
    resource_id INTEGER NOT NULL,
    tag_id INTEGER NOT NULL,
    PRIMARY KEY (resource_id, tag_id),
    FOREIGN KEY (resource_id) REFERENCES resources(id),
    FOREIGN KEY (tag_id) REFERENCES tags(id)
);

CREATE TABLE IF NOT EXISTS settings (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

-- Where each backend stored the bytes of a version
CREATE TABLE IF NOT EXISTS storage_locations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    version_id INTEGER NOT NULL,
    backend TEXT NOT NULL,
    locator TEXT NOT NULL,
    FOREIGN KEY (version_id) REFERENCES file_versions(id)
);

CREATE INDEX IF NOT EXISTS idx_file_versions_resource
    ON file_versions(resource_id, timestamp);
CREATE INDEX IF NOT EXISTS idx_resources_deprecated ON resources(deprecated);
CREATE INDEX IF NOT EXISTS idx_storage_locations_version ON storage_locations(version_id);
"#;

/// Database context that manages the connection pool and provides repository access.
///
/// # Example
/// ```ignore
/// let ctx = CatalogContext::new(&db_path);
/// ctx.init_schema().await?;
/// let resources = ctx.catalog().list_resources(false).await?;
/// ```
#[derive(Debug, Clone)]
pub struct CatalogContext {
    pool: DbPool,
}

impl CatalogContext {
    /// Create a context from a database file path.
    pub fn new(db_path: &Path) -> Self {
        Self {
            pool: DbPool::from_path(db_path),
        }
    }

    /// Create a context from a database URL (`sqlite:` prefix optional).
    pub fn from_url(url: &str) -> Self {
        Self {
            pool: DbPool::new(url),
        }
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Get the catalog repository.
    pub fn catalog(&self) -> CatalogRepository {
        CatalogRepository::new(self.pool.clone())
    }

    /// Get the settings repository.
    pub fn settings(&self) -> SettingsRepository {
        SettingsRepository::new(self.pool.clone())
    }

    /// Initialize database schema. Safe to run repeatedly.
    pub async fn init_schema(&self) -> Result<(), DbError> {
        let mut conn = self.pool.get().await?;
        conn.batch_execute(SQLITE_SCHEMA).await
    }
}

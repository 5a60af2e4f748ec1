//! File version models.
//!
//! A version records that a specific content fingerprint was observed under a
//! resource at a point in time. Versions are append-only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A file version as stored in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileVersion {
    pub id: i32,
    pub resource_id: i32,
    /// File extension of the stored content, without the leading dot.
    pub mimetype: Option<String>,
    pub url: Option<String>,
    /// When we discovered this content (local clock).
    pub timestamp: DateTime<Utc>,
    /// Site-reported modification time, best effort.
    pub last_changed: Option<DateTime<Utc>>,
    pub hashsum: String,
}

/// A version that has been fingerprinted but not yet written to the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct NewVersion {
    pub mimetype: String,
    pub url: String,
    pub timestamp: DateTime<Utc>,
    pub last_changed: DateTime<Utc>,
    pub hashsum: String,
    /// Storage-safe file name derived from the source URL.
    pub short_name: String,
}

/// Where a storage backend put the bytes of a version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageLocation {
    pub backend: String,
    pub locator: String,
}

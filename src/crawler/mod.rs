//! Crawl sources: where file descriptors come from.
//!
//! A pass asks a [`FileSource`] for the files under each crawl root. The HTML
//! source walks the schedule index page; the manifest source reads a prepared
//! JSON listing, which is useful offline and in tests.

mod html;
mod manifest;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{FileDescriptor, ScheduleKind};

pub use html::HtmlIndexSource;
pub use manifest::ManifestSource;

#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("failed to fetch index: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("failed to read manifest: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse manifest: {0}")]
    Json(#[from] serde_json::Error),
}

/// Produces the ordered list of files published under a crawl root.
#[async_trait]
pub trait FileSource: Send + Sync {
    async fn discover(
        &self,
        root: &str,
        kind: &ScheduleKind,
    ) -> Result<Vec<FileDescriptor>, CrawlError>;
}

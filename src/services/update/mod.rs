//! One update pass over the schedule site.
//!
//! `CRAWL -> per file: FETCH -> CONVERT? -> CLASSIFY -> FINGERPRINT ->
//! RECONCILE -> PERSIST | SKIP -> CLEANUP`, then `SWEEP` once every file has
//! been handled. Per-file failures are logged and counted; they never abort
//! the pass.

mod pipeline;
mod report;

use thiserror::Error;

use crate::crawler::CrawlError;
use crate::fingerprint::FingerprintError;
use crate::repository::DbError;
use crate::services::fetch::FetchError;

pub use pipeline::{UpdatePipeline, UpdatePipelineBuilder, DEFAULT_WORKERS};
pub use report::{FileOutcome, FileResult, PassReport};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("an update pass is already running")]
    PassInProgress,
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("fingerprint failed: {0}")]
    Fingerprint(#[from] FingerprintError),
    #[error("crawl failed: {0}")]
    Crawl(#[from] CrawlError),
    #[error("database error: {0}")]
    Database(#[from] DbError),
    #[error("scratch storage failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("worker task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

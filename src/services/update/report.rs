//! Pass statistics.

use std::fmt;

use serde::Serialize;

/// What happened to one discovered file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    /// New content: stored and recorded as a version.
    Changed,
    /// Same fingerprint as the latest version; nothing written.
    Unchanged,
    /// New content, but a storage backend failed; the resource was still
    /// refreshed and the next pass retries.
    StorageFailed,
    /// Fetch, fingerprint or catalog failure; the resource was not touched.
    Failed,
}

/// Result of processing one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileResult {
    pub outcome: FileOutcome,
    pub created: bool,
    pub revived: bool,
    pub history_signalled: bool,
}

impl FileResult {
    pub fn failed() -> Self {
        Self {
            outcome: FileOutcome::Failed,
            created: false,
            revived: false,
            history_signalled: false,
        }
    }
}

/// Counts for one update pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PassReport {
    pub discovered: usize,
    pub changed: usize,
    pub unchanged: usize,
    pub storage_failed: usize,
    pub failed: usize,
    /// Resources seen for the first time.
    pub created: usize,
    /// Deprecated resources that reappeared.
    pub revived: usize,
    /// Resources tombstoned by the sweep.
    pub deprecated: usize,
    pub history_signals: usize,
    /// Crawl roots whose listing could not be read.
    pub crawl_failures: usize,
    /// The sweep did not run (a crawl root failed, nothing was processed,
    /// or a worker died).
    pub sweep_skipped: bool,
}

impl PassReport {
    pub fn record(&mut self, result: &FileResult) {
        match result.outcome {
            FileOutcome::Changed => self.changed += 1,
            FileOutcome::Unchanged => self.unchanged += 1,
            FileOutcome::StorageFailed => self.storage_failed += 1,
            FileOutcome::Failed => self.failed += 1,
        }
        self.created += usize::from(result.created);
        self.revived += usize::from(result.revived);
        self.history_signals += usize::from(result.history_signalled);
    }

    /// Fold a worker's partial counts into this report.
    pub fn merge(&mut self, other: &PassReport) {
        self.changed += other.changed;
        self.unchanged += other.unchanged;
        self.storage_failed += other.storage_failed;
        self.failed += other.failed;
        self.created += other.created;
        self.revived += other.revived;
        self.history_signals += other.history_signals;
    }

    /// Files whose resource was touched this pass.
    pub fn processed(&self) -> usize {
        self.changed + self.unchanged + self.storage_failed
    }
}

impl fmt::Display for PassReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} discovered, {} changed, {} unchanged, {} failed",
            self.discovered,
            self.changed,
            self.unchanged,
            self.failed + self.storage_failed
        )?;
        if self.sweep_skipped {
            write!(f, ", sweep skipped")
        } else {
            write!(f, ", {} deprecated", self.deprecated)
        }
    }
}

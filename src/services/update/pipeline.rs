//! Update pass orchestration.

use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tempfile::TempDir;
use tokio::sync::Mutex;

use super::report::{FileOutcome, FileResult, PassReport};
use super::PipelineError;
use crate::classify::Classifier;
use crate::crawler::FileSource;
use crate::fingerprint::fingerprint;
use crate::models::{FileDescriptor, NewVersion, ScheduleKind};
use crate::repository::{
    CatalogContext, CatalogRepository, SettingsRepository, VersionCandidate, VersionOutcome,
};
use crate::services::convert::Converter;
use crate::services::fetch::Fetcher;
use crate::services::history::{signal_history, HistoryObserver, LoggingObserver};
use crate::storage::StorageFanout;

/// Concurrent per-file tasks when not configured.
pub const DEFAULT_WORKERS: usize = 4;

/// One discovered file and the schedule kind it was crawled under.
#[derive(Debug, Clone)]
struct Job {
    descriptor: FileDescriptor,
    kind: ScheduleKind,
}

/// State shared by every worker of a pass.
struct Worker {
    catalog: CatalogRepository,
    classifier: Classifier,
    fetcher: Arc<dyn Fetcher>,
    converter: Option<Arc<dyn Converter>>,
    observer: Arc<dyn HistoryObserver>,
    scratch_dir: Option<PathBuf>,
    /// Serializes peek-hash, store and reconcile across workers so two files
    /// mapping to the same resource cannot both append a version.
    catalog_lock: Mutex<()>,
}

/// Clears the in-progress flag when a pass ends, however it ends.
struct PassGuard<'a>(&'a AtomicBool);

impl<'a> PassGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Crawls, fetches, fingerprints and catalogs schedule files.
///
/// At most one pass runs at a time per pipeline; a second concurrent call to
/// [`UpdatePipeline::run_pass`] fails with [`PipelineError::PassInProgress`].
pub struct UpdatePipeline {
    worker: Arc<Worker>,
    settings: SettingsRepository,
    source: Arc<dyn FileSource>,
    storage: StorageFanout,
    kinds: Vec<ScheduleKind>,
    workers: usize,
    running: AtomicBool,
}

impl UpdatePipeline {
    pub fn builder(
        ctx: &CatalogContext,
        source: Arc<dyn FileSource>,
        fetcher: Arc<dyn Fetcher>,
    ) -> UpdatePipelineBuilder {
        UpdatePipelineBuilder {
            catalog: ctx.catalog(),
            settings: ctx.settings(),
            source,
            fetcher,
            converter: None,
            storage: StorageFanout::default(),
            observer: Arc::new(LoggingObserver),
            classifier: Classifier::default(),
            kinds: ScheduleKind::defaults(),
            workers: DEFAULT_WORKERS,
            scratch_dir: None,
        }
    }

    pub fn catalog(&self) -> &CatalogRepository {
        &self.worker.catalog
    }

    pub fn settings(&self) -> &SettingsRepository {
        &self.settings
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Run one complete update pass.
    pub async fn run_pass(&self) -> Result<PassReport, PipelineError> {
        let _guard = PassGuard::acquire(&self.running).ok_or(PipelineError::PassInProgress)?;
        let started = Instant::now();

        let storage = Arc::new(self.pass_storage().await?);
        let (jobs, crawl_failures) = self.crawl().await?;
        let mut report = PassReport {
            discovered: jobs.len(),
            crawl_failures,
            ..Default::default()
        };
        tracing::info!("Update pass: {} files discovered", jobs.len());

        let workers = self.workers.clamp(1, jobs.len().max(1));
        let queue = Arc::new(Mutex::new(VecDeque::from(jobs)));
        let touched = Arc::new(Mutex::new(HashSet::new()));

        let mut handles = Vec::with_capacity(workers);

        for worker_id in 0..workers {
            let worker = self.worker.clone();
            let storage = storage.clone();
            let queue = queue.clone();
            let touched = touched.clone();

            let handle = tokio::spawn(async move {
                let mut partial = PassReport::default();
                loop {
                    let Some(job) = queue.lock().await.pop_front() else {
                        break;
                    };
                    tracing::debug!(
                        "Worker {} processing {}",
                        worker_id,
                        job.descriptor.source_url
                    );
                    let result = worker.process(&job, &storage, &touched).await;
                    partial.record(&result);
                }
                partial
            });

            handles.push(handle);
        }

        // Barrier: every file is handled before the sweep
        let mut complete = true;
        for handle in handles {
            match handle.await {
                Ok(partial) => report.merge(&partial),
                Err(e) => {
                    tracing::error!("Update worker failed: {}", e);
                    complete = false;
                }
            }
        }

        let touched = touched.lock().await;
        if crawl_failures > 0 {
            tracing::warn!(
                "Skipping sweep: {} crawl root(s) could not be listed",
                crawl_failures
            );
            report.sweep_skipped = true;
        } else if !complete {
            tracing::warn!("Skipping sweep: not every file was handled");
            report.sweep_skipped = true;
        } else if touched.is_empty() {
            tracing::warn!("Skipping sweep: no files were processed");
            report.sweep_skipped = true;
        } else {
            report.deprecated = self.worker.catalog.sweep(&touched).await?;
        }

        tracing::info!(
            "Update pass finished in {:.1}s: {}",
            started.elapsed().as_secs_f64(),
            report
        );
        Ok(report)
    }

    /// Storage backends enabled for this pass.
    async fn pass_storage(&self) -> Result<StorageFanout, PipelineError> {
        let enabled = self.settings.enabled_backends().await?;
        match self.storage.clone().restrict_to(&enabled) {
            Ok(storage) => Ok(storage),
            Err(e) => {
                tracing::warn!("{}; using every configured backend", e);
                Ok(self.storage.clone())
            }
        }
    }

    /// Discover files under every configured root.
    ///
    /// Roots pair positionally with schedule kinds. A root that fails to
    /// crawl is logged and counted.
    async fn crawl(&self) -> Result<(Vec<Job>, usize), PipelineError> {
        let roots = self.settings.crawl_roots().await?;
        if roots.len() > self.kinds.len() {
            tracing::warn!(
                "{} crawl roots but only {} schedule kinds; extra roots ignored",
                roots.len(),
                self.kinds.len()
            );
        }

        let mut jobs = Vec::new();
        let mut failures = 0;
        for (root, kind) in roots.iter().zip(&self.kinds) {
            match self.source.discover(root, kind).await {
                Ok(files) => {
                    tracing::debug!("{} files under {} ({})", files.len(), root, kind.label);
                    jobs.extend(files.into_iter().map(|descriptor| Job {
                        descriptor,
                        kind: kind.clone(),
                    }));
                }
                Err(e) => {
                    tracing::warn!("Failed to crawl {} ({}): {}", root, kind.label, e);
                    failures += 1;
                }
            }
        }
        Ok((jobs, failures))
    }
}

impl Worker {
    async fn process(
        &self,
        job: &Job,
        storage: &StorageFanout,
        touched: &Mutex<HashSet<i32>>,
    ) -> FileResult {
        match self.try_process(job, storage, touched).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!("Skipping {}: {}", job.descriptor.source_url, e);
                FileResult::failed()
            }
        }
    }

    async fn try_process(
        &self,
        job: &Job,
        storage: &StorageFanout,
        touched: &Mutex<HashSet<i32>>,
    ) -> Result<FileResult, PipelineError> {
        let descriptor = &job.descriptor;
        let classification = self.classifier.classify(descriptor, &job.kind);

        // Dropped on every exit path, which removes the downloaded bytes
        let scratch = self.scratch()?;
        let download = scratch.path().join(&classification.short_name);
        self.fetcher.fetch(&descriptor.source_url, &download).await?;

        let (path, extension) = self
            .convert(download, classification.extension.clone(), scratch.path())
            .await;

        let fingerprint = {
            let path = path.clone();
            let extension = extension.clone();
            let hint = descriptor.last_changed_hint.clone();
            tokio::task::spawn_blocking(move || {
                fingerprint(&path, extension.as_deref(), hint.as_deref())
            })
            .await??
        };

        let plan = classification.plan(&descriptor.source_path);
        let version = NewVersion {
            mimetype: extension.unwrap_or_default(),
            url: descriptor.source_url.clone(),
            timestamp: Utc::now(),
            last_changed: fingerprint.last_changed,
            hashsum: fingerprint.hashsum,
            short_name: path
                .file_name()
                .and_then(|name| name.to_str())
                .map(str::to_string)
                .unwrap_or(classification.short_name),
        };

        let _lock = self.catalog_lock.lock().await;

        let latest = self.catalog.latest_hashsum(&plan.identity).await?;
        let changed = latest.as_deref() != Some(version.hashsum.as_str());

        let locations = if changed {
            match storage.persist_all(&path, &plan.identity, &version).await {
                Ok(locations) => Some(locations),
                Err(e) => {
                    tracing::warn!(
                        "Not recording new version of {}: storage failed: {}",
                        plan.identity,
                        e
                    );
                    None
                }
            }
        } else {
            Some(Vec::new())
        };

        let candidate = locations.as_deref().map(|locations| VersionCandidate {
            version: &version,
            locations,
        });
        let reconciled = self.catalog.reconcile(&plan, candidate).await?;
        touched.lock().await.insert(reconciled.resource_id);

        let mut result = FileResult {
            outcome: FileOutcome::Unchanged,
            created: reconciled.created,
            revived: reconciled.revived,
            history_signalled: false,
        };

        match reconciled.outcome {
            VersionOutcome::Appended(version_id) => {
                tracing::info!(
                    "New version {} of {} from {}",
                    version_id,
                    plan.identity,
                    descriptor.source_url
                );
                result.outcome = FileOutcome::Changed;
                result.history_signalled = match signal_history(
                    &self.catalog,
                    storage,
                    self.observer.as_ref(),
                    &plan.identity,
                    reconciled.resource_id,
                )
                .await
                {
                    Ok(signalled) => signalled,
                    Err(e) => {
                        tracing::warn!("History lookup failed for {}: {}", plan.identity, e);
                        false
                    }
                };
            }
            VersionOutcome::Unchanged => {
                tracing::debug!("{} unchanged", plan.identity);
            }
            VersionOutcome::NotOffered => {
                result.outcome = FileOutcome::StorageFailed;
            }
        }

        Ok(result)
    }

    fn scratch(&self) -> std::io::Result<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("ttsync-");
        match &self.scratch_dir {
            Some(dir) => builder.tempdir_in(dir),
            None => builder.tempdir(),
        }
    }

    /// Convert legacy formats when a converter handles the extension.
    ///
    /// Falls back to the original file when conversion fails.
    async fn convert(
        &self,
        download: PathBuf,
        extension: Option<String>,
        out_dir: &Path,
    ) -> (PathBuf, Option<String>) {
        let Some(converter) = &self.converter else {
            return (download, extension);
        };
        if !extension.as_deref().is_some_and(|ext| converter.handles(ext)) {
            return (download, extension);
        }

        match converter.convert(&download, out_dir).await {
            Ok(converted) => (converted, Some(converter.target_extension().to_string())),
            Err(e) => {
                tracing::warn!(
                    "Conversion of {} failed, keeping original: {}",
                    download.display(),
                    e
                );
                (download, extension)
            }
        }
    }
}

/// Builder for [`UpdatePipeline`].
pub struct UpdatePipelineBuilder {
    catalog: CatalogRepository,
    settings: SettingsRepository,
    source: Arc<dyn FileSource>,
    fetcher: Arc<dyn Fetcher>,
    converter: Option<Arc<dyn Converter>>,
    storage: StorageFanout,
    observer: Arc<dyn HistoryObserver>,
    classifier: Classifier,
    kinds: Vec<ScheduleKind>,
    workers: usize,
    scratch_dir: Option<PathBuf>,
}

impl UpdatePipelineBuilder {
    pub fn converter(mut self, converter: Arc<dyn Converter>) -> Self {
        self.converter = Some(converter);
        self
    }

    pub fn storage(mut self, storage: StorageFanout) -> Self {
        self.storage = storage;
        self
    }

    pub fn observer(mut self, observer: Arc<dyn HistoryObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn classifier(mut self, classifier: Classifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn kinds(mut self, kinds: Vec<ScheduleKind>) -> Self {
        self.kinds = kinds;
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Directory for per-file scratch space; the system temp dir otherwise.
    pub fn scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    pub fn build(self) -> UpdatePipeline {
        UpdatePipeline {
            worker: Arc::new(Worker {
                catalog: self.catalog,
                classifier: self.classifier,
                fetcher: self.fetcher,
                converter: self.converter,
                observer: self.observer,
                scratch_dir: self.scratch_dir,
                catalog_lock: Mutex::new(()),
            }),
            settings: self.settings,
            source: self.source,
            storage: self.storage,
            kinds: self.kinds,
            workers: self.workers,
            running: AtomicBool::new(false),
        }
    }
}

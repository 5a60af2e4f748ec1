//! Periodic update passes.
//!
//! The scheduler owns a background task that waits one interval, runs a pass,
//! and repeats. A pass that is still running when the next tick would fire
//! delays the tick; passes never overlap. After each pass the interval is
//! re-read from the `time_update` setting.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use super::update::UpdatePipeline;
use crate::repository::settings::update_interval;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("scheduler is already running")]
    AlreadyRunning,
    #[error("scheduler is not running")]
    NotRunning,
    #[error("update interval must be positive")]
    ZeroInterval,
}

struct Running {
    interval: watch::Sender<Duration>,
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Runs update passes on a fixed, reconfigurable interval.
pub struct UpdateScheduler {
    pipeline: Arc<UpdatePipeline>,
    running: Mutex<Option<Running>>,
}

impl UpdateScheduler {
    pub fn new(pipeline: Arc<UpdatePipeline>) -> Self {
        Self {
            pipeline,
            running: Mutex::new(None),
        }
    }

    pub fn pipeline(&self) -> &Arc<UpdatePipeline> {
        &self.pipeline
    }

    pub async fn is_running(&self) -> bool {
        self.running.lock().await.is_some()
    }

    /// Start the periodic job. The first pass runs one interval from now.
    pub async fn start(&self, interval: Duration) -> Result<(), SchedulerError> {
        if interval.is_zero() {
            return Err(SchedulerError::ZeroInterval);
        }
        let mut running = self.running.lock().await;
        if running.is_some() {
            return Err(SchedulerError::AlreadyRunning);
        }

        let (interval_tx, interval_rx) = watch::channel(interval);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(run_loop(
            self.pipeline.clone(),
            interval_tx.clone(),
            interval_rx,
            shutdown_rx,
        ));

        tracing::info!("Scheduler started, interval {}s", interval.as_secs());
        *running = Some(Running {
            interval: interval_tx,
            shutdown: shutdown_tx,
            handle,
        });
        Ok(())
    }

    /// Change the interval; the wait in progress restarts with the new value.
    pub async fn reconfigure(&self, interval: Duration) -> Result<(), SchedulerError> {
        if interval.is_zero() {
            return Err(SchedulerError::ZeroInterval);
        }
        let running = self.running.lock().await;
        let Some(running) = running.as_ref() else {
            return Err(SchedulerError::NotRunning);
        };
        running.interval.send_replace(interval);
        tracing::info!("Scheduler interval changed to {}s", interval.as_secs());
        Ok(())
    }

    /// Stop the periodic job, letting a pass in progress finish first.
    pub async fn stop(&self) -> Result<(), SchedulerError> {
        let Some(running) = self.running.lock().await.take() else {
            return Err(SchedulerError::NotRunning);
        };
        running.shutdown.send_replace(true);
        if let Err(e) = running.handle.await {
            tracing::error!("Scheduler task failed: {}", e);
        }
        tracing::info!("Scheduler stopped");
        Ok(())
    }
}

async fn run_loop(
    pipeline: Arc<UpdatePipeline>,
    interval_tx: watch::Sender<Duration>,
    mut interval_rx: watch::Receiver<Duration>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        let period = *interval_rx.borrow_and_update();

        tokio::select! {
            _ = tokio::time::sleep(period) => {}
            changed = interval_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                continue;
            }
            _ = shutdown_rx.changed() => break,
        }

        match pipeline.run_pass().await {
            Ok(report) => tracing::info!("Scheduled pass complete: {}", report),
            Err(e) => tracing::error!("Scheduled pass failed: {}", e),
        }

        match pipeline.settings().update_minutes().await {
            Ok(minutes) => {
                let configured = update_interval(minutes);
                if configured != *interval_rx.borrow() {
                    tracing::info!("Update interval is now {} minutes", minutes);
                    interval_tx.send_replace(configured);
                }
            }
            Err(e) => tracing::warn!("Could not re-read update interval: {}", e),
        }

        if *shutdown_rx.borrow() {
            break;
        }
    }
}

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::FutureExt;
use tokio::sync::{watch, Notify, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::{SyncError, SyncPass};
use crate::config::SyncConfig;
use crate::metrics::Metrics;
use crate::types::{SchedulerState, SyncStatus};

/// Runs sync passes back to back with a fixed pause in between.
///
/// After a successful pass the scheduler idles for `interval`; after a failed
/// one it idles for the shorter `error_backoff`. Passes never overlap. The loop
/// ends (state `Stopped`) only when the cancellation token fires. A manual
/// trigger cuts the current idle period short.
pub struct Scheduler {
    pass: Arc<dyn SyncPass>,
    interval: Duration,
    error_backoff: Duration,
    metrics: Metrics,
    state: watch::Sender<SchedulerState>,
    status: Arc<RwLock<SyncStatus>>,
    trigger: Arc<Notify>,
}

impl Scheduler {
    pub fn new(pass: Arc<dyn SyncPass>, config: &SyncConfig, metrics: Metrics) -> Self {
        Self::with_periods(pass, config.interval(), config.error_backoff(), metrics)
    }

    pub fn with_periods(
        pass: Arc<dyn SyncPass>,
        interval: Duration,
        error_backoff: Duration,
        metrics: Metrics,
    ) -> Self {
        // The first pass starts as soon as `run` is spawned.
        let (state, _) = watch::channel(SchedulerState::Running);
        let status = SyncStatus { state: SchedulerState::Running, ..SyncStatus::default() };
        Self {
            pass,
            interval,
            error_backoff,
            metrics,
            state,
            status: Arc::new(RwLock::new(status)),
            trigger: Arc::new(Notify::new()),
        }
    }

    /// Shared status, updated after every pass.
    pub fn status(&self) -> Arc<RwLock<SyncStatus>> {
        self.status.clone()
    }

    /// Notifying this handle starts the next pass immediately if the scheduler is idle.
    pub fn trigger(&self) -> Arc<Notify> {
        self.trigger.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SchedulerState> {
        self.state.subscribe()
    }

    pub async fn run(self, cancel: CancellationToken) {
        info!(interval = ?self.interval, error_backoff = ?self.error_backoff, "Photo sync scheduler started");

        while !cancel.is_cancelled() {
            self.set_state(SchedulerState::Running, None).await;
            // A trigger stored before this point is satisfied by the pass starting now.
            let _ = self.trigger.notified().now_or_never();
            self.metrics.inc_passes_started();

            let wait = match self.pass.run_pass(&cancel).await {
                Ok(report) => {
                    self.metrics.inc_passes_completed();
                    let mut status = self.status.write().await;
                    status.last_report = Some(report);
                    status.last_error = None;
                    self.interval
                }
                Err(SyncError::Cancelled) => break,
                Err(e) => {
                    self.metrics.inc_passes_failed();
                    error!(retry_in = ?self.error_backoff, "Photo sync pass failed: {}", e);
                    self.status.write().await.last_error = Some(e.to_string());
                    self.error_backoff
                }
            };

            self.set_state(SchedulerState::Idle, Some(wait)).await;
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(wait) => {}
                _ = self.trigger.notified() => info!("Manual sync requested"),
            }
        }

        self.set_state(SchedulerState::Stopped, None).await;
        info!("Photo sync scheduler stopped");
    }

    async fn set_state(&self, state: SchedulerState, next_in: Option<Duration>) {
        {
            let mut status = self.status.write().await;
            status.state = state;
            status.next_run_at =
                next_in.and_then(|d| chrono::Duration::from_std(d).ok()).map(|d| Utc::now() + d);
        }
        self.state.send_replace(state);
    }
}

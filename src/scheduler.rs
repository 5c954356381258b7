//! Periodic batch analysis for every clinician with an active binding.
//!
//! One background task ticks on a fixed interval (first tick immediately)
//! and runs the batch orchestrator clinician by clinician. A tick that is
//! still running when the next one is due delays the next one.
//!
//! Supports graceful shutdown via `shutdown()` or on `Drop`. A batch that
//! is in progress completes before the task exits.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::core_state::CoreState;
use crate::db::repository::list_active_clinician_ids;
use crate::intelligence::{run_batch, AnalysisError};

/// Handle to the background scheduler task.
pub struct SchedulerHandle {
    shutdown_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Request graceful shutdown.
    pub fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);
    }

    /// Request shutdown and wait for the task to exit.
    pub async fn stop(mut self) {
        self.shutdown();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!("Scheduler task failed: {e}");
            }
        }
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Outcome of one scheduler tick across all clinicians.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TickSummary {
    pub clinicians: usize,
    pub generated: usize,
    pub failed_clinicians: usize,
}

/// Spawn the scheduler on the current tokio runtime.
pub fn start_scheduler(state: Arc<CoreState>, interval: Duration) -> SchedulerHandle {
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(interval_secs = interval.as_secs(), "Batch scheduler started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = run_all_clinicians(state.clone()).await {
                        tracing::warn!(error = %e, "Scheduled batch could not start");
                    }
                }
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!("Batch scheduler stopped");
    });

    SchedulerHandle {
        shutdown_tx,
        task: Some(task),
    }
}

/// Run the batch orchestrator for every clinician with an active binding,
/// one after the other. A failing clinician is logged and skipped.
pub async fn run_all_clinicians(state: Arc<CoreState>) -> Result<TickSummary, AnalysisError> {
    let roster_state = state.clone();
    let clinicians = tokio::task::spawn_blocking(move || -> Result<_, AnalysisError> {
        let conn = roster_state.open_db()?;
        Ok(list_active_clinician_ids(&conn)?)
    })
    .await
    .map_err(|e| AnalysisError::Task(e.to_string()))??;

    let mut summary = TickSummary {
        clinicians: clinicians.len(),
        ..TickSummary::default()
    };
    for clinician_id in clinicians {
        match run_batch(state.clone(), clinician_id).await {
            Ok(report) => summary.generated += report.generated_count(),
            Err(e) => {
                summary.failed_clinicians += 1;
                tracing::warn!(clinician_id = %clinician_id, error = %e, "Scheduled batch failed");
            }
        }
    }

    tracing::info!(
        clinicians = summary.clinicians,
        generated = summary.generated,
        failed = summary.failed_clinicians,
        "Scheduled batch tick complete"
    );
    Ok(summary)
}

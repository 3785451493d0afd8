//! Background eviction of expired active-user entries.
//!
//! Runs on its own tokio task; request paths never wait on it. The handle can
//! stop the task, which `main` does on graceful shutdown.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use taskmeter_core::registry::SWEEP_REMOVED_TOTAL;
use taskmeter_core::{now_ms, MetricsRegistry};

use super::report;

pub struct SweeperHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Signal the task and wait for it to exit.
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "sweeper task ended abnormally");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Sweep now. Returns how many entries were evicted.
pub fn sweep_once(metrics: &MetricsRegistry, now_ms: u64) -> usize {
    let removed = metrics.sweep_expired(now_ms);
    if removed > 0 {
        report(
            metrics.add_counter(SWEEP_REMOVED_TOTAL, &[], removed as u64),
            SWEEP_REMOVED_TOTAL,
        );
    }
    tracing::debug!(
        removed,
        remaining = metrics.active_window().len(),
        "active-user sweep"
    );
    removed
}

/// Shortest period the sweeper will run at.
pub const MIN_SWEEP_PERIOD: Duration = Duration::from_secs(1);

/// Start the periodic sweep. The first sweep runs immediately. Periods below
/// [`MIN_SWEEP_PERIOD`] (including zero) are raised to it.
pub fn spawn_sweeper(metrics: Arc<MetricsRegistry>, every: Duration) -> SweeperHandle {
    let every = sweep_period(every);
    let (stop_tx, mut stop_rx) = watch::channel(false);

    let task = tokio::spawn(async move {
        let mut tick = tokio::time::interval(every);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(every_ms = every.as_millis() as u64, "active-user sweeper started");

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    sweep_once(&metrics, now_ms());
                }
                changed = stop_rx.changed() => {
                    // A dropped sender counts as a stop request too.
                    if changed.is_err() || *stop_rx.borrow() {
                        break;
                    }
                }
            }
        }
        tracing::info!("active-user sweeper stopped");
    });

    SweeperHandle { stop_tx, task }
}

fn sweep_period(requested: Duration) -> Duration {
    if requested >= MIN_SWEEP_PERIOD {
        return requested;
    }
    tracing::warn!(
        requested_ms = requested.as_millis() as u64,
        min_ms = MIN_SWEEP_PERIOD.as_millis() as u64,
        "sweep period too short, clamped"
    );
    MIN_SWEEP_PERIOD
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_is_floored() {
        assert_eq!(sweep_period(Duration::ZERO), MIN_SWEEP_PERIOD);
        assert_eq!(sweep_period(Duration::from_millis(1)), MIN_SWEEP_PERIOD);
        assert_eq!(sweep_period(MIN_SWEEP_PERIOD), MIN_SWEEP_PERIOD);
        assert_eq!(sweep_period(Duration::from_secs(300)), Duration::from_secs(300));
    }
}

//! Periodic reconciliation task.

use std::sync::Arc;
use std::time::Duration;

use stakeline_ledger::Store;
use stakeline_types::constants;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::reconciler::Reconciler;

/// Handle to a background task running [`Reconciler::reconcile`] on a fixed
/// cadence. The task stops when [`ReconcilerHandle::shutdown`] is called or
/// the handle is dropped.
pub struct ReconcilerHandle {
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl ReconcilerHandle {
    /// Start the loop. The first pass runs immediately.
    #[must_use]
    pub fn spawn<S: Store>(reconciler: Arc<Reconciler<S>>, interval: Duration) -> Self {
        let (stop, mut stopped) = oneshot::channel();
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            tracing::info!(
                engine = constants::ENGINE_NAME,
                version = constants::VERSION,
                interval = ?interval,
                "Reconciler started"
            );

            loop {
                tokio::select! {
                    _ = &mut stopped => break,
                    _ = ticker.tick() => {
                        if let Err(err) = reconciler.reconcile().await {
                            tracing::warn!(error = %err, "Reconciliation pass failed");
                        }
                    }
                }
            }

            tracing::info!("Reconciler stopped");
        });

        Self {
            stop: Some(stop),
            task,
        }
    }

    /// Signal the loop to stop and wait for the in-flight pass to finish.
    pub async fn shutdown(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Err(err) = (&mut self.task).await {
            tracing::warn!(error = %err, "Reconciler task ended abnormally");
        }
    }
}

impl Drop for ReconcilerHandle {
    fn drop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }
}

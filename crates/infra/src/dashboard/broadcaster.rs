use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use shopdesk_analytics::MetricsStore;

use super::hub::DashboardHub;

/// Handle to stop and join the periodic broadcaster.
#[derive(Debug)]
pub struct DashboardBroadcasterHandle {
    shutdown: Option<oneshot::Sender<()>>,
    join: Option<JoinHandle<()>>,
}

impl DashboardBroadcasterHandle {
    /// Signal the task and wait for it to exit. No tick runs after this returns.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(join) = self.join.take() {
            if let Err(err) = join.await {
                warn!(error = %err, "dashboard broadcaster task ended abnormally");
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.join.as_ref().is_none_or(JoinHandle::is_finished)
    }
}

pub(super) fn spawn<S>(hub: Arc<DashboardHub<S>>, interval: Duration) -> DashboardBroadcasterHandle
where
    S: MetricsStore + 'static,
{
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let join = tokio::spawn(broadcast_loop(hub, interval, shutdown_rx));
    DashboardBroadcasterHandle {
        shutdown: Some(shutdown_tx),
        join: Some(join),
    }
}

/// Tick, then sleep `interval`; the sleep races the shutdown signal.
async fn broadcast_loop<S>(
    hub: Arc<DashboardHub<S>>,
    interval: Duration,
    mut shutdown: oneshot::Receiver<()>,
) where
    S: MetricsStore + 'static,
{
    loop {
        hub.tick().await;
        tokio::select! {
            _ = &mut shutdown => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }
    info!("dashboard broadcaster stopped");
}

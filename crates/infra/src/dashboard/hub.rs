use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use thiserror::Error;
use tracing::{debug, info, warn};

use shopdesk_analytics::{BusinessSnapshot, DataAccessError, MetricsAggregator, MetricsStore};

use super::broadcaster::{self, DashboardBroadcasterHandle};
use super::sink::{Subscriber, SubscriberId, SubscriberSendError};

/// Period between the end of one broadcast and the start of the next.
pub const DEFAULT_BROADCAST_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum HubError {
    #[error("dashboard broadcaster already started")]
    AlreadyStarted,

    #[error("snapshot unavailable: {0}")]
    Snapshot(#[from] DataAccessError),

    #[error("failed to deliver snapshot: {0}")]
    Send(#[from] SubscriberSendError),
}

/// Result of one broadcast tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The snapshot could not be computed; subscribers were left untouched.
    Skipped,
    Broadcast { delivered: usize, dropped: usize },
}

/// Subscriber registry plus the snapshot source.
///
/// The subscriber set is only locked for short, non-async sections: a tick copies the
/// set, sends without the lock and re-locks once to remove failed handles.
#[derive(Debug)]
pub struct DashboardHub<S> {
    aggregator: MetricsAggregator<S>,
    subscribers: Mutex<Vec<Subscriber>>,
    started: AtomicBool,
}

impl<S> DashboardHub<S>
where
    S: MetricsStore + 'static,
{
    pub fn new(store: S) -> Self {
        Self {
            aggregator: MetricsAggregator::new(store),
            subscribers: Mutex::new(Vec::new()),
            started: AtomicBool::new(false),
        }
    }

    fn subscribers(&self) -> MutexGuard<'_, Vec<Subscriber>> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers().len()
    }

    /// On-demand snapshot, not broadcast.
    pub async fn snapshot_at(
        &self,
        now: DateTime<Utc>,
    ) -> Result<BusinessSnapshot, DataAccessError> {
        self.aggregator.compute_snapshot(now).await
    }

    /// Register a connection and push one fresh snapshot to it alone.
    ///
    /// The connection's send lock is held from registration until the initial
    /// snapshot is delivered, so a concurrent tick queues behind it. On failure the
    /// connection is unregistered again and the error returned.
    pub async fn subscribe(&self, subscriber: Subscriber) -> Result<SubscriberId, HubError> {
        let id = subscriber.id();
        let sending = subscriber.lock_sends().await;
        {
            let mut subscribers = self.subscribers();
            if !subscribers.contains(&subscriber) {
                subscribers.push(subscriber.clone());
            }
        }
        info!(subscriber = %id, "dashboard subscriber connected");

        let result = match self.aggregator.compute_snapshot(Utc::now()).await {
            Ok(snapshot) => subscriber
                .send_locked(&sending, Arc::new(snapshot))
                .await
                .map_err(HubError::from),
            Err(err) => Err(HubError::from(err)),
        };
        drop(sending);

        match result {
            Ok(()) => Ok(id),
            Err(err) => {
                warn!(subscriber = %id, error = %err, "initial snapshot failed");
                self.unsubscribe(id);
                Err(err)
            }
        }
    }

    /// Remove a connection. Returns whether it was registered.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let removed = {
            let mut subscribers = self.subscribers();
            let before = subscribers.len();
            subscribers.retain(|s| s.id() != id);
            subscribers.len() != before
        };
        if removed {
            info!(subscriber = %id, "dashboard subscriber disconnected");
        }
        removed
    }

    pub async fn tick(&self) -> TickOutcome {
        self.tick_at(Utc::now()).await
    }

    /// Compute one snapshot and push the same instance to every current subscriber.
    pub async fn tick_at(&self, now: DateTime<Utc>) -> TickOutcome {
        let snapshot = match self.aggregator.compute_snapshot(now).await {
            Ok(snapshot) => Arc::new(snapshot),
            Err(err) => {
                warn!(error = %err, "skipping dashboard broadcast");
                return TickOutcome::Skipped;
            }
        };

        let targets: Vec<Subscriber> = self.subscribers().clone();
        let results = join_all(targets.iter().map(|subscriber| {
            let snapshot = Arc::clone(&snapshot);
            async move { (subscriber.id(), subscriber.send(snapshot).await) }
        }))
        .await;

        let failed: Vec<SubscriberId> = results
            .into_iter()
            .filter_map(|(id, result)| match result {
                Ok(()) => None,
                Err(err) => {
                    warn!(subscriber = %id, error = %err, "dropping dashboard subscriber");
                    Some(id)
                }
            })
            .collect();

        if !failed.is_empty() {
            self.subscribers().retain(|s| !failed.contains(&s.id()));
        }

        let delivered = targets.len() - failed.len();
        let dropped = failed.len();
        debug!(delivered, dropped, "dashboard broadcast");
        TickOutcome::Broadcast { delivered, dropped }
    }

    /// Start the periodic broadcaster. Only one may ever run per hub.
    pub fn start(
        self: &Arc<Self>,
        interval: Duration,
    ) -> Result<DashboardBroadcasterHandle, HubError> {
        if self
            .started
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(HubError::AlreadyStarted);
        }
        info!(interval_secs = interval.as_secs_f64(), "starting dashboard broadcaster");
        Ok(broadcaster::spawn(Arc::clone(self), interval))
    }
}

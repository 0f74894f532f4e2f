use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex, MutexGuard};
use uuid::Uuid;

use shopdesk_analytics::BusinessSnapshot;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SubscriberSendError {
    #[error("subscriber connection closed")]
    Closed,

    #[error("subscriber did not accept the snapshot within {0:?}")]
    TimedOut(Duration),
}

/// Identity of a dashboard connection.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct SubscriberId(Uuid);

impl SubscriberId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Destination of snapshot pushes for one connection.
#[async_trait]
pub trait SnapshotSink: Send + Sync {
    async fn send(&self, snapshot: Arc<BusinessSnapshot>) -> Result<(), SubscriberSendError>;
}

/// Registered connection. Equality is by id only.
///
/// Clones share one send lock, so a connection never has two sends in flight.
#[derive(Clone)]
pub struct Subscriber {
    id: SubscriberId,
    sink: Arc<dyn SnapshotSink>,
    send_lock: Arc<Mutex<()>>,
}

impl Subscriber {
    pub fn new(sink: Arc<dyn SnapshotSink>) -> Self {
        Self::with_id(SubscriberId::new(), sink)
    }

    pub fn with_id(id: SubscriberId, sink: Arc<dyn SnapshotSink>) -> Self {
        Self {
            id,
            sink,
            send_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn id(&self) -> SubscriberId {
        self.id
    }

    pub(crate) async fn send(
        &self,
        snapshot: Arc<BusinessSnapshot>,
    ) -> Result<(), SubscriberSendError> {
        let guard = self.lock_sends().await;
        self.send_locked(&guard, snapshot).await
    }

    /// Blocks every other send to this connection until the guard drops.
    pub(crate) async fn lock_sends(&self) -> MutexGuard<'_, ()> {
        self.send_lock.lock().await
    }

    pub(crate) async fn send_locked(
        &self,
        _guard: &MutexGuard<'_, ()>,
        snapshot: Arc<BusinessSnapshot>,
    ) -> Result<(), SubscriberSendError> {
        self.sink.send(snapshot).await
    }
}

impl PartialEq for Subscriber {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Subscriber {}

impl fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber").field("id", &self.id).finish()
    }
}

/// Sink backed by a bounded channel drained by the connection's writer task.
///
/// A full channel that stays full for longer than the timeout fails the send.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<Arc<BusinessSnapshot>>,
    timeout: Duration,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<Arc<BusinessSnapshot>>, timeout: Duration) -> Self {
        Self { tx, timeout }
    }

    /// Sink plus the receiving end for the writer task.
    pub fn channel(
        capacity: usize,
        timeout: Duration,
    ) -> (Self, mpsc::Receiver<Arc<BusinessSnapshot>>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx, timeout), rx)
    }
}

#[async_trait]
impl SnapshotSink for ChannelSink {
    async fn send(&self, snapshot: Arc<BusinessSnapshot>) -> Result<(), SubscriberSendError> {
        self.tx
            .send_timeout(snapshot, self.timeout)
            .await
            .map_err(|e| match e {
                mpsc::error::SendTimeoutError::Timeout(_) => {
                    SubscriberSendError::TimedOut(self.timeout)
                }
                mpsc::error::SendTimeoutError::Closed(_) => SubscriberSendError::Closed,
            })
    }
}

//! Live dashboard fan-out.
//!
//! [`DashboardHub`] owns the subscriber set and turns a [`MetricsAggregator`] snapshot
//! into one push per subscriber; [`DashboardBroadcasterHandle`] controls the periodic
//! task started with [`DashboardHub::start`].
//!
//! [`MetricsAggregator`]: shopdesk_analytics::MetricsAggregator

mod broadcaster;
mod hub;
mod sink;

pub use broadcaster::DashboardBroadcasterHandle;
pub use hub::{DashboardHub, HubError, TickOutcome, DEFAULT_BROADCAST_INTERVAL};
pub use sink::{ChannelSink, SnapshotSink, Subscriber, SubscriberId, SubscriberSendError};

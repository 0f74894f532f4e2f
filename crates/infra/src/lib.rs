//! Infrastructure layer: stores, database wiring and the live dashboard hub.

pub mod dashboard;
pub mod db;
pub mod store;

pub use dashboard::{
    ChannelSink, DashboardBroadcasterHandle, DashboardHub, HubError, SnapshotSink, Subscriber,
    SubscriberId, SubscriberSendError, TickOutcome, DEFAULT_BROADCAST_INTERVAL,
};
pub use db::{connect, DbError, PoolConfig};
pub use store::{
    InMemoryStore, InventoryHistoryEntry, InventoryRepository, Page, PostgresStore,
    ProductRepository, SaleRepository, SharedStore, ShopStore, StoreError, StoreResult,
};

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use shopdesk_infra::{
    db, DashboardBroadcasterHandle, DashboardHub, DbError, HubError, InMemoryStore, PoolConfig,
    PostgresStore, SharedStore,
};

use crate::config::{ApiConfig, DEFAULT_SEND_TIMEOUT_MS};

/// Shared state behind every handler.
pub struct AppServices {
    pub store: SharedStore,
    pub hub: Arc<DashboardHub<SharedStore>>,
    /// Bound on a single snapshot push to one dashboard connection.
    pub send_timeout: Duration,
}

impl AppServices {
    pub fn new(store: SharedStore, send_timeout: Duration) -> Self {
        let hub = Arc::new(DashboardHub::new(Arc::clone(&store)));
        Self {
            store,
            hub,
            send_timeout,
        }
    }

    /// Fresh, empty in-memory store (dev and tests).
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryStore::new()),
            Duration::from_millis(DEFAULT_SEND_TIMEOUT_MS),
        )
    }

    /// Postgres when `DATABASE_URL` is configured, otherwise in-memory.
    pub async fn from_config(config: &ApiConfig) -> Result<Self, DbError> {
        let store: SharedStore = match &config.database_url {
            Some(url) => {
                let pool_config =
                    PoolConfig::new(url.clone()).with_max_connections(config.db_max_connections);
                let pool = db::connect(&pool_config).await?;
                info!("using postgres store");
                Arc::new(PostgresStore::new(pool))
            }
            None => {
                info!("DATABASE_URL not set; using in-memory store");
                Arc::new(InMemoryStore::new())
            }
        };
        Ok(Self::new(store, config.send_timeout))
    }

    /// Start the periodic dashboard broadcast.
    pub fn start_dashboard(
        &self,
        interval: Duration,
    ) -> Result<DashboardBroadcasterHandle, HubError> {
        self.hub.start(interval)
    }
}

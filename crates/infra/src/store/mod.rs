//! Persistence for products, sales and inventory.
//!
//! Two implementations share the same contracts:
//! - [`InMemoryStore`]: dev/tests, no external services
//! - [`PostgresStore`]: sqlx-backed, schema in `migrations/`
//!
//! Both also implement the read-side traits of `shopdesk-analytics`, so a single
//! store handle feeds the CRUD routes, the insights and the dashboard hub.

mod in_memory;
mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use shopdesk_analytics::{DataAccessError, InsightsStore, MetricsStore};
use shopdesk_core::{DomainError, DomainResult, ProductId, SaleId};
use shopdesk_inventory::{InventoryPatch, InventoryRecord, NewInventory};
use shopdesk_products::{NewProduct, Product, ProductPatch};
use shopdesk_sales::{NewSale, Sale};

pub use in_memory::InMemoryStore;
pub use postgres::PostgresStore;

/// Default page size for list endpoints.
pub const DEFAULT_PAGE_LIMIT: i64 = 100;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("unknown reference: {0}")]
    UnknownReference(String),

    #[error(transparent)]
    Validation(#[from] DomainError),

    #[error(transparent)]
    DataAccess(#[from] DataAccessError),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Offset pagination (`skip`/`limit`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub skip: i64,
    pub limit: i64,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl Page {
    pub fn new(skip: Option<i64>, limit: Option<i64>) -> DomainResult<Self> {
        let page = Self {
            skip: skip.unwrap_or(0),
            limit: limit.unwrap_or(DEFAULT_PAGE_LIMIT),
        };
        if page.skip < 0 {
            return Err(DomainError::validation("skip must not be negative"));
        }
        if page.limit < 0 {
            return Err(DomainError::validation("limit must not be negative"));
        }
        Ok(page)
    }

    pub(crate) fn bounds(&self) -> (usize, usize) {
        (self.skip as usize, self.limit as usize)
    }
}

/// One entry of a product's stock history, joined with the product name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryHistoryEntry {
    pub product_name: String,
    pub quantity: i64,
    pub recorded_at: DateTime<Utc>,
}

#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn create_product(&self, input: NewProduct) -> StoreResult<Product>;

    async fn get_product(&self, id: ProductId) -> StoreResult<Product>;

    async fn list_products(&self, page: Page) -> StoreResult<Vec<Product>>;

    async fn update_product(&self, id: ProductId, patch: ProductPatch) -> StoreResult<Product>;

    /// Fails with `Conflict` while sales or inventory still reference the product.
    async fn delete_product(&self, id: ProductId) -> StoreResult<()>;
}

#[async_trait]
pub trait SaleRepository: Send + Sync {
    /// Fails with `UnknownReference` when the product does not exist.
    async fn create_sale(&self, input: NewSale) -> StoreResult<Sale>;

    async fn get_sale(&self, id: SaleId) -> StoreResult<Sale>;

    async fn list_sales(&self, page: Page) -> StoreResult<Vec<Sale>>;
}

#[async_trait]
pub trait InventoryRepository: Send + Sync {
    /// Creates the product's record and its first history entry.
    async fn create_inventory(&self, input: NewInventory) -> StoreResult<InventoryRecord>;

    async fn list_inventory(&self, page: Page) -> StoreResult<Vec<InventoryRecord>>;

    async fn get_inventory_by_product(&self, product_id: ProductId)
    -> StoreResult<InventoryRecord>;

    /// Applies the patch, stamps `last_updated` and appends a history entry.
    async fn update_inventory(
        &self,
        product_id: ProductId,
        patch: InventoryPatch,
    ) -> StoreResult<InventoryRecord>;

    /// History within the inclusive bounds, newest first.
    async fn list_inventory_changes(
        &self,
        product_id: ProductId,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> StoreResult<Vec<InventoryHistoryEntry>>;
}

/// Everything the application needs from a store.
pub trait ShopStore:
    ProductRepository + SaleRepository + InventoryRepository + MetricsStore + InsightsStore
{
}

impl<T> ShopStore for T where
    T: ProductRepository + SaleRepository + InventoryRepository + MetricsStore + InsightsStore
{
}

/// Shared, type-erased store handle.
pub type SharedStore = Arc<dyn ShopStore>;

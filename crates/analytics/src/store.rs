//! Read-side store contracts consumed by the aggregator and the insights.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use shopdesk_core::ProductId;

use crate::error::DataAccessError;

/// Inventory row at or below its threshold, joined with its product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LowStockRow {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: i64,
    pub threshold: i64,
}

/// Per-product sales aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopSellerRow {
    pub product_id: ProductId,
    pub product_name: String,
    pub units_sold: i64,
    pub revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySalesRow {
    pub date: NaiveDate,
    pub sales: f64,
    pub orders: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySalesRow {
    pub category: String,
    pub orders: i64,
    pub revenue: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SalesTotals {
    pub revenue: f64,
    pub count: i64,
}

/// Stock level of a product plus the number of its sales in a window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockVelocityRow {
    pub product_id: ProductId,
    pub product_name: String,
    pub category: String,
    pub quantity: i64,
    pub threshold: i64,
    pub sales_count: i64,
}

/// Queries the metrics aggregator needs.
#[async_trait]
pub trait MetricsStore: Send + Sync {
    /// Sum of `total_amount` over sales with `sale_date` in `[start, end)`; 0 when none.
    async fn sum_sale_amounts(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<f64, DataAccessError>;

    /// Every inventory row with `quantity <= threshold`, ascending inventory id.
    async fn list_low_stock_inventory(&self) -> Result<Vec<LowStockRow>, DataAccessError>;

    /// Products sold since `start`, descending revenue (ties by ascending product id),
    /// at most `limit` rows.
    async fn top_selling_products_since(
        &self,
        start: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<TopSellerRow>, DataAccessError>;
}

/// Queries backing the insight endpoints.
#[async_trait]
pub trait InsightsStore: Send + Sync {
    /// Sales since `start` grouped by calendar day (UTC), ascending date.
    async fn daily_sales_since(
        &self,
        start: DateTime<Utc>,
    ) -> Result<Vec<DailySalesRow>, DataAccessError>;

    /// Sales grouped by product category, ascending category. Bounds are inclusive.
    async fn category_sales(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<CategorySalesRow>, DataAccessError>;

    /// Revenue and count of sales within the inclusive bounds.
    async fn sales_totals(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<SalesTotals, DataAccessError>;

    /// One row per product with inventory, counting that product's sales since `start`.
    async fn stock_velocity_since(
        &self,
        start: DateTime<Utc>,
    ) -> Result<Vec<StockVelocityRow>, DataAccessError>;
}

#[async_trait]
impl<S: MetricsStore + ?Sized> MetricsStore for Arc<S> {
    async fn sum_sale_amounts(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<f64, DataAccessError> {
        (**self).sum_sale_amounts(start, end).await
    }

    async fn list_low_stock_inventory(&self) -> Result<Vec<LowStockRow>, DataAccessError> {
        (**self).list_low_stock_inventory().await
    }

    async fn top_selling_products_since(
        &self,
        start: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<TopSellerRow>, DataAccessError> {
        (**self).top_selling_products_since(start, limit).await
    }
}

#[async_trait]
impl<S: InsightsStore + ?Sized> InsightsStore for Arc<S> {
    async fn daily_sales_since(
        &self,
        start: DateTime<Utc>,
    ) -> Result<Vec<DailySalesRow>, DataAccessError> {
        (**self).daily_sales_since(start).await
    }

    async fn category_sales(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<CategorySalesRow>, DataAccessError> {
        (**self).category_sales(start, end).await
    }

    async fn sales_totals(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<SalesTotals, DataAccessError> {
        (**self).sales_totals(start, end).await
    }

    async fn stock_velocity_since(
        &self,
        start: DateTime<Utc>,
    ) -> Result<Vec<StockVelocityRow>, DataAccessError> {
        (**self).stock_velocity_since(start).await
    }
}

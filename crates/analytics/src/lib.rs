//! `shopdesk-analytics`: derived business metrics.
//!
//! - `aggregator`: computes the dashboard [`BusinessSnapshot`] from a [`MetricsStore`].
//! - `insights`: sales trends, category performance, stock depletion estimates and
//!   revenue comparisons over an [`InsightsStore`].
//!
//! Storage is reached only through the traits in `store`; this crate performs no IO itself.

pub mod aggregator;
pub mod error;
pub mod insights;
pub mod snapshot;
pub mod store;

pub use aggregator::{growth_percentage, rank_top_sellers, MetricsAggregator, TOP_PERFORMER_LIMIT};
pub use error::DataAccessError;
pub use insights::{
    category_performance, revenue_comparison, sales_summary, sales_trends, stock_insights,
    validate_trend_days, CategoryPerformance, DailyBreakdown, DaysRemaining, RevenueComparison,
    SalesSummary, SalesTrends, StockInsight, INSIGHT_WINDOW_DAYS, MAX_TREND_DAYS,
};
pub use snapshot::{BusinessSnapshot, DailySnapshot, InventoryAlert, TopPerformer};
pub use store::{
    CategorySalesRow, DailySalesRow, InsightsStore, LowStockRow, MetricsStore, SalesTotals,
    StockVelocityRow, TopSellerRow,
};

//! Metrics aggregation for the live dashboard.

use std::cmp::Ordering;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use shopdesk_core::{percent_change, round_to};
use shopdesk_sales::start_of_day;

use crate::error::DataAccessError;
use crate::snapshot::{BusinessSnapshot, DailySnapshot, InventoryAlert, TopPerformer};
use crate::store::{MetricsStore, TopSellerRow};

/// Maximum number of top performers in a snapshot.
pub const TOP_PERFORMER_LIMIT: usize = 5;

/// Day-over-day growth in percent, rounded to one decimal; 0 when yesterday had no sales.
pub fn growth_percentage(today: f64, yesterday: f64) -> f64 {
    if yesterday == 0.0 {
        return 0.0;
    }
    round_to(percent_change(today, yesterday), 1)
}

/// Order sellers by revenue descending, then product id ascending, keeping at most `limit`.
pub fn rank_top_sellers(
    rows: impl IntoIterator<Item = TopSellerRow>,
    limit: usize,
) -> Vec<TopSellerRow> {
    let mut rows: Vec<TopSellerRow> = rows.into_iter().collect();
    rows.sort_by(|a, b| match b.revenue.total_cmp(&a.revenue) {
        Ordering::Equal => a.product_id.cmp(&b.product_id),
        other => other,
    });
    rows.truncate(limit);
    rows
}

/// Builds [`BusinessSnapshot`]s from a [`MetricsStore`].
///
/// Stateless apart from the store handle; every call reads fresh data and no call retries.
#[derive(Debug, Clone)]
pub struct MetricsAggregator<S> {
    store: S,
}

impl<S: MetricsStore> MetricsAggregator<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Compute the snapshot as of `now` (UTC calendar days).
    pub async fn compute_snapshot(
        &self,
        now: DateTime<Utc>,
    ) -> Result<BusinessSnapshot, DataAccessError> {
        let today = start_of_day(now);
        let yesterday = today - Duration::days(1);

        let today_sales = self.store.sum_sale_amounts(today, now).await?;
        let yesterday_sales = self.store.sum_sale_amounts(yesterday, today).await?;

        let inventory_alerts = self
            .store
            .list_low_stock_inventory()
            .await?
            .into_iter()
            .map(|row| InventoryAlert {
                product: row.product_name,
                current_stock: row.quantity,
                min_required: row.threshold,
            })
            .collect::<Vec<_>>();

        let sellers = self
            .store
            .top_selling_products_since(today, TOP_PERFORMER_LIMIT)
            .await?;
        let top_performers = rank_top_sellers(sellers, TOP_PERFORMER_LIMIT)
            .into_iter()
            .map(|row| TopPerformer {
                product: row.product_name,
                units_sold: row.units_sold,
                revenue: row.revenue,
            })
            .collect::<Vec<_>>();

        debug!(
            today_sales,
            yesterday_sales,
            alerts = inventory_alerts.len(),
            top = top_performers.len(),
            "computed business snapshot"
        );

        Ok(BusinessSnapshot {
            generated_at: now,
            daily: DailySnapshot {
                today_sales,
                yesterday_sales,
                growth: growth_percentage(today_sales, yesterday_sales),
            },
            inventory_alerts,
            top_performers,
        })
    }
}

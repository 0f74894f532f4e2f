//! Business insights derived from sales and stock history.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use shopdesk_core::{percent_change, round_to, DomainError, DomainResult};
use shopdesk_inventory::StockStatus;
use shopdesk_sales::RevenuePeriod;

use crate::error::DataAccessError;
use crate::store::{InsightsStore, MetricsStore};

/// Look-back window of the category and stock insights.
pub const INSIGHT_WINDOW_DAYS: i64 = 30;

/// Upper bound accepted for the sales-trend window.
pub const MAX_TREND_DAYS: i64 = 366;

pub fn validate_trend_days(days: i64) -> DomainResult<i64> {
    if !(1..=MAX_TREND_DAYS).contains(&days) {
        return Err(DomainError::validation(format!(
            "days must be between 1 and {MAX_TREND_DAYS}"
        )));
    }
    Ok(days)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesTrends {
    pub period: String,
    pub daily_breakdown: Vec<DailyBreakdown>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyBreakdown {
    /// `YYYY-MM-DD`
    pub date: String,
    pub sales: f64,
    pub orders: i64,
}

/// Daily sales over the last `days` days (callers validate with [`validate_trend_days`]).
pub async fn sales_trends<S: InsightsStore + ?Sized>(
    store: &S,
    now: DateTime<Utc>,
    days: i64,
) -> Result<SalesTrends, DataAccessError> {
    let rows = store.daily_sales_since(now - Duration::days(days)).await?;
    Ok(SalesTrends {
        period: format!("Last {days} days"),
        daily_breakdown: rows
            .into_iter()
            .map(|row| DailyBreakdown {
                date: row.date.format("%Y-%m-%d").to_string(),
                sales: row.sales,
                orders: row.orders,
            })
            .collect(),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryPerformance {
    pub category: String,
    pub orders: i64,
    pub revenue: f64,
    pub avg_order_value: f64,
}

/// Per-category orders and revenue over the last 30 days.
pub async fn category_performance<S: InsightsStore + ?Sized>(
    store: &S,
    now: DateTime<Utc>,
) -> Result<Vec<CategoryPerformance>, DataAccessError> {
    let since = now - Duration::days(INSIGHT_WINDOW_DAYS);
    let rows = store.category_sales(Some(since), None).await?;
    Ok(rows
        .into_iter()
        .map(|row| CategoryPerformance {
            avg_order_value: if row.orders > 0 {
                round_to(row.revenue / row.orders as f64, 2)
            } else {
                0.0
            },
            category: row.category,
            orders: row.orders,
            revenue: row.revenue,
        })
        .collect())
}

/// Estimated days until a product runs out at its recent sales pace.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DaysRemaining {
    Days(f64),
    /// No sales in the window, so no depletion rate.
    Undetermined,
}

impl DaysRemaining {
    /// `quantity / (window_sales / 30)` rounded to one decimal.
    pub fn estimate(quantity: i64, window_sales: i64) -> Self {
        if window_sales <= 0 {
            return DaysRemaining::Undetermined;
        }
        let per_day = window_sales as f64 / INSIGHT_WINDOW_DAYS as f64;
        DaysRemaining::Days(round_to(quantity as f64 / per_day, 1))
    }
}

const UNDETERMINED: &str = "undetermined";

impl Serialize for DaysRemaining {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            DaysRemaining::Days(days) => serializer.serialize_f64(*days),
            DaysRemaining::Undetermined => serializer.serialize_str(UNDETERMINED),
        }
    }
}

impl<'de> Deserialize<'de> for DaysRemaining {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Days(f64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Days(days) => Ok(DaysRemaining::Days(days)),
            Raw::Text(text) if text == UNDETERMINED => Ok(DaysRemaining::Undetermined),
            Raw::Text(other) => Err(serde::de::Error::custom(format!(
                "expected a number or \"{UNDETERMINED}\", got \"{other}\""
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockInsight {
    pub product: String,
    pub category: String,
    pub current_stock: i64,
    pub monthly_sales: i64,
    pub status: StockStatus,
    pub estimated_days_left: DaysRemaining,
}

/// Stock level, status and depletion estimate for every product with inventory.
pub async fn stock_insights<S: InsightsStore + ?Sized>(
    store: &S,
    now: DateTime<Utc>,
) -> Result<Vec<StockInsight>, DataAccessError> {
    let since = now - Duration::days(INSIGHT_WINDOW_DAYS);
    let rows = store.stock_velocity_since(since).await?;
    Ok(rows
        .into_iter()
        .map(|row| StockInsight {
            status: StockStatus::classify(row.quantity, row.threshold),
            estimated_days_left: DaysRemaining::estimate(row.quantity, row.sales_count),
            product: row.product_name,
            category: row.category,
            current_stock: row.quantity,
            monthly_sales: row.sales_count,
        })
        .collect())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueComparison {
    pub period: RevenuePeriod,
    pub current_revenue: f64,
    pub previous_revenue: f64,
    pub change_percentage: f64,
}

/// Revenue of the current period (open-ended) against the whole previous period.
pub async fn revenue_comparison<S: MetricsStore + InsightsStore + ?Sized>(
    store: &S,
    period: RevenuePeriod,
    now: DateTime<Utc>,
) -> Result<RevenueComparison, DataAccessError> {
    let windows = period.windows(now);
    let current = store.sales_totals(Some(windows.current_start), None).await?;
    let previous_revenue = store
        .sum_sale_amounts(windows.previous_start, windows.current_start)
        .await?;

    Ok(RevenueComparison {
        period,
        current_revenue: current.revenue,
        previous_revenue,
        change_percentage: percent_change(current.revenue, previous_revenue),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesSummary {
    pub total_revenue: f64,
    pub total_sales: i64,
    pub average_order_value: f64,
}

/// Totals over the inclusive `[start, end]` range.
pub async fn sales_summary<S: InsightsStore + ?Sized>(
    store: &S,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Result<SalesSummary, DataAccessError> {
    let totals = store.sales_totals(start, end).await?;
    Ok(SalesSummary {
        total_revenue: totals.revenue,
        total_sales: totals.count,
        average_order_value: if totals.count > 0 {
            totals.revenue / totals.count as f64
        } else {
            0.0
        },
    })
}

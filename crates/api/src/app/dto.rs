use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::Deserialize;

use shopdesk_analytics::{CategorySalesRow, LowStockRow};
use shopdesk_core::ProductId;
use shopdesk_infra::{InventoryHistoryEntry, Page};
use shopdesk_inventory::InventoryRecord;
use shopdesk_products::Product;
use shopdesk_sales::Sale;

use crate::app::errors;

// -------------------------
// Query parameters
// -------------------------

#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

impl PageParams {
    pub fn page(&self) -> Result<Page, axum::response::Response> {
        Page::new(self.skip, self.limit).map_err(errors::domain_error_to_response)
    }
}

/// Optional inclusive date range (`start_date`, `end_date`).
#[derive(Debug, Default, Deserialize)]
pub struct DateRangeParams {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl DateRangeParams {
    pub fn bounds(
        &self,
    ) -> Result<(Option<DateTime<Utc>>, Option<DateTime<Utc>>), axum::response::Response> {
        let start = self.start_date.as_deref().map(parse_datetime).transpose()?;
        let end = self.end_date.as_deref().map(parse_datetime).transpose()?;
        Ok((start, end))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PeriodParams {
    pub period: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TrendParams {
    pub days: Option<i64>,
}

/// Accepts RFC 3339, a naive `YYYY-MM-DDTHH:MM:SS[.f]` (taken as UTC) or a bare date
/// (midnight UTC).
pub fn parse_datetime(raw: &str) -> Result<DateTime<Utc>, axum::response::Response> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN).and_utc());
    }
    Err(errors::json_error(
        axum::http::StatusCode::BAD_REQUEST,
        "invalid_datetime",
        format!("'{raw}' is not a valid date or datetime"),
    ))
}

pub fn parse_product_id(raw: &str) -> Result<ProductId, axum::response::Response> {
    raw.parse::<ProductId>().map_err(|_| {
        errors::json_error(
            axum::http::StatusCode::BAD_REQUEST,
            "invalid_id",
            "invalid product id",
        )
    })
}

// -------------------------
// JSON mapping helpers
// -------------------------

pub fn product_to_json(p: &Product) -> serde_json::Value {
    serde_json::json!({
        "id": p.id,
        "name": p.name,
        "description": p.description,
        "category": p.category,
        "price": p.price,
        "created_at": p.created_at,
        "updated_at": p.updated_at,
    })
}

pub fn sale_to_json(s: &Sale) -> serde_json::Value {
    serde_json::json!({
        "id": s.id,
        "product_id": s.product_id,
        "quantity": s.quantity,
        "total_amount": s.total_amount,
        "sale_date": s.sale_date,
        "created_at": s.created_at,
        "updated_at": s.updated_at,
    })
}

pub fn inventory_to_json(r: &InventoryRecord) -> serde_json::Value {
    serde_json::json!({
        "id": r.id,
        "product_id": r.product_id,
        "quantity": r.quantity,
        "low_stock_threshold": r.low_stock_threshold,
        "last_updated": r.last_updated,
        "created_at": r.created_at,
        "updated_at": r.updated_at,
    })
}

pub fn low_stock_to_json(row: &LowStockRow) -> serde_json::Value {
    serde_json::json!({
        "product_id": row.product_id,
        "product_name": row.product_name,
        "current_quantity": row.quantity,
        "threshold": row.threshold,
    })
}

pub fn inventory_change_to_json(entry: &InventoryHistoryEntry) -> serde_json::Value {
    serde_json::json!({
        "product_name": entry.product_name,
        "quantity": entry.quantity,
        "updated_at": entry.recorded_at,
    })
}

pub fn category_sales_to_json(row: &CategorySalesRow) -> serde_json::Value {
    serde_json::json!({
        "category": row.category,
        "total_revenue": row.revenue,
        "total_sales": row.orders,
    })
}

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Extension, Path, Query,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::Utc;

use shopdesk_analytics::{revenue_comparison, sales_summary, InsightsStore};
use shopdesk_core::SaleId;
use shopdesk_infra::SaleRepository;
use shopdesk_sales::{NewSale, RevenuePeriod};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_sales).post(create_sale))
        .route("/analytics", get(sales_analytics))
        .route("/revenue/comparison", get(compare_revenue))
        .route("/by-category", get(sales_by_category))
        .route("/:id", get(get_sale))
}

pub async fn list_sales(
    Extension(services): Extension<Arc<AppServices>>,
    params: Result<Query<dto::PageParams>, QueryRejection>,
) -> axum::response::Response {
    let Query(params) = match params {
        Ok(p) => p,
        Err(rej) => return errors::query_rejection(rej),
    };
    let page = match params.page() {
        Ok(p) => p,
        Err(resp) => return resp,
    };

    match services.store.list_sales(page).await {
        Ok(sales) => Json(sales.iter().map(dto::sale_to_json).collect::<Vec<_>>()).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn create_sale(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<NewSale>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rej) => return errors::json_rejection(rej),
    };

    match services.store.create_sale(body).await {
        Ok(sale) => (StatusCode::CREATED, Json(dto::sale_to_json(&sale))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_sale(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match id.parse::<SaleId>() {
        Ok(v) => v,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid sale id")
        }
    };

    match services.store.get_sale(id).await {
        Ok(sale) => Json(dto::sale_to_json(&sale)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn sales_analytics(
    Extension(services): Extension<Arc<AppServices>>,
    params: Result<Query<dto::DateRangeParams>, QueryRejection>,
) -> axum::response::Response {
    let Query(params) = match params {
        Ok(p) => p,
        Err(rej) => return errors::query_rejection(rej),
    };
    let (start, end) = match params.bounds() {
        Ok(b) => b,
        Err(resp) => return resp,
    };

    match sales_summary(services.store.as_ref(), start, end).await {
        Ok(summary) => Json(summary).into_response(),
        Err(e) => errors::data_access_error_to_response(e),
    }
}

pub async fn compare_revenue(
    Extension(services): Extension<Arc<AppServices>>,
    params: Result<Query<dto::PeriodParams>, QueryRejection>,
) -> axum::response::Response {
    let Query(params) = match params {
        Ok(p) => p,
        Err(rej) => return errors::query_rejection(rej),
    };
    let period = match params.period.as_deref() {
        None => RevenuePeriod::Daily,
        Some(raw) => match raw.parse::<RevenuePeriod>() {
            Ok(p) => p,
            Err(e) => {
                return errors::json_error(StatusCode::BAD_REQUEST, "invalid_period", e.to_string())
            }
        },
    };

    match revenue_comparison(services.store.as_ref(), period, Utc::now()).await {
        Ok(comparison) => Json(comparison).into_response(),
        Err(e) => errors::data_access_error_to_response(e),
    }
}

pub async fn sales_by_category(
    Extension(services): Extension<Arc<AppServices>>,
    params: Result<Query<dto::DateRangeParams>, QueryRejection>,
) -> axum::response::Response {
    let Query(params) = match params {
        Ok(p) => p,
        Err(rej) => return errors::query_rejection(rej),
    };
    let (start, end) = match params.bounds() {
        Ok(b) => b,
        Err(resp) => return resp,
    };

    match services.store.category_sales(start, end).await {
        Ok(rows) => {
            let body: Vec<_> = rows.iter().map(dto::category_sales_to_json).collect();
            Json(body).into_response()
        }
        Err(e) => errors::data_access_error_to_response(e),
    }
}

use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Extension, Query},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::Utc;

use shopdesk_analytics::{category_performance, sales_trends, stock_insights, validate_trend_days};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

const DEFAULT_TREND_DAYS: i64 = 7;

pub fn router() -> Router {
    Router::new()
        .route("/sales-trends", get(get_sales_trends))
        .route("/category-performance", get(get_category_performance))
        .route("/stock-management", get(get_stock_management))
}

pub async fn get_sales_trends(
    Extension(services): Extension<Arc<AppServices>>,
    params: Result<Query<dto::TrendParams>, QueryRejection>,
) -> axum::response::Response {
    let Query(params) = match params {
        Ok(p) => p,
        Err(rej) => return errors::query_rejection(rej),
    };
    let days = match validate_trend_days(params.days.unwrap_or(DEFAULT_TREND_DAYS)) {
        Ok(d) => d,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match sales_trends(services.store.as_ref(), Utc::now(), days).await {
        Ok(trends) => Json(trends).into_response(),
        Err(e) => errors::data_access_error_to_response(e),
    }
}

pub async fn get_category_performance(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match category_performance(services.store.as_ref(), Utc::now()).await {
        Ok(rows) => Json(rows).into_response(),
        Err(e) => errors::data_access_error_to_response(e),
    }
}

pub async fn get_stock_management(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match stock_insights(services.store.as_ref(), Utc::now()).await {
        Ok(rows) => Json(rows).into_response(),
        Err(e) => errors::data_access_error_to_response(e),
    }
}

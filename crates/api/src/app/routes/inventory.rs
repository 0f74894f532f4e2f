use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Extension, Path, Query,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};

use shopdesk_analytics::MetricsStore;
use shopdesk_infra::InventoryRepository;
use shopdesk_inventory::{InventoryPatch, NewInventory};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_inventory).post(create_inventory))
        .route("/low-stock", get(low_stock))
        .route("/changes/:product_id", get(inventory_changes))
        .route("/:product_id", put(update_inventory))
}

pub async fn list_inventory(
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

    match services.store.list_inventory(page).await {
        Ok(records) => {
            Json(records.iter().map(dto::inventory_to_json).collect::<Vec<_>>()).into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn create_inventory(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<NewInventory>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rej) => return errors::json_rejection(rej),
    };

    match services.store.create_inventory(body).await {
        Ok(record) => (StatusCode::CREATED, Json(dto::inventory_to_json(&record))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn low_stock(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.store.list_low_stock_inventory().await {
        Ok(rows) => {
            let body: Vec<_> = rows.iter().map(dto::low_stock_to_json).collect();
            Json(body).into_response()
        }
        Err(e) => errors::data_access_error_to_response(e),
    }
}

pub async fn update_inventory(
    Extension(services): Extension<Arc<AppServices>>,
    Path(product_id): Path<String>,
    body: Result<Json<InventoryPatch>, JsonRejection>,
) -> axum::response::Response {
    let product_id = match dto::parse_product_id(&product_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Json(patch) = match body {
        Ok(b) => b,
        Err(rej) => return errors::json_rejection(rej),
    };

    match services.store.update_inventory(product_id, patch).await {
        Ok(record) => Json(dto::inventory_to_json(&record)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn inventory_changes(
    Extension(services): Extension<Arc<AppServices>>,
    Path(product_id): Path<String>,
    params: Result<Query<dto::DateRangeParams>, QueryRejection>,
) -> axum::response::Response {
    let product_id = match dto::parse_product_id(&product_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Query(params) = match params {
        Ok(p) => p,
        Err(rej) => return errors::query_rejection(rej),
    };
    let (start, end) = match params.bounds() {
        Ok(b) => b,
        Err(resp) => return resp,
    };

    match services
        .store
        .list_inventory_changes(product_id, start, end)
        .await
    {
        Ok(entries) => Json(serde_json::json!({
            "product_id": product_id,
            "changes": entries.iter().map(dto::inventory_change_to_json).collect::<Vec<_>>(),
        }))
        .into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

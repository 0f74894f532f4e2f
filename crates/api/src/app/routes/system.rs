use axum::{http::StatusCode, response::IntoResponse, Json};

use crate::app::API_PREFIX;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn root() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": "shopdesk",
        "version": env!("CARGO_PKG_VERSION"),
        "docs": API_PREFIX,
        "features": [
            "Live Dashboard",
            "Sales Analytics",
            "Stock Management",
            "Business Insights",
        ],
    }))
}

use axum::Router;

pub mod analytics;
pub mod insights;
pub mod inventory;
pub mod products;
pub mod sales;
pub mod system;

/// Router for all versioned endpoints (mounted under `/api/v1`).
pub fn router() -> Router {
    Router::new()
        .nest("/products", products::router())
        .nest("/sales", sales::router())
        .nest("/inventory", inventory::router())
        .nest("/analytics", analytics::router())
        .nest("/insights", insights::router())
}

//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store selection and the dashboard hub
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: query parameters and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::AppServices;

/// Prefix of every versioned endpoint.
pub const API_PREFIX: &str = "/api/v1";

/// Build the full HTTP router (public entrypoint used by `main.rs` and the tests).
pub fn build_app(services: Arc<AppServices>) -> Router {
    Router::new()
        .route("/", get(routes::system::root))
        .route("/health", get(routes::system::health))
        .nest(API_PREFIX, routes::router())
        .layer(Extension(services))
        .layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
}

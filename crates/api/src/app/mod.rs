//! HTTP API application wiring (Axum router + service wiring).
//!
//! Folder structure:
//! - `services.rs`: store wiring shared by all handlers
//! - `routes/`: HTTP routes + handlers (one file per domain area)
//! - `dto.rs`: request/response DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses + the response envelope

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use marstrade_infra::TradeStore;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs` and the
/// black-box tests).
pub fn build_app(store: Arc<dyn TradeStore>) -> Router {
    let services = Arc::new(services::AppServices::new(store));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(routes::router())
        .layer(Extension(services))
        .layer(ServiceBuilder::new())
}

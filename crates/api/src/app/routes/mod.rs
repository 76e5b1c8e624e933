use axum::Router;

pub mod martians;
pub mod supplies;
pub mod system;

/// Router for all domain endpoints.
pub fn router() -> Router {
    Router::new()
        .nest("/martians", martians::router())
        .nest("/supplies", supplies::router())
}

use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use marstrade_core::DomainError;
use marstrade_infra::StoreError;

/// Envelope for successful responses: `{ success, message, data }`.
pub fn json_success(
    status: StatusCode,
    message: impl Into<String>,
    data: serde_json::Value,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "success": true,
            "message": message.into(),
            "data": data,
        })),
    )
        .into_response()
}

/// Envelope for failures: `{ success: false, error, message }` with a stable
/// machine-readable error kind.
pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "success": false,
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    let status = match &err {
        DomainError::Validation(_) | DomainError::UnknownSupply(_) => StatusCode::BAD_REQUEST,
        DomainError::NotFound => StatusCode::NOT_FOUND,
        DomainError::TradeNotAllowed { .. }
        | DomainError::PointsNotMatched
        | DomainError::InsufficientSupply { .. } => StatusCode::UNPROCESSABLE_ENTITY,
    };
    json_error(status, err.kind(), err.to_string())
}

/// Boundary adapter: domain errors keep their kind; infrastructure faults
/// are logged here and surfaced as a generic internal error.
pub fn store_error_to_response(err: StoreError) -> axum::response::Response {
    match err {
        StoreError::Domain(e) => domain_error_to_response(e),
        StoreError::Database(e) => {
            tracing::error!(error = %e, "store failure");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "internal error",
            )
        }
    }
}

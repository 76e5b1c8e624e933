use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    routing::{get, post},
};

use marstrade_core::SupplyId;
use marstrade_supplies::Supply;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_supply).get(list_supplies))
        .route(
            "/:id",
            get(get_supply).put(update_supply).delete(delete_supply),
        )
}

fn parse_id(id: &str) -> Result<SupplyId, axum::response::Response> {
    id.parse().map_err(|_| {
        errors::json_error(StatusCode::BAD_REQUEST, "validation_error", "invalid supply id")
    })
}

pub async fn create_supply(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::CreateSupplyRequest>,
) -> axum::response::Response {
    let supply = match Supply::new(SupplyId::new(), body.name, body.value) {
        Ok(s) => s,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.store().create_supply(supply).await {
        Ok(record) => errors::json_success(
            StatusCode::CREATED,
            "supply created",
            dto::supply_to_json(record),
        ),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn list_supplies(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.store().list_supplies().await {
        Ok(records) => errors::json_success(
            StatusCode::OK,
            "supplies retrieved",
            serde_json::Value::Array(records.into_iter().map(dto::supply_to_json).collect()),
        ),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_supply(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match services.store().get_supply(id).await {
        Ok(record) => errors::json_success(
            StatusCode::OK,
            "supply retrieved",
            dto::supply_to_json(record),
        ),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn update_supply(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateSupplyRequest>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    // Partial update: fetch current, overlay provided fields, re-validate.
    let current = match services.store().get_supply(id).await {
        Ok(record) => record,
        Err(e) => return errors::store_error_to_response(e),
    };
    let supply = match Supply::new(
        id,
        body.name.unwrap_or(current.name),
        body.value.unwrap_or(current.value),
    ) {
        Ok(s) => s,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.store().update_supply(supply).await {
        Ok(record) => errors::json_success(
            StatusCode::OK,
            "supply updated",
            dto::supply_to_json(record),
        ),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn delete_supply(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match services.store().delete_supply(id).await {
        Ok(()) => errors::json_success(
            StatusCode::OK,
            "supply deleted",
            serde_json::json!({ "supply_id": id.to_string() }),
        ),
        Err(e) => errors::store_error_to_response(e),
    }
}

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    routing::{get, post},
};

use marstrade_core::MartianId;
use marstrade_martians::Martian;
use marstrade_trading::{Bundle, TradeOrder};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_martian).get(list_martians))
        .route(
            "/:id",
            get(get_martian).put(update_martian).delete(delete_martian),
        )
        .route("/:id/trade", post(trade))
}

fn parse_id(id: &str) -> Result<MartianId, axum::response::Response> {
    id.parse().map_err(|_| {
        errors::json_error(StatusCode::BAD_REQUEST, "validation_error", "invalid martian id")
    })
}

pub async fn create_martian(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::CreateMartianRequest>,
) -> axum::response::Response {
    let martian = match Martian::new(MartianId::new(), body.name, body.age, body.gender, body.trade)
    {
        Ok(m) => m,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.store().create_martian(martian).await {
        Ok(record) => errors::json_success(
            StatusCode::CREATED,
            "martian created",
            dto::martian_to_json(record),
        ),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn list_martians(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.store().list_martians().await {
        Ok(records) => errors::json_success(
            StatusCode::OK,
            "martians retrieved",
            serde_json::Value::Array(records.into_iter().map(dto::martian_to_json).collect()),
        ),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_martian(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match services.store().get_martian(id).await {
        Ok(record) => errors::json_success(
            StatusCode::OK,
            "martian retrieved",
            dto::martian_to_json(record),
        ),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn update_martian(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateMartianRequest>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match services.store().update_martian(id, body.into()).await {
        Ok(record) => errors::json_success(
            StatusCode::OK,
            "martian updated",
            dto::martian_to_json(record),
        ),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn delete_martian(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match services.store().delete_martian(id).await {
        Ok(()) => errors::json_success(
            StatusCode::OK,
            "martian deleted",
            serde_json::json!({ "martian_id": id.to_string() }),
        ),
        Err(e) => errors::store_error_to_response(e),
    }
}

/// `POST /martians/{id}/trade` — atomically exchange two equal-value supply
/// bundles between the path martian (initiator) and `trader_id`.
pub async fn trade(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::TradeRequest>,
) -> axum::response::Response {
    let initiator = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let partner: MartianId = match body.trader_id.parse() {
        Ok(id) => id,
        Err(_) => {
            return errors::json_error(
                StatusCode::BAD_REQUEST,
                "validation_error",
                "invalid trader id",
            );
        }
    };

    let order = match Bundle::new(body.supplies)
        .and_then(|offered| Ok((offered, Bundle::new(body.supplies_of_trader)?)))
        .and_then(|(offered, counter)| TradeOrder::new(initiator, partner, offered, counter))
    {
        Ok(order) => order,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.store().execute_trade(order).await {
        Ok(record) => errors::json_success(
            StatusCode::OK,
            "trade completed",
            dto::martian_to_json(record),
        ),
        Err(e) => errors::store_error_to_response(e),
    }
}

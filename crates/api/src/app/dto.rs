use std::collections::BTreeMap;

use serde::Deserialize;

use marstrade_core::SupplyId;
use marstrade_infra::{MartianRecord, SupplyRecord};
use marstrade_martians::MartianUpdate;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateMartianRequest {
    pub name: String,
    pub age: i32,
    pub gender: String,
    #[serde(default)]
    pub trade: bool,
}

#[derive(Debug, Deserialize)]
pub struct UpdateMartianRequest {
    pub name: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub trade: Option<bool>,
}

impl From<UpdateMartianRequest> for MartianUpdate {
    fn from(req: UpdateMartianRequest) -> Self {
        Self {
            name: req.name,
            age: req.age,
            gender: req.gender,
            trade: req.trade,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateSupplyRequest {
    pub name: String,
    pub value: i64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSupplyRequest {
    pub name: Option<String>,
    pub value: Option<i64>,
}

/// Body of `POST /martians/{id}/trade`. `supplies` leaves the initiating
/// martian's inventory; `supplies_of_trader` leaves the partner's.
#[derive(Debug, Deserialize)]
pub struct TradeRequest {
    pub trader_id: String,
    pub supplies: BTreeMap<SupplyId, i64>,
    pub supplies_of_trader: BTreeMap<SupplyId, i64>,
}

// -------------------------
// JSON mapping helpers
// -------------------------

pub fn martian_to_json(record: MartianRecord) -> serde_json::Value {
    serde_json::json!({
        "id": record.id.to_string(),
        "name": record.name,
        "age": record.age,
        "gender": record.gender,
        "trade": record.trade,
        "inventories": record.inventories.into_iter().map(|e| serde_json::json!({
            "supply_id": e.supply_id.to_string(),
            "quantity": e.quantity,
        })).collect::<Vec<_>>(),
    })
}

pub fn supply_to_json(record: SupplyRecord) -> serde_json::Value {
    serde_json::json!({
        "id": record.id.to_string(),
        "name": record.name,
        "value": record.value,
    })
}

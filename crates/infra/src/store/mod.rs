//! Store trait and shared record types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use marstrade_core::{DomainError, MartianId, SupplyId};
use marstrade_martians::{Martian, MartianUpdate};
use marstrade_supplies::Supply;
use marstrade_trading::TradeOrder;

pub mod in_memory;
pub mod postgres;

pub use in_memory::MemoryStore;
pub use postgres::PostgresStore;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Store-level error: either a deterministic domain failure or an
/// infrastructure fault. The HTTP boundary maps the former to stable error
/// kinds and the latter to a generic internal error.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("store unavailable: {0}")]
    Database(#[from] sqlx::Error),
}

/// One held (supply, quantity) pair. Quantity is always positive here;
/// zero-quantity rows are deleted on write and never reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryEntry {
    pub supply_id: SupplyId,
    pub quantity: i64,
}

/// A martian with its inventory, as surfaced to the API layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MartianRecord {
    pub id: MartianId,
    pub name: String,
    pub age: i32,
    pub gender: String,
    pub trade: bool,
    pub inventories: Vec<InventoryEntry>,
}

/// A catalog entry as surfaced to the API layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplyRecord {
    pub id: SupplyId,
    pub name: String,
    pub value: i64,
}

/// Persistence seam for the directory, the catalog, inventories, and the
/// trade operation.
///
/// `execute_trade` is the one operation with real contracts: the
/// implementation must run the whole check-and-exchange sequence atomically
/// so that concurrent trades over overlapping inventories can never drive a
/// quantity negative or leave a partial exchange observable.
#[async_trait]
pub trait TradeStore: Send + Sync {
    async fn create_martian(&self, martian: Martian) -> StoreResult<MartianRecord>;
    async fn get_martian(&self, id: MartianId) -> StoreResult<MartianRecord>;
    async fn list_martians(&self) -> StoreResult<Vec<MartianRecord>>;
    async fn update_martian(
        &self,
        id: MartianId,
        update: MartianUpdate,
    ) -> StoreResult<MartianRecord>;
    async fn delete_martian(&self, id: MartianId) -> StoreResult<()>;

    async fn create_supply(&self, supply: Supply) -> StoreResult<SupplyRecord>;
    async fn get_supply(&self, id: SupplyId) -> StoreResult<SupplyRecord>;
    async fn list_supplies(&self) -> StoreResult<Vec<SupplyRecord>>;
    async fn update_supply(&self, supply: Supply) -> StoreResult<SupplyRecord>;
    async fn delete_supply(&self, id: SupplyId) -> StoreResult<()>;

    /// Admin-side inventory write: set the held quantity outright.
    /// Quantity 0 removes the entry.
    async fn set_inventory(
        &self,
        martian_id: MartianId,
        supply_id: SupplyId,
        quantity: i64,
    ) -> StoreResult<()>;

    /// Atomically execute a validated trade order and return the initiating
    /// martian's updated record. On any error, neither inventory changes.
    async fn execute_trade(&self, order: TradeOrder) -> StoreResult<MartianRecord>;
}

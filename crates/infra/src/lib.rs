//! `marstrade-infra` — persistence backends for the trading domain.
//!
//! The [`store::TradeStore`] trait is the seam between domain and storage.
//! Two implementations: [`store::MemoryStore`] (tests, local dev) and
//! [`store::PostgresStore`] (production, sqlx).

pub mod store;

pub use store::{
    InventoryEntry, MartianRecord, MemoryStore, PostgresStore, StoreError, StoreResult,
    SupplyRecord, TradeStore,
};

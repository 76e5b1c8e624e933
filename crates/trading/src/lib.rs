//! Trading domain module.
//!
//! This crate contains the business rules for supply trades, implemented
//! purely as deterministic domain logic (no IO, no HTTP, no storage):
//!
//! - [`Bundle`]: a validated supply-id → quantity offer map.
//! - [`comparator`]: pure aggregate-value comparison of two bundles.
//! - [`executor`]: the trade planning pipeline (eligibility → value →
//!   sufficiency) producing a net [`TradePlan`] the store applies atomically.

pub mod bundle;
pub mod comparator;
pub mod executor;

pub use bundle::Bundle;
pub use comparator::{SupplyValues, bundle_total, compare_bundles};
pub use executor::{InventoryDelta, TradeOrder, TradePlan, TradeStage, TradingParty, plan_trade};

//! Supply catalog domain module.
//!
//! Supplies are immutable reference data: each carries a non-negative value
//! used as the trade currency.

pub mod supply;

pub use supply::{Supply, SupplyValue};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use marstrade_core::{DomainError, DomainResult, SupplyId};

/// A set of supply offers within one trade request: supply id → quantity.
///
/// Validated on construction: non-empty, no negative quantities. An entry
/// with quantity 0 is valid; it contributes nothing to the bundle's value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Bundle(BTreeMap<SupplyId, i64>);

impl Bundle {
    pub fn new(entries: BTreeMap<SupplyId, i64>) -> DomainResult<Self> {
        if entries.is_empty() {
            return Err(DomainError::validation("bundle cannot be empty"));
        }
        for (supply_id, quantity) in &entries {
            if *quantity < 0 {
                return Err(DomainError::validation(format!(
                    "quantity for supply {supply_id} cannot be negative"
                )));
            }
        }
        Ok(Self(entries))
    }

    /// Entries in ascending supply-id order.
    pub fn iter(&self) -> impl Iterator<Item = (SupplyId, i64)> + '_ {
        self.0.iter().map(|(id, qty)| (*id, *qty))
    }

    pub fn quantity_of(&self, supply_id: SupplyId) -> i64 {
        self.0.get(&supply_id).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

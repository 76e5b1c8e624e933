use serde::{Deserialize, Serialize};

use marstrade_core::{DomainError, DomainResult, SupplyId};

/// Value of one unit of a supply. Value object: immutable, compared by value.
///
/// Values are non-negative and integral; bundle totals therefore compare with
/// exact equality, no tolerance needed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SupplyValue(i64);

impl SupplyValue {
    pub fn new(value: i64) -> DomainResult<Self> {
        if value < 0 {
            return Err(DomainError::validation("supply value cannot be negative"));
        }
        Ok(Self(value))
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

/// Catalog entry: a supply definition with its unit value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supply {
    id: SupplyId,
    name: String,
    value: SupplyValue,
}

impl Supply {
    pub fn new(id: SupplyId, name: impl Into<String>, value: i64) -> DomainResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        Ok(Self {
            id,
            name,
            value: SupplyValue::new(value)?,
        })
    }

    pub fn id(&self) -> SupplyId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> SupplyValue {
        self.value
    }
}

use serde::{Deserialize, Serialize};

use marstrade_core::{DomainError, DomainResult, MartianId};

/// Oldest recorded martian. Ages beyond this are treated as input errors.
pub const MAX_AGE: i32 = 500;

/// Directory entry: a martian that may hold supplies and trade them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Martian {
    id: MartianId,
    name: String,
    age: i32,
    gender: String,
    trade: bool,
}

impl Martian {
    /// Validate fields and build a new directory entry.
    pub fn new(
        id: MartianId,
        name: impl Into<String>,
        age: i32,
        gender: impl Into<String>,
        trade: bool,
    ) -> DomainResult<Self> {
        let name = name.into();
        let gender = gender.into();

        if name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if !(0..=MAX_AGE).contains(&age) {
            return Err(DomainError::validation(format!(
                "age must be between 0 and {MAX_AGE}"
            )));
        }
        if gender.trim().is_empty() {
            return Err(DomainError::validation("gender cannot be empty"));
        }

        Ok(Self {
            id,
            name,
            age,
            gender,
            trade,
        })
    }

    pub fn id(&self) -> MartianId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn age(&self) -> i32 {
        self.age
    }

    pub fn gender(&self) -> &str {
        &self.gender
    }

    /// Whether this martian may participate in trades.
    pub fn can_trade(&self) -> bool {
        self.trade
    }

    /// Apply a partial update, re-validating the resulting entry.
    pub fn apply_update(&self, update: MartianUpdate) -> DomainResult<Self> {
        Self::new(
            self.id,
            update.name.unwrap_or_else(|| self.name.clone()),
            update.age.unwrap_or(self.age),
            update.gender.unwrap_or_else(|| self.gender.clone()),
            update.trade.unwrap_or(self.trade),
        )
    }
}

/// Partial update for a martian; `None` fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MartianUpdate {
    pub name: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub trade: Option<bool>,
}

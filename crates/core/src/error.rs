//! Domain error model.

use thiserror::Error;

use crate::id::{MartianId, SupplyId};

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// invariants, trade rejections). Infrastructure concerns belong elsewhere.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input, negative quantity).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A requested resource was not found (domain-level).
    #[error("not found")]
    NotFound,

    /// A party's eligibility flag forbids trading.
    #[error("{martian_name} is not allowed to trade")]
    TradeNotAllowed { martian_name: String },

    /// The two offered bundles do not have equal aggregate value.
    #[error("supply points do not match")]
    PointsNotMatched,

    /// The offering party does not hold enough of an offered supply.
    #[error("martian {martian_id} holds insufficient quantity of supply {supply_id}")]
    InsufficientSupply {
        martian_id: MartianId,
        supply_id: SupplyId,
    },

    /// A bundle references a supply id that does not exist in the catalog.
    #[error("unknown supply: {0}")]
    UnknownSupply(SupplyId),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }

    pub fn trade_not_allowed(name: impl Into<String>) -> Self {
        Self::TradeNotAllowed {
            martian_name: name.into(),
        }
    }

    /// Stable machine-readable kind, used by the HTTP boundary.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::NotFound => "not_found",
            Self::TradeNotAllowed { .. } => "trade_not_allowed",
            Self::PointsNotMatched => "points_not_matched",
            Self::InsufficientSupply { .. } => "insufficient_supply",
            Self::UnknownSupply(_) => "unknown_supply",
        }
    }
}

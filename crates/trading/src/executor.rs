//! Trade executor: plans an atomic two-way exchange of supply bundles.
//!
//! The executor is split so every check runs against state the store has
//! already locked: the pure [`plan_trade`] pipeline here performs
//! eligibility, value, and sufficiency checks and emits a net [`TradePlan`];
//! the store loads both parties under one transaction, invokes the planner,
//! and applies the plan all-or-nothing.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use marstrade_core::{DomainError, DomainResult, MartianId, SupplyId};

use crate::bundle::Bundle;
use crate::comparator::{SupplyValues, compare_bundles};

/// Progression of one trade attempt. Failure exits to `Rejected` from any
/// check stage; `Aborted` if the commit itself cannot complete.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeStage {
    Initiated,
    EligibilityChecked,
    ValueChecked,
    Reserved,
    Committed,
    Rejected,
    Aborted,
}

/// A validated trade request: who trades with whom, and which bundle each
/// side gives away. Ephemeral, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeOrder {
    initiator: MartianId,
    partner: MartianId,
    offered: Bundle,
    counter: Bundle,
}

impl TradeOrder {
    /// `offered` leaves the initiator's inventory; `counter` leaves the
    /// partner's. Self-trades are rejected up front.
    pub fn new(
        initiator: MartianId,
        partner: MartianId,
        offered: Bundle,
        counter: Bundle,
    ) -> DomainResult<Self> {
        if initiator == partner {
            return Err(DomainError::validation(
                "a martian cannot trade with itself",
            ));
        }
        Ok(Self {
            initiator,
            partner,
            offered,
            counter,
        })
    }

    pub fn initiator(&self) -> MartianId {
        self.initiator
    }

    pub fn partner(&self) -> MartianId {
        self.partner
    }

    pub fn offered(&self) -> &Bundle {
        &self.offered
    }

    pub fn counter(&self) -> &Bundle {
        &self.counter
    }
}

/// One party's state as the store loaded it under the trade transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradingParty {
    pub id: MartianId,
    pub name: String,
    pub trade: bool,
    pub holdings: BTreeMap<SupplyId, i64>,
}

impl TradingParty {
    fn held(&self, supply_id: SupplyId) -> i64 {
        self.holdings.get(&supply_id).copied().unwrap_or(0)
    }
}

/// Signed quantity change for one (martian, supply) inventory key.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryDelta {
    pub martian_id: MartianId,
    pub supply_id: SupplyId,
    pub delta: i64,
}

/// Net inventory mutation for a checked trade. Applying every delta is the
/// whole exchange; a supply traded in both directions appears once with the
/// arithmetic net of both legs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradePlan {
    deltas: Vec<InventoryDelta>,
}

impl TradePlan {
    pub fn deltas(&self) -> &[InventoryDelta] {
        &self.deltas
    }
}

/// Run the check pipeline for one trade attempt and emit the net plan.
///
/// Checks in order: eligibility of both parties, aggregate-value parity of
/// the bundles, and sufficiency of each side's holdings against its own
/// offered bundle. Any failure leaves no trace; nothing is mutated here.
pub fn plan_trade(
    order: &TradeOrder,
    initiator: &TradingParty,
    partner: &TradingParty,
    values: &impl SupplyValues,
) -> DomainResult<TradePlan> {
    // Eligibility: the initiating martian is checked first, matching the
    // error attribution callers expect.
    for party in [initiator, partner] {
        if !party.trade {
            tracing::debug!(stage = ?TradeStage::Rejected, martian = %party.id, "trade rejected: party not eligible");
            return Err(DomainError::trade_not_allowed(party.name.clone()));
        }
    }
    tracing::trace!(stage = ?TradeStage::EligibilityChecked, initiator = %order.initiator(), partner = %order.partner());

    if !compare_bundles(order.offered(), order.counter(), values)? {
        tracing::debug!(stage = ?TradeStage::Rejected, "trade rejected: bundle values differ");
        return Err(DomainError::PointsNotMatched);
    }
    tracing::trace!(stage = ?TradeStage::ValueChecked, initiator = %order.initiator(), partner = %order.partner());

    // Sufficiency is gross per leg: each side must hold the full quantity it
    // offers, even when the same supply flows back from the other side.
    for (party, bundle) in [(initiator, order.offered()), (partner, order.counter())] {
        for (supply_id, quantity) in bundle.iter() {
            if party.held(supply_id) < quantity {
                tracing::debug!(
                    stage = ?TradeStage::Rejected,
                    martian = %party.id,
                    supply = %supply_id,
                    "trade rejected: insufficient holdings"
                );
                return Err(DomainError::InsufficientSupply {
                    martian_id: party.id,
                    supply_id,
                });
            }
        }
    }

    // Net the two legs per (martian, supply) key. Gross sufficiency above
    // bounds every resulting quantity at >= 0.
    let mut net: BTreeMap<(MartianId, SupplyId), i64> = BTreeMap::new();
    for (supply_id, quantity) in order.offered().iter() {
        *net.entry((order.initiator(), supply_id)).or_default() -= quantity;
        *net.entry((order.partner(), supply_id)).or_default() += quantity;
    }
    for (supply_id, quantity) in order.counter().iter() {
        *net.entry((order.partner(), supply_id)).or_default() -= quantity;
        *net.entry((order.initiator(), supply_id)).or_default() += quantity;
    }

    let deltas = net
        .into_iter()
        .filter(|(_, delta)| *delta != 0)
        .map(|((martian_id, supply_id), delta)| InventoryDelta {
            martian_id,
            supply_id,
            delta,
        })
        .collect();

    tracing::debug!(stage = ?TradeStage::Reserved, initiator = %order.initiator(), partner = %order.partner(), "trade plan ready");
    Ok(TradePlan { deltas })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn party(name: &str, trade: bool, holdings: &[(SupplyId, i64)]) -> TradingParty {
        TradingParty {
            id: MartianId::new(),
            name: name.to_string(),
            trade,
            holdings: holdings.iter().copied().collect(),
        }
    }

    fn bundle(entries: &[(SupplyId, i64)]) -> Bundle {
        Bundle::new(entries.iter().copied().collect()).unwrap()
    }

    fn order(initiator: &TradingParty, partner: &TradingParty, offered: Bundle, counter: Bundle) -> TradeOrder {
        TradeOrder::new(initiator.id, partner.id, offered, counter).unwrap()
    }

    fn apply(plan: &TradePlan, parties: &mut [&mut TradingParty]) {
        for d in plan.deltas() {
            for p in parties.iter_mut() {
                if p.id == d.martian_id {
                    *p.holdings.entry(d.supply_id).or_default() += d.delta;
                }
            }
        }
    }

    #[test]
    fn equal_value_trade_swaps_bundles() {
        let x = SupplyId::new();
        let y = SupplyId::new();
        let values = BTreeMap::from([(x, 5), (y, 25)]);

        let mut m1 = party("M1", true, &[(x, 10)]);
        let mut m2 = party("M2", true, &[(y, 2)]);
        let ord = order(&m1, &m2, bundle(&[(x, 10)]), bundle(&[(y, 2)]));

        let plan = plan_trade(&ord, &m1, &m2, &values).unwrap();
        apply(&plan, &mut [&mut m1, &mut m2]);

        assert_eq!(m1.held(x), 0);
        assert_eq!(m1.held(y), 2);
        assert_eq!(m2.held(x), 10);
        assert_eq!(m2.held(y), 0);
    }

    #[test]
    fn unequal_value_trade_is_points_not_matched() {
        let x = SupplyId::new();
        let y = SupplyId::new();
        let values = BTreeMap::from([(x, 5), (y, 25)]);

        let m1 = party("M1", true, &[(x, 10)]);
        let m2 = party("M2", true, &[(y, 2)]);
        let ord = order(&m1, &m2, bundle(&[(x, 10)]), bundle(&[(y, 1)]));

        match plan_trade(&ord, &m1, &m2, &values).unwrap_err() {
            DomainError::PointsNotMatched => {}
            other => panic!("expected PointsNotMatched, got {other:?}"),
        }
    }

    #[test]
    fn ineligible_party_is_named_in_the_error() {
        let x = SupplyId::new();
        let values = BTreeMap::from([(x, 5)]);

        let m1 = party("M1", true, &[(x, 1)]);
        let m2 = party("Grounded", false, &[(x, 1)]);
        let ord = order(&m1, &m2, bundle(&[(x, 1)]), bundle(&[(x, 1)]));

        match plan_trade(&ord, &m1, &m2, &values).unwrap_err() {
            DomainError::TradeNotAllowed { martian_name } => {
                assert_eq!(martian_name, "Grounded");
            }
            other => panic!("expected TradeNotAllowed, got {other:?}"),
        }
    }

    #[test]
    fn ineligible_initiator_is_checked_before_partner() {
        let x = SupplyId::new();
        let values = BTreeMap::from([(x, 5)]);

        let m1 = party("Idle", false, &[(x, 1)]);
        let m2 = party("AlsoIdle", false, &[(x, 1)]);
        let ord = order(&m1, &m2, bundle(&[(x, 1)]), bundle(&[(x, 1)]));

        match plan_trade(&ord, &m1, &m2, &values).unwrap_err() {
            DomainError::TradeNotAllowed { martian_name } => assert_eq!(martian_name, "Idle"),
            other => panic!("expected TradeNotAllowed, got {other:?}"),
        }
    }

    #[test]
    fn insufficient_holdings_identify_party_and_supply() {
        let x = SupplyId::new();
        let y = SupplyId::new();
        let values = BTreeMap::from([(x, 5), (y, 25)]);

        let m1 = party("M1", true, &[(x, 4)]);
        let m2 = party("M2", true, &[(y, 2)]);
        let ord = order(&m1, &m2, bundle(&[(x, 10)]), bundle(&[(y, 2)]));

        match plan_trade(&ord, &m1, &m2, &values).unwrap_err() {
            DomainError::InsufficientSupply {
                martian_id,
                supply_id,
            } => {
                assert_eq!(martian_id, m1.id);
                assert_eq!(supply_id, x);
            }
            other => panic!("expected InsufficientSupply, got {other:?}"),
        }
    }

    #[test]
    fn same_supply_in_both_bundles_nets_arithmetically() {
        let x = SupplyId::new();
        let values = BTreeMap::from([(x, 5)]);

        let mut m1 = party("M1", true, &[(x, 10)]);
        let mut m2 = party("M2", true, &[(x, 3)]);
        // Degenerate but legal: 3×X each way nets to no movement at all.
        let ord = order(&m1, &m2, bundle(&[(x, 3)]), bundle(&[(x, 3)]));

        let plan = plan_trade(&ord, &m1, &m2, &values).unwrap();
        assert!(plan.deltas().is_empty());

        apply(&plan, &mut [&mut m1, &mut m2]);
        assert_eq!(m1.held(x), 10);
        assert_eq!(m2.held(x), 3);
    }

    #[test]
    fn self_trade_is_a_validation_error() {
        let x = SupplyId::new();
        let id = MartianId::new();
        let err =
            TradeOrder::new(id, id, bundle(&[(x, 1)]), bundle(&[(x, 1)])).unwrap_err();
        match err {
            DomainError::Validation(_) => {}
            other => panic!("expected Validation error, got {other:?}"),
        }
    }

    #[test]
    fn inverse_trade_restores_original_inventories() {
        let x = SupplyId::new();
        let y = SupplyId::new();
        let values = BTreeMap::from([(x, 5), (y, 25)]);

        let mut m1 = party("M1", true, &[(x, 10), (y, 1)]);
        let mut m2 = party("M2", true, &[(x, 2), (y, 4)]);
        let original = (m1.holdings.clone(), m2.holdings.clone());

        let a = bundle(&[(x, 5)]);
        let b = bundle(&[(y, 1)]);

        let forward = order(&m1, &m2, a.clone(), b.clone());
        let plan = plan_trade(&forward, &m1, &m2, &values).unwrap();
        apply(&plan, &mut [&mut m1, &mut m2]);

        let inverse = order(&m1, &m2, b, a);
        let plan = plan_trade(&inverse, &m1, &m2, &values).unwrap();
        apply(&plan, &mut [&mut m1, &mut m2]);

        assert_eq!(m1.holdings, original.0);
        assert_eq!(m2.holdings, original.1);
    }

    #[test]
    fn unknown_supply_in_a_bundle_is_surfaced() {
        let x = SupplyId::new();
        let values = BTreeMap::from([(x, 5)]);

        let stranger = SupplyId::new();
        let m1 = party("M1", true, &[(x, 1)]);
        let m2 = party("M2", true, &[(x, 1)]);
        let ord = order(&m1, &m2, bundle(&[(stranger, 1)]), bundle(&[(x, 1)]));

        match plan_trade(&ord, &m1, &m2, &values).unwrap_err() {
            DomainError::UnknownSupply(id) => assert_eq!(id, stranger),
            other => panic!("expected UnknownSupply, got {other:?}"),
        }
    }
}

//! Supply comparator: pure aggregate-value comparison of two bundles.

use std::collections::{BTreeMap, HashMap};

use marstrade_core::{DomainError, DomainResult, SupplyId};

use crate::bundle::Bundle;

/// Lookup of catalog values by supply id.
///
/// Implemented by plain maps so the comparator stays callable without any
/// store in reach (tests, planning against already-loaded rows).
pub trait SupplyValues {
    fn value_of(&self, supply_id: SupplyId) -> Option<i64>;
}

impl SupplyValues for BTreeMap<SupplyId, i64> {
    fn value_of(&self, supply_id: SupplyId) -> Option<i64> {
        self.get(&supply_id).copied()
    }
}

impl SupplyValues for HashMap<SupplyId, i64> {
    fn value_of(&self, supply_id: SupplyId) -> Option<i64> {
        self.get(&supply_id).copied()
    }
}

/// Total value of a bundle: Σ(quantity × supply value).
///
/// An unknown supply id is an error, never silently zero-valued.
pub fn bundle_total(bundle: &Bundle, values: &impl SupplyValues) -> DomainResult<i64> {
    let mut total: i64 = 0;
    for (supply_id, quantity) in bundle.iter() {
        let value = values
            .value_of(supply_id)
            .ok_or(DomainError::UnknownSupply(supply_id))?;
        let line = quantity
            .checked_mul(value)
            .ok_or_else(|| DomainError::validation("bundle value overflow"))?;
        total = total
            .checked_add(line)
            .ok_or_else(|| DomainError::validation("bundle value overflow"))?;
    }
    Ok(total)
}

/// Whether two bundles have exactly equal aggregate value.
///
/// Pure and deterministic; values are integral, so equality is exact.
pub fn compare_bundles(
    a: &Bundle,
    b: &Bundle,
    values: &impl SupplyValues,
) -> DomainResult<bool> {
    Ok(bundle_total(a, values)? == bundle_total(b, values)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn bundle(entries: &[(SupplyId, i64)]) -> Bundle {
        Bundle::new(entries.iter().copied().collect()).unwrap()
    }

    #[test]
    fn equal_totals_compare_equal() {
        let x = SupplyId::new();
        let y = SupplyId::new();
        let values = BTreeMap::from([(x, 5), (y, 25)]);

        // 10×5 == 2×25
        let a = bundle(&[(x, 10)]);
        let b = bundle(&[(y, 2)]);
        assert!(compare_bundles(&a, &b, &values).unwrap());
    }

    #[test]
    fn unequal_totals_compare_unequal() {
        let x = SupplyId::new();
        let y = SupplyId::new();
        let values = BTreeMap::from([(x, 5), (y, 25)]);

        // 10×5 != 1×25
        let a = bundle(&[(x, 10)]);
        let b = bundle(&[(y, 1)]);
        assert!(!compare_bundles(&a, &b, &values).unwrap());
    }

    #[test]
    fn unknown_supply_is_an_error() {
        let x = SupplyId::new();
        let values = BTreeMap::from([(x, 5)]);

        let stranger = SupplyId::new();
        let a = bundle(&[(stranger, 1)]);
        let b = bundle(&[(x, 1)]);
        match compare_bundles(&a, &b, &values).unwrap_err() {
            DomainError::UnknownSupply(id) => assert_eq!(id, stranger),
            other => panic!("expected UnknownSupply, got {other:?}"),
        }
    }

    #[test]
    fn zero_quantity_contributes_zero() {
        let x = SupplyId::new();
        let y = SupplyId::new();
        let values = BTreeMap::from([(x, 5), (y, 25)]);

        let a = bundle(&[(x, 10), (y, 0)]);
        let b = bundle(&[(y, 2)]);
        assert_eq!(bundle_total(&a, &values).unwrap(), 50);
        assert!(compare_bundles(&a, &b, &values).unwrap());
    }

    proptest! {
        /// For any bundles over the same small catalog, the comparator
        /// answers exactly "are the Σ(qty×value) totals equal".
        #[test]
        fn comparator_matches_direct_total_equality(
            qa in proptest::collection::vec(0i64..1_000, 1..6),
            qb in proptest::collection::vec(0i64..1_000, 1..6),
            vals in proptest::collection::vec(0i64..1_000, 6),
        ) {
            let ids: Vec<SupplyId> = (0..6).map(|_| SupplyId::new()).collect();
            let values: BTreeMap<SupplyId, i64> =
                ids.iter().copied().zip(vals.iter().copied()).collect();

            let a = Bundle::new(ids.iter().copied().zip(qa.iter().copied()).collect()).unwrap();
            let b = Bundle::new(ids.iter().copied().zip(qb.iter().copied()).collect()).unwrap();

            let total = |qs: &[i64]| -> i64 {
                qs.iter().zip(vals.iter()).map(|(q, v)| q * v).sum()
            };
            let expected = total(&qa[..a.len()]) == total(&qb[..b.len()]);
            prop_assert_eq!(compare_bundles(&a, &b, &values).unwrap(), expected);
        }
    }
}

//! In-memory store used by tests and credential-less local development.
//!
//! One mutex guards the whole state, so every trade is trivially serialized
//! and atomic. The lock is never held across an await point.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;

use marstrade_core::{DomainError, MartianId, SupplyId};
use marstrade_martians::{Martian, MartianUpdate};
use marstrade_supplies::Supply;
use marstrade_trading::{TradeOrder, TradingParty, plan_trade};

use super::{InventoryEntry, MartianRecord, StoreError, StoreResult, SupplyRecord, TradeStore};

#[derive(Default)]
struct State {
    martians: BTreeMap<MartianId, Martian>,
    supplies: BTreeMap<SupplyId, Supply>,
    inventories: BTreeMap<(MartianId, SupplyId), i64>,
}

impl State {
    fn martian_record(&self, id: MartianId) -> Option<MartianRecord> {
        let martian = self.martians.get(&id)?;
        let inventories = self
            .inventories
            .iter()
            .filter(|((m, _), qty)| *m == id && **qty > 0)
            .map(|((_, supply_id), qty)| InventoryEntry {
                supply_id: *supply_id,
                quantity: *qty,
            })
            .collect();
        Some(record_of(martian, inventories))
    }

    fn holdings_of(&self, id: MartianId) -> BTreeMap<SupplyId, i64> {
        self.inventories
            .iter()
            .filter(|((m, _), qty)| *m == id && **qty > 0)
            .map(|((_, s), qty)| (*s, *qty))
            .collect()
    }

    fn party_of(&self, id: MartianId) -> StoreResult<TradingParty> {
        let martian = self
            .martians
            .get(&id)
            .ok_or(StoreError::Domain(DomainError::NotFound))?;
        Ok(TradingParty {
            id,
            name: martian.name().to_string(),
            trade: martian.can_trade(),
            holdings: self.holdings_of(id),
        })
    }
}

fn record_of(martian: &Martian, inventories: Vec<InventoryEntry>) -> MartianRecord {
    MartianRecord {
        id: martian.id(),
        name: martian.name().to_string(),
        age: martian.age(),
        gender: martian.gender().to_string(),
        trade: martian.can_trade(),
        inventories,
    }
}

fn supply_record(supply: &Supply) -> SupplyRecord {
    SupplyRecord {
        id: supply.id(),
        name: supply.name().to_string(),
        value: supply.value().get(),
    }
}

/// Mutex-backed [`TradeStore`].
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TradeStore for MemoryStore {
    async fn create_martian(&self, martian: Martian) -> StoreResult<MartianRecord> {
        let mut state = self.state.lock().unwrap();
        let record = record_of(&martian, Vec::new());
        state.martians.insert(martian.id(), martian);
        Ok(record)
    }

    async fn get_martian(&self, id: MartianId) -> StoreResult<MartianRecord> {
        let state = self.state.lock().unwrap();
        state
            .martian_record(id)
            .ok_or(StoreError::Domain(DomainError::NotFound))
    }

    async fn list_martians(&self) -> StoreResult<Vec<MartianRecord>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .martians
            .keys()
            .filter_map(|id| state.martian_record(*id))
            .collect())
    }

    async fn update_martian(
        &self,
        id: MartianId,
        update: MartianUpdate,
    ) -> StoreResult<MartianRecord> {
        let mut state = self.state.lock().unwrap();
        let current = state
            .martians
            .get(&id)
            .ok_or(StoreError::Domain(DomainError::NotFound))?;
        let updated = current.apply_update(update)?;
        state.martians.insert(id, updated);
        Ok(state.martian_record(id).expect("just updated"))
    }

    async fn delete_martian(&self, id: MartianId) -> StoreResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.martians.remove(&id).is_none() {
            return Err(StoreError::Domain(DomainError::NotFound));
        }
        state.inventories.retain(|(m, _), _| *m != id);
        Ok(())
    }

    async fn create_supply(&self, supply: Supply) -> StoreResult<SupplyRecord> {
        let mut state = self.state.lock().unwrap();
        let record = supply_record(&supply);
        state.supplies.insert(supply.id(), supply);
        Ok(record)
    }

    async fn get_supply(&self, id: SupplyId) -> StoreResult<SupplyRecord> {
        let state = self.state.lock().unwrap();
        state
            .supplies
            .get(&id)
            .map(supply_record)
            .ok_or(StoreError::Domain(DomainError::NotFound))
    }

    async fn list_supplies(&self) -> StoreResult<Vec<SupplyRecord>> {
        let state = self.state.lock().unwrap();
        Ok(state.supplies.values().map(supply_record).collect())
    }

    async fn update_supply(&self, supply: Supply) -> StoreResult<SupplyRecord> {
        let mut state = self.state.lock().unwrap();
        if !state.supplies.contains_key(&supply.id()) {
            return Err(StoreError::Domain(DomainError::NotFound));
        }
        let record = supply_record(&supply);
        state.supplies.insert(supply.id(), supply);
        Ok(record)
    }

    async fn delete_supply(&self, id: SupplyId) -> StoreResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.supplies.remove(&id).is_none() {
            return Err(StoreError::Domain(DomainError::NotFound));
        }
        state.inventories.retain(|(_, s), _| *s != id);
        Ok(())
    }

    async fn set_inventory(
        &self,
        martian_id: MartianId,
        supply_id: SupplyId,
        quantity: i64,
    ) -> StoreResult<()> {
        if quantity < 0 {
            return Err(StoreError::Domain(DomainError::validation(
                "quantity cannot be negative",
            )));
        }
        let mut state = self.state.lock().unwrap();
        if !state.martians.contains_key(&martian_id) || !state.supplies.contains_key(&supply_id) {
            return Err(StoreError::Domain(DomainError::NotFound));
        }
        if quantity == 0 {
            state.inventories.remove(&(martian_id, supply_id));
        } else {
            state.inventories.insert((martian_id, supply_id), quantity);
        }
        Ok(())
    }

    async fn execute_trade(&self, order: TradeOrder) -> StoreResult<MartianRecord> {
        let mut state = self.state.lock().unwrap();

        let initiator = state.party_of(order.initiator())?;
        let partner = state.party_of(order.partner())?;
        let values: BTreeMap<SupplyId, i64> = state
            .supplies
            .iter()
            .map(|(id, s)| (*id, s.value().get()))
            .collect();

        let plan = plan_trade(&order, &initiator, &partner, &values)?;

        // Single-lock apply: all-or-nothing by construction.
        for delta in plan.deltas() {
            let key = (delta.martian_id, delta.supply_id);
            let quantity = state.inventories.get(&key).copied().unwrap_or(0) + delta.delta;
            if quantity == 0 {
                state.inventories.remove(&key);
            } else {
                state.inventories.insert(key, quantity);
            }
        }

        Ok(state
            .martian_record(order.initiator())
            .expect("initiator exists"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap as Map;
    use std::sync::Arc;

    use marstrade_trading::Bundle;

    async fn seed_martian(store: &MemoryStore, name: &str, trade: bool) -> MartianId {
        let m = Martian::new(MartianId::new(), name, 30, "female", trade).unwrap();
        store.create_martian(m).await.unwrap().id
    }

    async fn seed_supply(store: &MemoryStore, name: &str, value: i64) -> SupplyId {
        let s = Supply::new(SupplyId::new(), name, value).unwrap();
        store.create_supply(s).await.unwrap().id
    }

    fn bundle(entries: &[(SupplyId, i64)]) -> Bundle {
        Bundle::new(entries.iter().copied().collect()).unwrap()
    }

    fn held(record: &MartianRecord, supply_id: SupplyId) -> i64 {
        record
            .inventories
            .iter()
            .find(|e| e.supply_id == supply_id)
            .map(|e| e.quantity)
            .unwrap_or(0)
    }

    #[tokio::test]
    async fn martian_crud_roundtrip() {
        let store = MemoryStore::new();
        let id = seed_martian(&store, "Marvin", true).await;

        let fetched = store.get_martian(id).await.unwrap();
        assert_eq!(fetched.name, "Marvin");
        assert!(fetched.inventories.is_empty());

        let updated = store
            .update_martian(
                id,
                MartianUpdate {
                    trade: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(!updated.trade);

        store.delete_martian(id).await.unwrap();
        match store.get_martian(id).await.unwrap_err() {
            StoreError::Domain(DomainError::NotFound) => {}
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn deleting_a_supply_removes_it_from_inventories() {
        let store = MemoryStore::new();
        let m = seed_martian(&store, "Marvin", true).await;
        let s = seed_supply(&store, "Water", 5).await;
        store.set_inventory(m, s, 3).await.unwrap();

        store.delete_supply(s).await.unwrap();
        let record = store.get_martian(m).await.unwrap();
        assert!(record.inventories.is_empty());
    }

    #[tokio::test]
    async fn successful_trade_swaps_bundles() {
        let store = MemoryStore::new();
        let m1 = seed_martian(&store, "M1", true).await;
        let m2 = seed_martian(&store, "M2", true).await;
        let x = seed_supply(&store, "X", 5).await;
        let y = seed_supply(&store, "Y", 25).await;
        store.set_inventory(m1, x, 10).await.unwrap();
        store.set_inventory(m2, y, 2).await.unwrap();

        let order = TradeOrder::new(m1, m2, bundle(&[(x, 10)]), bundle(&[(y, 2)])).unwrap();
        let record = store.execute_trade(order).await.unwrap();

        assert_eq!(record.id, m1);
        assert_eq!(held(&record, x), 0);
        assert_eq!(held(&record, y), 2);

        let other = store.get_martian(m2).await.unwrap();
        assert_eq!(held(&other, x), 10);
        assert_eq!(held(&other, y), 0);
    }

    #[tokio::test]
    async fn failed_trade_leaves_both_inventories_unchanged() {
        let store = MemoryStore::new();
        let m1 = seed_martian(&store, "M1", true).await;
        let m2 = seed_martian(&store, "M2", false).await;
        let x = seed_supply(&store, "X", 5).await;
        store.set_inventory(m1, x, 10).await.unwrap();
        store.set_inventory(m2, x, 2).await.unwrap();

        let order = TradeOrder::new(m1, m2, bundle(&[(x, 2)]), bundle(&[(x, 2)])).unwrap();
        match store.execute_trade(order).await.unwrap_err() {
            StoreError::Domain(DomainError::TradeNotAllowed { martian_name }) => {
                assert_eq!(martian_name, "M2");
            }
            other => panic!("expected TradeNotAllowed, got {other:?}"),
        }

        assert_eq!(held(&store.get_martian(m1).await.unwrap(), x), 10);
        assert_eq!(held(&store.get_martian(m2).await.unwrap(), x), 2);
    }

    #[tokio::test]
    async fn concurrent_trades_never_oversell() {
        let store = Arc::new(MemoryStore::new());
        let m1 = seed_martian(&store, "M1", true).await;
        let m2 = seed_martian(&store, "M2", true).await;
        let x = seed_supply(&store, "X", 1).await;
        let y = seed_supply(&store, "Y", 1).await;
        store.set_inventory(m1, x, 5).await.unwrap();
        store.set_inventory(m2, y, 10).await.unwrap();

        // Ten concurrent 1×X ⇄ 1×Y trades against 5 units of X: exactly five
        // can succeed, the rest must reject without touching state.
        let mut handles = Vec::new();
        for _ in 0..10 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                let order =
                    TradeOrder::new(m1, m2, bundle(&[(x, 1)]), bundle(&[(y, 1)])).unwrap();
                store.execute_trade(order).await
            }));
        }

        let mut successes = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(StoreError::Domain(DomainError::InsufficientSupply {
                    martian_id, ..
                })) => assert_eq!(martian_id, m1),
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }
        assert_eq!(successes, 5);

        let r1 = store.get_martian(m1).await.unwrap();
        let r2 = store.get_martian(m2).await.unwrap();
        let totals: Map<SupplyId, i64> = [
            (x, held(&r1, x) + held(&r2, x)),
            (y, held(&r1, y) + held(&r2, y)),
        ]
        .into();

        assert_eq!(held(&r1, x), 0);
        assert_eq!(held(&r1, y), 5);
        assert_eq!(totals[&x], 5);
        assert_eq!(totals[&y], 10);
        for record in [&r1, &r2] {
            for entry in &record.inventories {
                assert!(entry.quantity > 0);
            }
        }
    }

    #[tokio::test]
    async fn inverse_trade_restores_original_state() {
        let store = MemoryStore::new();
        let m1 = seed_martian(&store, "M1", true).await;
        let m2 = seed_martian(&store, "M2", true).await;
        let x = seed_supply(&store, "X", 5).await;
        let y = seed_supply(&store, "Y", 25).await;
        store.set_inventory(m1, x, 10).await.unwrap();
        store.set_inventory(m2, y, 2).await.unwrap();

        let forward = TradeOrder::new(m1, m2, bundle(&[(x, 10)]), bundle(&[(y, 2)])).unwrap();
        store.execute_trade(forward).await.unwrap();

        let inverse = TradeOrder::new(m1, m2, bundle(&[(y, 2)]), bundle(&[(x, 10)])).unwrap();
        let record = store.execute_trade(inverse).await.unwrap();

        assert_eq!(held(&record, x), 10);
        assert_eq!(held(&record, y), 0);
        let other = store.get_martian(m2).await.unwrap();
        assert_eq!(held(&other, x), 0);
        assert_eq!(held(&other, y), 2);
    }
}

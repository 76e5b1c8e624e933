//! Postgres-backed [`TradeStore`].
//!
//! Trades run in one transaction: both martian rows are locked
//! `FOR UPDATE` in ascending id order (stable lock order, so two crossing
//! trades cannot deadlock), holdings and catalog values are read under the
//! lock, and the plan is applied before commit. The quantity-never-negative
//! invariant therefore holds under concurrent trades over overlapping
//! inventories; trades touching disjoint martians proceed in parallel.

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Row};
use std::collections::HashMap;
use uuid::Uuid;

use marstrade_core::{DomainError, MartianId, SupplyId};
use marstrade_martians::{Martian, MartianUpdate};
use marstrade_supplies::Supply;
use marstrade_trading::{TradeOrder, TradingParty, plan_trade};

use super::{InventoryEntry, MartianRecord, StoreError, StoreResult, SupplyRecord, TradeStore};

pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply the schema in `migrations/` (idempotent).
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::raw_sql(include_str!("../../migrations/0001_init.sql"))
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

async fn fetch_martian_record(
    conn: &mut PgConnection,
    id: MartianId,
) -> StoreResult<Option<MartianRecord>> {
    let row = sqlx::query(
        r#"
        SELECT id, name, age, gender, trade
        FROM martians
        WHERE id = $1
        "#,
    )
    .bind(id.as_uuid())
    .fetch_optional(&mut *conn)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let inventories = sqlx::query(
        r#"
        SELECT supply_id, quantity
        FROM inventories
        WHERE martian_id = $1 AND quantity > 0
        ORDER BY supply_id
        "#,
    )
    .bind(id.as_uuid())
    .fetch_all(&mut *conn)
    .await?
    .into_iter()
    .map(|r| {
        Ok(InventoryEntry {
            supply_id: SupplyId::from_uuid(r.try_get::<Uuid, _>("supply_id")?),
            quantity: r.try_get("quantity")?,
        })
    })
    .collect::<Result<Vec<_>, sqlx::Error>>()?;

    Ok(Some(MartianRecord {
        id: MartianId::from_uuid(row.try_get::<Uuid, _>("id")?),
        name: row.try_get("name")?,
        age: row.try_get("age")?,
        gender: row.try_get("gender")?,
        trade: row.try_get("trade")?,
        inventories,
    }))
}

/// Lock one martian row for the duration of the enclosing transaction.
async fn lock_martian(
    conn: &mut PgConnection,
    id: MartianId,
) -> StoreResult<(String, bool)> {
    let row = sqlx::query(
        r#"
        SELECT name, trade
        FROM martians
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(id.as_uuid())
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(StoreError::Domain(DomainError::NotFound))?;

    Ok((row.try_get("name")?, row.try_get("trade")?))
}

async fn fetch_holdings(
    conn: &mut PgConnection,
    a: MartianId,
    b: MartianId,
) -> StoreResult<HashMap<MartianId, std::collections::BTreeMap<SupplyId, i64>>> {
    let rows = sqlx::query(
        r#"
        SELECT martian_id, supply_id, quantity
        FROM inventories
        WHERE martian_id = $1 OR martian_id = $2
        FOR UPDATE
        "#,
    )
    .bind(a.as_uuid())
    .bind(b.as_uuid())
    .fetch_all(&mut *conn)
    .await?;

    let mut holdings: HashMap<MartianId, std::collections::BTreeMap<SupplyId, i64>> =
        HashMap::from([(a, Default::default()), (b, Default::default())]);
    for row in rows {
        let martian_id = MartianId::from_uuid(row.try_get::<Uuid, _>("martian_id")?);
        let supply_id = SupplyId::from_uuid(row.try_get::<Uuid, _>("supply_id")?);
        let quantity: i64 = row.try_get("quantity")?;
        if quantity > 0 {
            holdings.entry(martian_id).or_default().insert(supply_id, quantity);
        }
    }
    Ok(holdings)
}

#[async_trait]
impl TradeStore for PostgresStore {
    async fn create_martian(&self, martian: Martian) -> StoreResult<MartianRecord> {
        sqlx::query(
            r#"
            INSERT INTO martians (id, name, age, gender, trade)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(martian.id().as_uuid())
        .bind(martian.name())
        .bind(martian.age())
        .bind(martian.gender())
        .bind(martian.can_trade())
        .execute(&self.pool)
        .await?;

        let mut conn = self.pool.acquire().await?;
        fetch_martian_record(&mut conn, martian.id())
            .await?
            .ok_or(StoreError::Domain(DomainError::NotFound))
    }

    async fn get_martian(&self, id: MartianId) -> StoreResult<MartianRecord> {
        let mut conn = self.pool.acquire().await?;
        fetch_martian_record(&mut conn, id)
            .await?
            .ok_or(StoreError::Domain(DomainError::NotFound))
    }

    async fn list_martians(&self) -> StoreResult<Vec<MartianRecord>> {
        let martian_rows = sqlx::query(
            r#"
            SELECT id, name, age, gender, trade
            FROM martians
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let inventory_rows = sqlx::query(
            r#"
            SELECT martian_id, supply_id, quantity
            FROM inventories
            WHERE quantity > 0
            ORDER BY martian_id, supply_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut by_martian: HashMap<MartianId, Vec<InventoryEntry>> = HashMap::new();
        for row in inventory_rows {
            let martian_id = MartianId::from_uuid(row.try_get::<Uuid, _>("martian_id")?);
            by_martian.entry(martian_id).or_default().push(InventoryEntry {
                supply_id: SupplyId::from_uuid(row.try_get::<Uuid, _>("supply_id")?),
                quantity: row.try_get("quantity")?,
            });
        }

        martian_rows
            .into_iter()
            .map(|row| {
                let id = MartianId::from_uuid(row.try_get::<Uuid, _>("id")?);
                Ok(MartianRecord {
                    id,
                    name: row.try_get("name")?,
                    age: row.try_get("age")?,
                    gender: row.try_get("gender")?,
                    trade: row.try_get("trade")?,
                    inventories: by_martian.remove(&id).unwrap_or_default(),
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .map_err(StoreError::from)
    }

    async fn update_martian(
        &self,
        id: MartianId,
        update: MartianUpdate,
    ) -> StoreResult<MartianRecord> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            r#"
            SELECT name, age, gender, trade
            FROM martians
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(StoreError::Domain(DomainError::NotFound))?;

        let current = Martian::new(
            id,
            row.try_get::<String, _>("name")?,
            row.try_get("age")?,
            row.try_get::<String, _>("gender")?,
            row.try_get("trade")?,
        )?;
        let updated = current.apply_update(update)?;

        sqlx::query(
            r#"
            UPDATE martians
            SET name = $2, age = $3, gender = $4, trade = $5, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(updated.name())
        .bind(updated.age())
        .bind(updated.gender())
        .bind(updated.can_trade())
        .execute(&mut *tx)
        .await?;

        let record = fetch_martian_record(&mut tx, id)
            .await?
            .ok_or(StoreError::Domain(DomainError::NotFound))?;
        tx.commit().await?;
        Ok(record)
    }

    async fn delete_martian(&self, id: MartianId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM martians WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::Domain(DomainError::NotFound));
        }
        Ok(())
    }

    async fn create_supply(&self, supply: Supply) -> StoreResult<SupplyRecord> {
        sqlx::query(
            r#"
            INSERT INTO supplies (id, name, value)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(supply.id().as_uuid())
        .bind(supply.name())
        .bind(supply.value().get())
        .execute(&self.pool)
        .await?;

        Ok(SupplyRecord {
            id: supply.id(),
            name: supply.name().to_string(),
            value: supply.value().get(),
        })
    }

    async fn get_supply(&self, id: SupplyId) -> StoreResult<SupplyRecord> {
        let row = sqlx::query("SELECT id, name, value FROM supplies WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::Domain(DomainError::NotFound))?;

        Ok(SupplyRecord {
            id: SupplyId::from_uuid(row.try_get::<Uuid, _>("id")?),
            name: row.try_get("name")?,
            value: row.try_get("value")?,
        })
    }

    async fn list_supplies(&self) -> StoreResult<Vec<SupplyRecord>> {
        sqlx::query("SELECT id, name, value FROM supplies ORDER BY id")
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(|row| {
                Ok(SupplyRecord {
                    id: SupplyId::from_uuid(row.try_get::<Uuid, _>("id")?),
                    name: row.try_get("name")?,
                    value: row.try_get("value")?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .map_err(StoreError::from)
    }

    async fn update_supply(&self, supply: Supply) -> StoreResult<SupplyRecord> {
        let result = sqlx::query(
            r#"
            UPDATE supplies
            SET name = $2, value = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(supply.id().as_uuid())
        .bind(supply.name())
        .bind(supply.value().get())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Domain(DomainError::NotFound));
        }
        Ok(SupplyRecord {
            id: supply.id(),
            name: supply.name().to_string(),
            value: supply.value().get(),
        })
    }

    async fn delete_supply(&self, id: SupplyId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM supplies WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::Domain(DomainError::NotFound));
        }
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

        if quantity == 0 {
            sqlx::query("DELETE FROM inventories WHERE martian_id = $1 AND supply_id = $2")
                .bind(martian_id.as_uuid())
                .bind(supply_id.as_uuid())
                .execute(&self.pool)
                .await?;
            return Ok(());
        }

        let result = sqlx::query(
            r#"
            INSERT INTO inventories (martian_id, supply_id, quantity)
            SELECT $1, $2, $3
            WHERE EXISTS (SELECT 1 FROM martians WHERE id = $1)
              AND EXISTS (SELECT 1 FROM supplies WHERE id = $2)
            ON CONFLICT (martian_id, supply_id)
            DO UPDATE SET quantity = EXCLUDED.quantity, updated_at = NOW()
            "#,
        )
        .bind(martian_id.as_uuid())
        .bind(supply_id.as_uuid())
        .bind(quantity)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Domain(DomainError::NotFound));
        }
        Ok(())
    }

    async fn execute_trade(&self, order: TradeOrder) -> StoreResult<MartianRecord> {
        let mut tx = self.pool.begin().await?;

        // Stable lock order: lowest id first.
        let (first, second) = if order.initiator().as_uuid() <= order.partner().as_uuid() {
            (order.initiator(), order.partner())
        } else {
            (order.partner(), order.initiator())
        };
        let (first_name, first_trade) = lock_martian(&mut tx, first).await?;
        let (second_name, second_trade) = lock_martian(&mut tx, second).await?;

        let mut holdings = fetch_holdings(&mut tx, first, second).await?;

        let mut party = |id: MartianId| -> TradingParty {
            let (name, trade) = if id == first {
                (first_name.clone(), first_trade)
            } else {
                (second_name.clone(), second_trade)
            };
            TradingParty {
                id,
                name,
                trade,
                holdings: holdings.remove(&id).unwrap_or_default(),
            }
        };
        let initiator = party(order.initiator());
        let partner = party(order.partner());

        // Catalog values for every supply referenced by either bundle; the
        // planner reports any id the query did not return.
        let referenced: Vec<Uuid> = order
            .offered()
            .iter()
            .chain(order.counter().iter())
            .map(|(id, _)| *id.as_uuid())
            .collect();
        let mut values: HashMap<SupplyId, i64> = HashMap::new();
        for row in sqlx::query("SELECT id, value FROM supplies WHERE id = ANY($1)")
            .bind(&referenced)
            .fetch_all(&mut *tx)
            .await?
        {
            values.insert(
                SupplyId::from_uuid(row.try_get::<Uuid, _>("id")?),
                row.try_get("value")?,
            );
        }

        let plan = plan_trade(&order, &initiator, &partner, &values)?;

        for delta in plan.deltas() {
            sqlx::query(
                r#"
                INSERT INTO inventories (martian_id, supply_id, quantity)
                VALUES ($1, $2, $3)
                ON CONFLICT (martian_id, supply_id)
                DO UPDATE SET quantity = inventories.quantity + EXCLUDED.quantity,
                              updated_at = NOW()
                "#,
            )
            .bind(delta.martian_id.as_uuid())
            .bind(delta.supply_id.as_uuid())
            .bind(delta.delta)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(
            r#"
            DELETE FROM inventories
            WHERE (martian_id = $1 OR martian_id = $2) AND quantity = 0
            "#,
        )
        .bind(first.as_uuid())
        .bind(second.as_uuid())
        .execute(&mut *tx)
        .await?;

        let record = fetch_martian_record(&mut tx, order.initiator())
            .await?
            .ok_or(StoreError::Domain(DomainError::NotFound))?;

        tx.commit().await?;
        Ok(record)
    }
}

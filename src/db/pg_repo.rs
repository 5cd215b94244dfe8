// src/db/pg_repo.rs
//
// Postgres implementation of the warehouse port. Commits run inside one
// transaction; every item update is guarded by `WHERE version = $n`, so a
// concurrent writer makes `rows_affected` come back 0 and the transaction
// rolls back untouched. Idempotency rides on the status row, claimed with
// `FOR UPDATE` at the top of each commit.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::warehouse_repo::{CommitOutcome, WarehouseRepository},
    models::{
        orders::{NewOrder, Order, OrderStatus},
        purchases::{
            NewPurchase, Purchase, PurchaseLineItem, PurchaseStatus, normalize_line_items,
            normalize_line_items_lenient,
        },
        warehouse::{InventoryItem, NewInventoryItem, StockMovement, StockMutation},
    },
};

#[derive(Clone)]
pub struct PgWarehouseRepository {
    pool: PgPool,
}

impl PgWarehouseRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Raw purchase row; `line_items` stays JSONB until the ingestion boundary
// has normalized it.
#[derive(sqlx::FromRow)]
struct PurchaseRow {
    id: Uuid,
    supplier: String,
    status: PurchaseStatus,
    total_value: Decimal,
    line_items: serde_json::Value,
    completed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl PurchaseRow {
    fn into_purchase(self) -> Result<Purchase, AppError> {
        let line_items =
            normalize_line_items(&self.line_items).map_err(AppError::InvalidLineItems)?;
        Ok(Purchase {
            id: self.id,
            supplier: self.supplier,
            status: self.status,
            total_value: self.total_value,
            line_items,
            completed_at: self.completed_at,
            created_at: self.created_at,
        })
    }
}

#[async_trait]
impl WarehouseRepository for PgWarehouseRepository {
    async fn insert_item(&self, new_item: NewInventoryItem) -> Result<InventoryItem, AppError> {
        let item = sqlx::query_as::<_, InventoryItem>(
            r#"
            INSERT INTO inventory_items (name, category, unit, minimum_stock)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(new_item.name)
        .bind(new_item.category)
        .bind(new_item.unit)
        .bind(new_item.minimum_stock)
        .fetch_one(&self.pool)
        .await?;
        Ok(item)
    }

    async fn list_items(&self) -> Result<Vec<InventoryItem>, AppError> {
        let items = sqlx::query_as::<_, InventoryItem>(
            "SELECT * FROM inventory_items ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    async fn get_item(&self, item_id: Uuid) -> Result<Option<InventoryItem>, AppError> {
        let item = sqlx::query_as::<_, InventoryItem>(
            "SELECT * FROM inventory_items WHERE id = $1",
        )
        .bind(item_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(item)
    }

    async fn list_movements(&self, item_id: Uuid) -> Result<Vec<StockMovement>, AppError> {
        let movements = sqlx::query_as::<_, StockMovement>(
            "SELECT * FROM stock_movements WHERE item_id = $1 ORDER BY created_at DESC",
        )
        .bind(item_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(movements)
    }

    async fn insert_purchase(&self, new_purchase: NewPurchase) -> Result<Purchase, AppError> {
        let line_items =
            serde_json::to_value(&new_purchase.line_items).map_err(anyhow::Error::from)?;
        let row = sqlx::query_as::<_, PurchaseRow>(
            r#"
            INSERT INTO purchases (supplier, total_value, line_items)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(new_purchase.supplier)
        .bind(new_purchase.total_value)
        .bind(line_items)
        .fetch_one(&self.pool)
        .await?;
        row.into_purchase()
    }

    async fn get_purchase(&self, purchase_id: Uuid) -> Result<Option<Purchase>, AppError> {
        let row = sqlx::query_as::<_, PurchaseRow>("SELECT * FROM purchases WHERE id = $1")
            .bind(purchase_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(PurchaseRow::into_purchase).transpose()
    }

    async fn completed_line_items_for(
        &self,
        item_id: Uuid,
    ) -> Result<Vec<PurchaseLineItem>, AppError> {
        // Historical rows carry several generations of field names, so the
        // matching happens after normalization, not in SQL.
        let rows = sqlx::query_as::<_, (serde_json::Value,)>(
            "SELECT line_items FROM purchases WHERE status = 'completed'",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .flat_map(|(value,)| normalize_line_items_lenient(value))
            .filter(|line| line.item_id == item_id)
            .collect())
    }

    async fn insert_order(&self, new_order: NewOrder) -> Result<Order, AppError> {
        let order = sqlx::query_as::<_, Order>(
            r#"
            INSERT INTO orders (order_number, customer_name, total_amount)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(new_order.order_number)
        .bind(new_order.customer_name)
        .bind(new_order.total_amount)
        .fetch_one(&self.pool)
        .await?;
        Ok(order)
    }

    async fn get_order(&self, order_id: Uuid) -> Result<Option<Order>, AppError> {
        let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(order)
    }

    async fn commit_purchase_completion(
        &self,
        purchase_id: Uuid,
        mutations: &[StockMutation],
    ) -> Result<CommitOutcome, AppError> {
        let mut tx = self.pool.begin().await?;

        let status = sqlx::query_as::<_, (PurchaseStatus,)>(
            "SELECT status FROM purchases WHERE id = $1 FOR UPDATE",
        )
        .bind(purchase_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::PurchaseNotFound(purchase_id))?
        .0;

        match status {
            PurchaseStatus::Completed => return Ok(CommitOutcome::AlreadyApplied),
            PurchaseStatus::Cancelled => {
                return Err(AppError::PurchaseNotCompletable {
                    purchase_id,
                    status: "cancelled".to_string(),
                });
            }
            PurchaseStatus::Pending => {}
        }

        if !apply_mutations(&mut tx, mutations).await? {
            return Ok(CommitOutcome::Conflict);
        }

        sqlx::query("UPDATE purchases SET status = 'completed', completed_at = now() WHERE id = $1")
            .bind(purchase_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(CommitOutcome::Applied)
    }

    async fn commit_order_completion(
        &self,
        order_id: Uuid,
        mutations: &[StockMutation],
    ) -> Result<CommitOutcome, AppError> {
        // Negative stock is never persisted, even on a stale plan.
        if mutations.iter().any(|m| m.new_stock < Decimal::ZERO) {
            return Ok(CommitOutcome::Conflict);
        }

        let mut tx = self.pool.begin().await?;

        let status = sqlx::query_as::<_, (OrderStatus,)>(
            "SELECT status FROM orders WHERE id = $1 FOR UPDATE",
        )
        .bind(order_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::OrderNotFound(order_id))?
        .0;

        match status {
            OrderStatus::Completed => return Ok(CommitOutcome::AlreadyApplied),
            OrderStatus::Cancelled => {
                return Err(AppError::OrderNotCompletable {
                    order_id,
                    status: "cancelled".to_string(),
                });
            }
            _ => {}
        }

        if !apply_mutations(&mut tx, mutations).await? {
            return Ok(CommitOutcome::Conflict);
        }

        sqlx::query("UPDATE orders SET status = 'completed', completed_at = now() WHERE id = $1")
            .bind(order_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(CommitOutcome::Applied)
    }

    async fn commit_adjustment(&self, mutation: &StockMutation) -> Result<CommitOutcome, AppError> {
        if mutation.new_stock < Decimal::ZERO {
            return Ok(CommitOutcome::Conflict);
        }

        let mut tx = self.pool.begin().await?;

        if !apply_mutations(&mut tx, std::slice::from_ref(mutation)).await? {
            // Distinguish a missing item from a lost race.
            let exists = sqlx::query_as::<_, (Uuid,)>(
                "SELECT id FROM inventory_items WHERE id = $1",
            )
            .bind(mutation.item_id)
            .fetch_optional(&self.pool)
            .await?;
            return match exists {
                None => Err(AppError::ItemNotFound(mutation.item_id)),
                Some(_) => Ok(CommitOutcome::Conflict),
            };
        }

        tx.commit().await?;
        Ok(CommitOutcome::Applied)
    }

    async fn fill_missing_wac(
        &self,
        item_id: Uuid,
        expected_version: i64,
        wac: Decimal,
    ) -> Result<CommitOutcome, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE inventory_items
            SET current_wac = $1, version = version + 1,
                last_recalculated_at = now(), updated_at = now()
            WHERE id = $2 AND version = $3
              AND (current_wac IS NULL OR current_wac <= 0)
            "#,
        )
        .bind(wac)
        .bind(item_id)
        .bind(expected_version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(CommitOutcome::Applied);
        }

        // Nothing was written: either the item vanished, someone already
        // valued it, or the version moved.
        let row = sqlx::query_as::<_, (Option<Decimal>,)>(
            "SELECT current_wac FROM inventory_items WHERE id = $1",
        )
        .bind(item_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            None => Err(AppError::ItemNotFound(item_id)),
            Some((Some(current),)) if current > Decimal::ZERO => Ok(CommitOutcome::AlreadyApplied),
            Some(_) => Ok(CommitOutcome::Conflict),
        }
    }
}

// Applies every item update and its movement row inside the caller's
// transaction. Returns false (caller rolls back) as soon as one version
// check fails.
async fn apply_mutations(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    mutations: &[StockMutation],
) -> Result<bool, AppError> {
    for m in mutations {
        let updated = sqlx::query(
            r#"
            UPDATE inventory_items
            SET current_stock = $1, current_wac = $2, version = version + 1,
                last_recalculated_at = now(), updated_at = now()
            WHERE id = $3 AND version = $4
            "#,
        )
        .bind(m.new_stock)
        .bind(m.new_wac)
        .bind(m.item_id)
        .bind(m.expected_version)
        .execute(&mut **tx)
        .await?;

        if updated.rows_affected() != 1 {
            return Ok(false);
        }

        sqlx::query(
            r#"
            INSERT INTO stock_movements (item_id, quantity_changed, reason, unit_cost, correlation_id)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(m.item_id)
        .bind(m.delta)
        .bind(m.reason)
        .bind(m.movement_unit_cost)
        .bind(m.correlation_id)
        .execute(&mut **tx)
        .await?;
    }
    Ok(true)
}

// src/db/memory_repo.rs
//
// In-memory implementation of the warehouse port. Used by the test suites
// and for local development without Postgres. One async mutex around the
// whole state gives the same commit atomicity the Postgres implementation
// gets from a transaction; the version checks are honored so the engine's
// retry path is exercised for real.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::warehouse_repo::{CommitOutcome, WarehouseRepository},
    models::{
        orders::{NewOrder, Order, OrderStatus},
        purchases::{NewPurchase, Purchase, PurchaseLineItem, PurchaseStatus},
        warehouse::{InventoryItem, NewInventoryItem, StockMovement, StockMutation},
    },
};

#[derive(Default)]
struct MemoryState {
    items: HashMap<Uuid, InventoryItem>,
    purchases: HashMap<Uuid, Purchase>,
    orders: HashMap<Uuid, Order>,
    movements: Vec<StockMovement>,
}

#[derive(Default)]
pub struct MemoryWarehouseRepository {
    state: Mutex<MemoryState>,
}

impl MemoryWarehouseRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MemoryState {
    // Checks every version before touching anything, so a conflict leaves
    // the state exactly as it was.
    fn versions_match(&self, mutations: &[StockMutation]) -> bool {
        mutations.iter().all(|m| {
            self.items
                .get(&m.item_id)
                .is_some_and(|item| item.version == m.expected_version)
        })
    }

    fn apply_mutations(&mut self, mutations: &[StockMutation]) {
        let now = Utc::now();
        for m in mutations {
            if let Some(item) = self.items.get_mut(&m.item_id) {
                item.current_stock = m.new_stock;
                item.current_wac = m.new_wac;
                item.version += 1;
                item.last_recalculated_at = Some(now);
                item.updated_at = now;
            }
            self.movements.push(StockMovement {
                id: Uuid::new_v4(),
                item_id: m.item_id,
                quantity_changed: m.delta,
                reason: m.reason,
                unit_cost: m.movement_unit_cost,
                correlation_id: m.correlation_id,
                created_at: now,
            });
        }
    }
}

#[async_trait]
impl WarehouseRepository for MemoryWarehouseRepository {
    async fn insert_item(&self, new_item: NewInventoryItem) -> Result<InventoryItem, AppError> {
        let now = Utc::now();
        let item = InventoryItem {
            id: Uuid::new_v4(),
            name: new_item.name,
            category: new_item.category,
            unit: new_item.unit,
            current_stock: Decimal::ZERO,
            current_wac: None,
            minimum_stock: new_item.minimum_stock,
            last_recalculated_at: None,
            version: 0,
            created_at: now,
            updated_at: now,
        };
        self.state.lock().await.items.insert(item.id, item.clone());
        Ok(item)
    }

    async fn list_items(&self) -> Result<Vec<InventoryItem>, AppError> {
        let state = self.state.lock().await;
        let mut items: Vec<_> = state.items.values().cloned().collect();
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(items)
    }

    async fn get_item(&self, item_id: Uuid) -> Result<Option<InventoryItem>, AppError> {
        Ok(self.state.lock().await.items.get(&item_id).cloned())
    }

    async fn list_movements(&self, item_id: Uuid) -> Result<Vec<StockMovement>, AppError> {
        let state = self.state.lock().await;
        let mut movements: Vec<_> = state
            .movements
            .iter()
            .filter(|m| m.item_id == item_id)
            .cloned()
            .collect();
        movements.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(movements)
    }

    async fn insert_purchase(&self, new_purchase: NewPurchase) -> Result<Purchase, AppError> {
        let purchase = Purchase {
            id: Uuid::new_v4(),
            supplier: new_purchase.supplier,
            status: PurchaseStatus::Pending,
            total_value: new_purchase.total_value,
            line_items: new_purchase.line_items,
            completed_at: None,
            created_at: Utc::now(),
        };
        self.state
            .lock()
            .await
            .purchases
            .insert(purchase.id, purchase.clone());
        Ok(purchase)
    }

    async fn get_purchase(&self, purchase_id: Uuid) -> Result<Option<Purchase>, AppError> {
        Ok(self.state.lock().await.purchases.get(&purchase_id).cloned())
    }

    async fn completed_line_items_for(
        &self,
        item_id: Uuid,
    ) -> Result<Vec<PurchaseLineItem>, AppError> {
        let state = self.state.lock().await;
        Ok(state
            .purchases
            .values()
            .filter(|p| p.status == PurchaseStatus::Completed)
            .flat_map(|p| p.line_items.iter())
            .filter(|l| l.item_id == item_id)
            .cloned()
            .collect())
    }

    async fn insert_order(&self, new_order: NewOrder) -> Result<Order, AppError> {
        let order = Order {
            id: Uuid::new_v4(),
            order_number: new_order.order_number,
            customer_name: new_order.customer_name,
            status: OrderStatus::Pending,
            total_amount: new_order.total_amount,
            completed_at: None,
            created_at: Utc::now(),
        };
        self.state.lock().await.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn get_order(&self, order_id: Uuid) -> Result<Option<Order>, AppError> {
        Ok(self.state.lock().await.orders.get(&order_id).cloned())
    }

    async fn commit_purchase_completion(
        &self,
        purchase_id: Uuid,
        mutations: &[StockMutation],
    ) -> Result<CommitOutcome, AppError> {
        let mut state = self.state.lock().await;

        let status = match state.purchases.get(&purchase_id) {
            Some(p) => p.status,
            None => return Err(AppError::PurchaseNotFound(purchase_id)),
        };
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

        if !state.versions_match(mutations) {
            return Ok(CommitOutcome::Conflict);
        }

        state.apply_mutations(mutations);
        if let Some(p) = state.purchases.get_mut(&purchase_id) {
            p.status = PurchaseStatus::Completed;
            p.completed_at = Some(Utc::now());
        }
        Ok(CommitOutcome::Applied)
    }

    async fn commit_order_completion(
        &self,
        order_id: Uuid,
        mutations: &[StockMutation],
    ) -> Result<CommitOutcome, AppError> {
        let mut state = self.state.lock().await;

        let status = match state.orders.get(&order_id) {
            Some(o) => o.status,
            None => return Err(AppError::OrderNotFound(order_id)),
        };
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

        // Negative stock must never be persisted, even if the engine handed
        // us a stale computation.
        if !state.versions_match(mutations)
            || mutations.iter().any(|m| m.new_stock < Decimal::ZERO)
        {
            return Ok(CommitOutcome::Conflict);
        }

        state.apply_mutations(mutations);
        if let Some(o) = state.orders.get_mut(&order_id) {
            o.status = OrderStatus::Completed;
            o.completed_at = Some(Utc::now());
        }
        Ok(CommitOutcome::Applied)
    }

    async fn commit_adjustment(&self, mutation: &StockMutation) -> Result<CommitOutcome, AppError> {
        let mut state = self.state.lock().await;

        if !state.items.contains_key(&mutation.item_id) {
            return Err(AppError::ItemNotFound(mutation.item_id));
        }
        let mutations = std::slice::from_ref(mutation);
        if !state.versions_match(mutations) || mutation.new_stock < Decimal::ZERO {
            return Ok(CommitOutcome::Conflict);
        }

        state.apply_mutations(mutations);
        Ok(CommitOutcome::Applied)
    }

    async fn fill_missing_wac(
        &self,
        item_id: Uuid,
        expected_version: i64,
        wac: Decimal,
    ) -> Result<CommitOutcome, AppError> {
        let mut state = self.state.lock().await;
        let item = state
            .items
            .get_mut(&item_id)
            .ok_or(AppError::ItemNotFound(item_id))?;

        if item.has_valid_wac() {
            return Ok(CommitOutcome::AlreadyApplied);
        }
        if item.version != expected_version {
            return Ok(CommitOutcome::Conflict);
        }

        let now = Utc::now();
        item.current_wac = Some(wac);
        item.version += 1;
        item.last_recalculated_at = Some(now);
        item.updated_at = now;
        Ok(CommitOutcome::Applied)
    }
}

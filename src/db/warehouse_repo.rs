// src/db/warehouse_repo.rs

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        orders::{NewOrder, Order},
        purchases::{NewPurchase, Purchase, PurchaseLineItem},
        warehouse::{InventoryItem, NewInventoryItem, StockMovement, StockMutation},
    },
};

/// Result of a versioned commit attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The commit went through; every row was written.
    Applied,
    /// The correlation id (purchase/order) was already in its terminal state,
    /// or the value to fill was already present. Nothing was written.
    AlreadyApplied,
    /// At least one item's version no longer matched. Nothing was written;
    /// the caller should re-read and retry.
    Conflict,
}

/// The persistence port for the whole subsystem. The stock mutation engine
/// and the repair utility receive an implementation of this trait; they never
/// reach out to an ambient client.
///
/// Contract for the `commit_*` methods: the status claim, every item update
/// and every movement row happen in one atomic unit. A version mismatch on
/// any item aborts the whole unit with `Conflict` and no partial write.
/// Idempotency rides on the status claim itself: a purchase or order that is
/// already completed yields `AlreadyApplied` instead of a second application.
#[async_trait]
pub trait WarehouseRepository: Send + Sync {
    // --- Inventory items ---
    async fn insert_item(&self, new_item: NewInventoryItem) -> Result<InventoryItem, AppError>;
    async fn list_items(&self) -> Result<Vec<InventoryItem>, AppError>;
    async fn get_item(&self, item_id: Uuid) -> Result<Option<InventoryItem>, AppError>;
    async fn list_movements(&self, item_id: Uuid) -> Result<Vec<StockMovement>, AppError>;

    // --- Purchase ledger ---
    async fn insert_purchase(&self, new_purchase: NewPurchase) -> Result<Purchase, AppError>;
    async fn get_purchase(&self, purchase_id: Uuid) -> Result<Option<Purchase>, AppError>;
    /// Every line of every *completed* purchase that references the item,
    /// already normalized into the canonical shape.
    async fn completed_line_items_for(
        &self,
        item_id: Uuid,
    ) -> Result<Vec<PurchaseLineItem>, AppError>;

    // --- Orders ---
    async fn insert_order(&self, new_order: NewOrder) -> Result<Order, AppError>;
    async fn get_order(&self, order_id: Uuid) -> Result<Option<Order>, AppError>;

    // --- Atomic commits (the only writers of stock and WAC) ---
    async fn commit_purchase_completion(
        &self,
        purchase_id: Uuid,
        mutations: &[StockMutation],
    ) -> Result<CommitOutcome, AppError>;

    async fn commit_order_completion(
        &self,
        order_id: Uuid,
        mutations: &[StockMutation],
    ) -> Result<CommitOutcome, AppError>;

    /// Single-item manual adjustment. No status row to claim, so the version
    /// check is the whole discipline; the caller retries on `Conflict`.
    async fn commit_adjustment(&self, mutation: &StockMutation) -> Result<CommitOutcome, AppError>;

    /// Repair write: sets the WAC only if it is still missing (NULL or <= 0)
    /// and the row version is unchanged. Never overwrites a valid value.
    async fn fill_missing_wac(
        &self,
        item_id: Uuid,
        expected_version: i64,
        wac: Decimal,
    ) -> Result<CommitOutcome, AppError>;
}

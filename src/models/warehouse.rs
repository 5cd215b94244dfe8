// src/models/warehouse.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// --- 1. Inventory Item (one row per raw material) ---
// `current_wac` is the weighted average cost per unit. `None` means the item
// is still unvalued (no pricing signal yet), which is NOT the same as a cost
// of zero.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    pub unit: String,

    pub current_stock: Decimal,
    pub current_wac: Option<Decimal>,

    // Low-stock alert threshold, display data for the warehouse screen.
    pub minimum_stock: Decimal,

    pub last_recalculated_at: Option<DateTime<Utc>>,

    // Bumped on every stock mutation; the optimistic-concurrency token.
    pub version: i64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InventoryItem {
    // An item is valued once it has a positive WAC. `Some(0)` can only come
    // from legacy rows and counts as unvalued for repair purposes.
    pub fn has_valid_wac(&self) -> bool {
        matches!(self.current_wac, Some(wac) if wac > Decimal::ZERO)
    }
}

// Carrier for item registration. Stock always starts at zero and unvalued;
// only the stock mutation engine moves it from there.
#[derive(Debug, Clone)]
pub struct NewInventoryItem {
    pub name: String,
    pub category: String,
    pub unit: String,
    pub minimum_stock: Decimal,
}

// --- 2. Stock movements (the audit ledger) ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "stock_movement_reason", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum StockMovementReason {
    PurchaseCompleted,
    OrderCompleted,
    ManualAdjustment,
}

// Append-only history row, written in the same transaction as the item
// mutation it records.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockMovement {
    pub id: Uuid,
    pub item_id: Uuid,
    pub quantity_changed: Decimal,
    pub reason: StockMovementReason,
    pub unit_cost: Option<Decimal>,
    // The purchase or order id this movement belongs to.
    pub correlation_id: Uuid,
    pub created_at: DateTime<Utc>,
}

// --- 3. Stock mutation (ephemeral unit of work) ---
// Built by the stock mutation engine, applied atomically by the repository.
// `expected_version` must still match the item row at commit time.
#[derive(Debug, Clone)]
pub struct StockMutation {
    pub item_id: Uuid,
    pub delta: Decimal,
    pub reason: StockMovementReason,
    pub correlation_id: Uuid,

    pub expected_version: i64,
    pub new_stock: Decimal,
    pub new_wac: Option<Decimal>,
    // Weighted receipt cost, recorded on the movement row for receipts.
    pub movement_unit_cost: Option<Decimal>,
}

// --- 4. Shortage report element ---
// Every insufficient-stock failure names each deficient item and by how much.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockShortage {
    pub item_id: Uuid,
    pub name: String,
    pub required: Decimal,
    pub available: Decimal,
    pub shortfall: Decimal,
}

// --- 5. Reconciliation report ---
// Stored (incrementally maintained) WAC against a fresh full-ledger
// computation. `drift` is only meaningful when both sides carry a value.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockReconciliation {
    pub item_id: Uuid,
    pub name: String,
    pub current_stock: Decimal,
    pub stored_wac: Option<Decimal>,
    pub ledger_wac: Option<Decimal>,
    pub drift: Option<Decimal>,
    pub consistent: bool,
}

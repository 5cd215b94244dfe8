// src/models/orders.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// The original status ladder. Only the transition into `Completed` touches
// stock; everything before it is bookkeeping for the order screens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "order_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Processing,
    Ready,
    Delivered,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub customer_name: String,
    pub status: OrderStatus,
    pub total_amount: Decimal,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_number: String,
    pub customer_name: String,
    pub total_amount: Decimal,
}

// One ingredient requirement for completing an order. Exploding recipes into
// these lines is the order workflow's job, upstream of this subsystem.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RequiredLineItem {
    pub item_id: Uuid,
    pub quantity_needed: Decimal,
}

// One line of the audit trail a successful completion hands back to the
// caller: which item lost how much stock.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeductedItem {
    pub item_id: Uuid,
    pub name: String,
    pub quantity_deducted: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderCompletionResult {
    pub success: bool,
    pub order_number: String,
    pub total_amount: Decimal,
    pub stock_items_updated: usize,
    // True when the order had already been completed and this call changed
    // nothing (retried completions are no-ops, never a second deduction).
    pub already_completed: bool,
    pub deductions: Vec<DeductedItem>,
}

// Dry-run of the sufficiency check, for UI validation before committing.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CanCompleteReport {
    pub can_complete: bool,
    pub already_completed: bool,
    pub total_ingredients: usize,
    pub available_ingredients: usize,
    pub insufficient_stock: Vec<crate::models::warehouse::StockShortage>,
}

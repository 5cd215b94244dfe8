// src/models/purchases.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

// --- 1. Purchase status ---
// One-directional: pending -> completed or pending -> cancelled. A completed
// purchase never changes again; reversal would be a separate operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "purchase_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PurchaseStatus {
    Pending,
    Completed,
    Cancelled,
}

// --- 2. Canonical purchase line item ---
// The single shape the rest of the domain sees. Anything read from storage
// goes through `RawPurchaseLineItem` first.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseLineItem {
    pub item_id: Uuid,
    pub quantity_received: Decimal,
    pub unit_cost: Decimal,
}

impl PurchaseLineItem {
    // Only lines with both a positive quantity and a positive cost carry a
    // pricing signal for WAC purposes.
    pub fn has_pricing_signal(&self) -> bool {
        self.quantity_received > Decimal::ZERO && self.unit_cost > Decimal::ZERO
    }
}

// --- 3. Purchase ---
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Purchase {
    pub id: Uuid,
    pub supplier: String,
    pub status: PurchaseStatus,
    pub total_value: Decimal,
    pub line_items: Vec<PurchaseLineItem>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPurchase {
    pub supplier: String,
    pub line_items: Vec<PurchaseLineItem>,
    pub total_value: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseCompletionResult {
    pub purchase_id: Uuid,
    pub stock_items_updated: usize,
    // True when the purchase was already completed and this call changed
    // nothing (retried completions never double-count stock).
    pub already_completed: bool,
}

// --- 4. Ingestion adapter ---
// Historical purchase rows carry several generations of field names
// (`jumlah`/`kuantitas`/`quantity`, `hargaSatuan`/`harga_satuan`/`price`,
// `bahanBakuId`/`bahan_baku_id`/`id`) and decimals that may arrive as JSON
// numbers or strings. They are normalized into `PurchaseLineItem` here, at
// the ledger's read boundary, and nowhere else.
#[derive(Debug, Clone, Deserialize)]
pub struct RawPurchaseLineItem {
    #[serde(
        default,
        alias = "itemId",
        alias = "bahanBakuId",
        alias = "bahan_baku_id",
        alias = "id"
    )]
    pub item_id: Option<Uuid>,

    #[serde(
        default,
        deserialize_with = "lenient_decimal",
        alias = "quantityReceived",
        alias = "quantity",
        alias = "jumlah",
        alias = "kuantitas"
    )]
    pub quantity_received: Decimal,

    #[serde(
        default,
        deserialize_with = "lenient_decimal",
        alias = "unitCost",
        alias = "unitPrice",
        alias = "unit_price",
        alias = "hargaSatuan",
        alias = "harga_satuan",
        alias = "harga_per_satuan",
        alias = "price"
    )]
    pub unit_cost: Decimal,

    #[serde(default, deserialize_with = "lenient_decimal")]
    pub subtotal: Decimal,
}

impl RawPurchaseLineItem {
    /// Normalizes a raw line into the canonical shape, or explains why it
    /// cannot contribute to the ledger.
    pub fn normalize(&self) -> Result<PurchaseLineItem, String> {
        let item_id = self
            .item_id
            .ok_or_else(|| "line item has no recognizable item id".to_string())?;

        if self.quantity_received <= Decimal::ZERO {
            return Err(format!(
                "line item {item_id} has non-positive quantity {}",
                self.quantity_received
            ));
        }

        // No explicit unit price: fall back to subtotal / quantity. Zero is
        // still allowed (free or sample stock) and handled downstream.
        let unit_cost = if self.unit_cost > Decimal::ZERO {
            self.unit_cost
        } else if self.subtotal > Decimal::ZERO {
            self.subtotal / self.quantity_received
        } else {
            Decimal::ZERO
        };

        Ok(PurchaseLineItem {
            item_id,
            quantity_received: self.quantity_received,
            unit_cost,
        })
    }
}

/// Decodes a stored JSONB array into canonical line items. Every line must
/// normalize; any that cannot are reported together so the caller can refuse
/// the purchase with the full list of problems.
pub fn normalize_line_items(value: &Value) -> Result<Vec<PurchaseLineItem>, Vec<String>> {
    let entries = match value.as_array() {
        Some(entries) => entries,
        None => return Err(vec!["line items are not a JSON array".to_string()]),
    };

    let mut lines = Vec::with_capacity(entries.len());
    let mut problems = Vec::new();
    for (index, entry) in entries.iter().enumerate() {
        match serde_json::from_value::<RawPurchaseLineItem>(entry.clone()) {
            Ok(raw) => match raw.normalize() {
                Ok(line) => lines.push(line),
                Err(problem) => problems.push(format!("line {index}: {problem}")),
            },
            Err(e) => problems.push(format!("line {index}: unreadable line item ({e})")),
        }
    }

    if problems.is_empty() { Ok(lines) } else { Err(problems) }
}

/// Lenient variant for the diagnostics path: unreadable lines are logged and
/// skipped instead of failing the read, so one corrupt historical purchase
/// cannot hide the rest of an item's ledger.
pub fn normalize_line_items_lenient(value: &Value) -> Vec<PurchaseLineItem> {
    let entries = match value.as_array() {
        Some(entries) => entries,
        None => {
            tracing::warn!("purchase line items are not a JSON array, skipping");
            return Vec::new();
        }
    };

    entries
        .iter()
        .filter_map(|entry| {
            serde_json::from_value::<RawPurchaseLineItem>(entry.clone())
                .map_err(|e| tracing::warn!("skipping unreadable line item: {e}"))
                .ok()
                .and_then(|raw| {
                    raw.normalize()
                        .map_err(|problem| tracing::warn!("skipping line item: {problem}"))
                        .ok()
                })
        })
        .collect()
}

// Accepts a JSON number, a numeric string, or null/garbage (which collapses
// to zero, matching how the original data was cleaned).
fn lenient_decimal<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(decimal_from_value(&value))
}

pub(crate) fn decimal_from_value(value: &Value) -> Decimal {
    match value {
        Value::Number(n) => Decimal::from_str(&n.to_string())
            .ok()
            .or_else(|| n.as_f64().and_then(Decimal::from_f64))
            .unwrap_or(Decimal::ZERO),
        Value::String(s) if !s.trim().is_empty() => {
            Decimal::from_str(s.trim()).unwrap_or(Decimal::ZERO)
        }
        _ => Decimal::ZERO,
    }
}

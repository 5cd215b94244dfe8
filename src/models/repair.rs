// src/models/repair.rs
//
// Report shapes for the price diagnostic/repair utility. The warehouse UI
// renders these directly, so the field names are part of the API surface.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

// How a missing valuation was filled, recorded per item for audit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RepairMethod {
    PurchaseHistory,
    CategoryDefault,
}

// Scan result: how many items are unpriced and what could fix them.
// `fixable_items` counts the unpriced items whose ledger carries a usable
// pricing signal; the rest would fall through to the category default.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PriceDiagnostic {
    pub total_items: usize,
    pub zero_price_items: usize,
    pub items_with_purchase_history: usize,
    pub fixable_items: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RepairedItem {
    pub item_id: Uuid,
    pub name: String,
    pub method: RepairMethod,
    pub new_wac: Decimal,
}

// A write that failed. The batch keeps going; these are reported, not hidden.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RepairError {
    pub item_id: Uuid,
    pub name: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FixResults {
    pub total_fixed: usize,
    pub fixed_via_wac_recalculation: usize,
    pub fixed_via_default_price: usize,
    pub errors: Vec<RepairError>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PriceRepairReport {
    pub total_items: usize,
    pub zero_price_items: usize,
    pub repaired_items: Vec<RepairedItem>,
    pub fix_results: FixResults,
}

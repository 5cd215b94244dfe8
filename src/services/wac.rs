// src/services/wac.rs
//
// Weighted Average Cost calculation. Pure functions only: callable from the
// diagnostics path without touching any store. All arithmetic stays in
// `Decimal`; binary floats would accumulate rounding error into every
// subsequent purchase.

use rust_decimal::Decimal;

use crate::models::purchases::PurchaseLineItem;

/// Batch WAC over an item's full purchase history:
/// `Σ(quantity_i * cost_i) / Σ(quantity_i)` across the lines that carry a
/// pricing signal (quantity > 0 AND cost > 0). Lines with zero quantity or
/// zero cost are excluded from both sums.
///
/// Returns `None` when no qualifying lines exist. That is "unvalued", not
/// "worth zero"; the caller picks the fallback policy.
pub fn weighted_average_cost(lines: &[PurchaseLineItem]) -> Option<Decimal> {
    let mut total_quantity = Decimal::ZERO;
    let mut total_value = Decimal::ZERO;

    for line in lines.iter().filter(|l| l.has_pricing_signal()) {
        total_quantity += line.quantity_received;
        total_value += line.quantity_received * line.unit_cost;
    }

    if total_quantity <= Decimal::ZERO {
        return None;
    }

    Some(total_value / total_quantity)
}

/// Incremental moving-average formula for the receipt hot path:
/// `(current_stock * current_wac + quantity * unit_cost) / new_stock`,
/// guarded for the cases where the plain formula would lie:
///
/// - first stock ever (or still unvalued): the receipt's cost IS the WAC;
/// - zero-cost receipt (free/sample stock): stock grows, WAC unchanged.
///
/// Deductions never call this; WAC only moves on receipt.
pub fn next_wac(
    current_stock: Decimal,
    current_wac: Option<Decimal>,
    quantity: Decimal,
    unit_cost: Decimal,
) -> Option<Decimal> {
    let new_stock = current_stock + quantity;
    if new_stock <= Decimal::ZERO {
        return current_wac;
    }

    // No pricing signal in this receipt: keep whatever we knew before.
    if unit_cost <= Decimal::ZERO {
        return current_wac;
    }

    match current_wac {
        Some(wac) if current_stock > Decimal::ZERO && wac > Decimal::ZERO => {
            Some((current_stock * wac + quantity * unit_cost) / new_stock)
        }
        _ => Some(unit_cost),
    }
}

// Property tests for the WAC calculator: the batch formula against a
// straight reference computation, and the incremental hot path against the
// batch over whole receipt histories.

use bakehouse_backend::models::purchases::PurchaseLineItem;
use bakehouse_backend::services::wac::{next_wac, weighted_average_cost};
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn lines_from(receipts: &[(u32, u32)]) -> Vec<PurchaseLineItem> {
    receipts
        .iter()
        .map(|&(quantity, cost)| PurchaseLineItem {
            item_id: Uuid::nil(),
            quantity_received: Decimal::from(quantity),
            unit_cost: Decimal::from(cost),
        })
        .collect()
}

// Quantities and unit costs in realistic ranges; always at least one line.
fn receipts() -> impl Strategy<Value = Vec<(u32, u32)>> {
    prop::collection::vec((1u32..=10_000, 1u32..=1_000_000), 1..=20)
}

proptest! {
    // wac == Σ(q·c)/Σ(q), computed here with exact integer sums.
    #[test]
    fn batch_wac_equals_the_reference_formula(receipts in receipts()) {
        let lines = lines_from(&receipts);
        let wac = weighted_average_cost(&lines).unwrap();

        let total_value: u64 = receipts.iter().map(|&(q, c)| q as u64 * c as u64).sum();
        let total_quantity: u64 = receipts.iter().map(|&(q, _)| q as u64).sum();
        let expected = Decimal::from(total_value) / Decimal::from(total_quantity);

        prop_assert_eq!(wac, expected);
    }

    // Receiving purchases one by one through the incremental formula lands
    // on the same average as one pass over the whole history.
    #[test]
    fn incremental_application_matches_batch(receipts in receipts()) {
        let lines = lines_from(&receipts);
        let batch = weighted_average_cost(&lines).unwrap();

        let mut stock = Decimal::ZERO;
        let mut wac = None;
        for line in &lines {
            wac = next_wac(stock, wac, line.quantity_received, line.unit_cost);
            stock += line.quantity_received;
        }
        let incremental = wac.unwrap();

        prop_assert!(
            (batch - incremental).abs() < dec("0.000001"),
            "batch {} vs incremental {}",
            batch,
            incremental
        );
    }

    // Lines with no pricing signal are invisible to the computation.
    #[test]
    fn zero_quantity_and_zero_cost_lines_change_nothing(
        receipts in receipts(),
        noise_cost in 1u32..=1_000_000,
        noise_quantity in 1u32..=10_000,
    ) {
        let clean = lines_from(&receipts);
        let mut noisy = clean.clone();
        noisy.insert(0, PurchaseLineItem {
            item_id: Uuid::nil(),
            quantity_received: Decimal::ZERO,
            unit_cost: Decimal::from(noise_cost),
        });
        noisy.push(PurchaseLineItem {
            item_id: Uuid::nil(),
            quantity_received: Decimal::from(noise_quantity),
            unit_cost: Decimal::ZERO,
        });

        prop_assert_eq!(weighted_average_cost(&clean), weighted_average_cost(&noisy));
    }

    // A weighted average can never leave the range of its inputs.
    #[test]
    fn wac_is_bounded_by_the_observed_costs(receipts in receipts()) {
        let lines = lines_from(&receipts);
        let wac = weighted_average_cost(&lines).unwrap();

        let min = receipts.iter().map(|&(_, c)| c).min().unwrap();
        let max = receipts.iter().map(|&(_, c)| c).max().unwrap();
        prop_assert!(wac >= Decimal::from(min));
        prop_assert!(wac <= Decimal::from(max));
    }

    // The batch computation is order-independent.
    #[test]
    fn batch_wac_ignores_receipt_order(receipts in receipts()) {
        let forward = lines_from(&receipts);
        let mut backward = forward.clone();
        backward.reverse();

        prop_assert_eq!(
            weighted_average_cost(&forward),
            weighted_average_cost(&backward)
        );
    }
}

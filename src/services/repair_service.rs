// src/services/repair_service.rs
//
// On-demand batch that finds items holding stock with no usable valuation
// and fills the gap: full-ledger WAC first, category default price as the
// documented last resort. It only ever fills; a valid non-zero WAC is never
// overwritten, and one item's failure never aborts the rest of the batch.

use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::CategoryDefaultPrices,
    db::warehouse_repo::{CommitOutcome, WarehouseRepository},
    models::{
        repair::{FixResults, PriceDiagnostic, PriceRepairReport, RepairError, RepairMethod, RepairedItem},
        warehouse::InventoryItem,
    },
    services::wac,
};

// The batch runs against possibly-stale reads; a racing purchase completion
// bumps the item version and the fill is retried against fresh state.
const MAX_FILL_ATTEMPTS: u32 = 3;

#[derive(Clone)]
pub struct RepairService {
    repo: Arc<dyn WarehouseRepository>,
    default_prices: CategoryDefaultPrices,
}

impl RepairService {
    pub fn new(repo: Arc<dyn WarehouseRepository>, default_prices: CategoryDefaultPrices) -> Self {
        Self { repo, default_prices }
    }

    /// Scan only, no writes: how many items hold stock without a valid WAC,
    /// and how many of those the purchase ledger could price.
    pub async fn diagnose(&self) -> Result<PriceDiagnostic, AppError> {
        let items = self.repo.list_items().await?;
        let total_items = items.len();

        let mut zero_price_items = 0usize;
        let mut items_with_purchase_history = 0usize;
        let mut fixable_items = 0usize;

        for item in items.iter().filter(|i| needs_repair(i)) {
            zero_price_items += 1;
            let lines = self.repo.completed_line_items_for(item.id).await?;
            if !lines.is_empty() {
                items_with_purchase_history += 1;
            }
            if wac::weighted_average_cost(&lines).is_some() {
                fixable_items += 1;
            }
        }

        Ok(PriceDiagnostic {
            total_items,
            zero_price_items,
            items_with_purchase_history,
            fixable_items,
        })
    }

    /// Runs the repair batch and reports exactly what happened to each item.
    /// Running it twice in a row is a no-op the second time.
    pub async fn repair(&self) -> Result<PriceRepairReport, AppError> {
        let items = self.repo.list_items().await?;
        let total_items = items.len();

        let mut repaired_items = Vec::new();
        let mut errors = Vec::new();
        let mut zero_price_items = 0usize;

        for item in items.into_iter().filter(needs_repair) {
            zero_price_items += 1;
            match self.fill_item(item.id).await {
                Ok(Some(repaired)) => repaired_items.push(repaired),
                // Someone else valued it mid-batch; nothing to do.
                Ok(None) => {}
                Err(e) => {
                    tracing::error!(item_id = %item.id, name = %item.name, "repair failed: {e}");
                    errors.push(RepairError {
                        item_id: item.id,
                        name: item.name,
                        message: e.to_string(),
                    });
                }
            }
        }

        let fixed_via_wac_recalculation = repaired_items
            .iter()
            .filter(|r| r.method == RepairMethod::PurchaseHistory)
            .count();
        let fixed_via_default_price = repaired_items
            .iter()
            .filter(|r| r.method == RepairMethod::CategoryDefault)
            .count();

        tracing::info!(
            scanned = total_items,
            needing_repair = zero_price_items,
            fixed = repaired_items.len(),
            failed = errors.len(),
            "price repair batch finished"
        );

        Ok(PriceRepairReport {
            total_items,
            zero_price_items,
            fix_results: FixResults {
                total_fixed: repaired_items.len(),
                fixed_via_wac_recalculation,
                fixed_via_default_price,
                errors,
            },
            repaired_items,
        })
    }

    // Re-reads before every write attempt so the batch tolerates concurrent
    // mutations: only a genuinely-still-empty value gets filled.
    async fn fill_item(&self, item_id: Uuid) -> Result<Option<RepairedItem>, AppError> {
        for _ in 0..MAX_FILL_ATTEMPTS {
            let item = self
                .repo
                .get_item(item_id)
                .await?
                .ok_or(AppError::ItemNotFound(item_id))?;
            if item.has_valid_wac() {
                return Ok(None);
            }

            let lines = self.repo.completed_line_items_for(item_id).await?;
            let (wac_value, method) = match wac::weighted_average_cost(&lines) {
                Some(value) => (value, RepairMethod::PurchaseHistory),
                None => (
                    self.default_prices.price_for(&item.category),
                    RepairMethod::CategoryDefault,
                ),
            };

            match self
                .repo
                .fill_missing_wac(item_id, item.version, wac_value)
                .await?
            {
                CommitOutcome::Applied => {
                    tracing::info!(
                        %item_id,
                        name = %item.name,
                        method = ?method,
                        wac = %wac_value,
                        "filled missing valuation"
                    );
                    return Ok(Some(RepairedItem {
                        item_id,
                        name: item.name,
                        method,
                        new_wac: wac_value,
                    }));
                }
                CommitOutcome::AlreadyApplied => return Ok(None),
                CommitOutcome::Conflict => continue,
            }
        }

        Err(AppError::ConcurrentModification)
    }
}

// Repairable: holds stock but has no positive WAC. `Some(0)` counts as
// unvalued; it can only come from legacy rows.
fn needs_repair(item: &InventoryItem) -> bool {
    item.current_stock > Decimal::ZERO && !item.has_valid_wac()
}

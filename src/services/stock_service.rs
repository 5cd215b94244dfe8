// src/services/stock_service.rs
//
// The stock mutation engine: the only component that changes an item's
// `current_stock` / `current_wac`. It plans mutations from a snapshot of the
// item rows, then hands them to the repository for a single versioned commit.
// If another writer got there first the commit reports a conflict and the
// whole plan is rebuilt from fresh state.

use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::warehouse_repo::{CommitOutcome, WarehouseRepository},
    models::{
        orders::{
            CanCompleteReport, DeductedItem, Order, OrderCompletionResult, OrderStatus,
            RequiredLineItem,
        },
        purchases::{Purchase, PurchaseCompletionResult, PurchaseLineItem, PurchaseStatus},
        warehouse::{InventoryItem, StockMovementReason, StockMutation, StockReconciliation, StockShortage},
    },
    services::wac,
};

// Bounded optimistic retries. Contention on a single bakery's inventory is
// light; if five rebuilds all lose the race something else is wrong and the
// caller should see it.
const MAX_COMMIT_ATTEMPTS: u32 = 5;

// Stored vs full-ledger WAC may differ by accumulated division rounding.
// Anything past a hundredth of a rupiah is real drift.
const WAC_DRIFT_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

#[derive(Clone)]
pub struct StockService {
    repo: Arc<dyn WarehouseRepository>,
}

impl StockService {
    pub fn new(repo: Arc<dyn WarehouseRepository>) -> Self {
        Self { repo }
    }

    /// Completes a pending purchase: per line item, increase stock and fold
    /// the receipt into the moving average. Idempotent per purchase id;
    /// all-or-nothing across the purchase's items.
    pub async fn complete_purchase(
        &self,
        purchase_id: Uuid,
    ) -> Result<PurchaseCompletionResult, AppError> {
        for attempt in 1..=MAX_COMMIT_ATTEMPTS {
            let purchase = self
                .repo
                .get_purchase(purchase_id)
                .await?
                .ok_or(AppError::PurchaseNotFound(purchase_id))?;

            match purchase.status {
                PurchaseStatus::Completed => {
                    return Ok(PurchaseCompletionResult {
                        purchase_id,
                        stock_items_updated: 0,
                        already_completed: true,
                    });
                }
                PurchaseStatus::Cancelled => {
                    return Err(AppError::PurchaseNotCompletable {
                        purchase_id,
                        status: "cancelled".to_string(),
                    });
                }
                PurchaseStatus::Pending => {}
            }

            if purchase.line_items.is_empty() {
                return Err(AppError::InvalidLineItems(vec![
                    "purchase has no line items".to_string(),
                ]));
            }

            let mutations = self.plan_receipts(&purchase).await?;

            match self
                .repo
                .commit_purchase_completion(purchase_id, &mutations)
                .await?
            {
                CommitOutcome::Applied => {
                    tracing::info!(
                        %purchase_id,
                        items = mutations.len(),
                        "purchase completed, stock and WAC updated"
                    );
                    return Ok(PurchaseCompletionResult {
                        purchase_id,
                        stock_items_updated: mutations.len(),
                        already_completed: false,
                    });
                }
                CommitOutcome::AlreadyApplied => {
                    return Ok(PurchaseCompletionResult {
                        purchase_id,
                        stock_items_updated: 0,
                        already_completed: true,
                    });
                }
                CommitOutcome::Conflict => {
                    tracing::warn!(%purchase_id, attempt, "version conflict, rebuilding plan");
                }
            }
        }

        Err(AppError::ConcurrentModification)
    }

    /// Completes an order: pre-flight sufficiency check over ALL required
    /// lines, then an all-or-nothing deduction. WAC never changes on
    /// deduction. Idempotent per order id.
    pub async fn complete_order(
        &self,
        order_id: Uuid,
        required: &[RequiredLineItem],
    ) -> Result<OrderCompletionResult, AppError> {
        let merged = merge_required_lines(required)?;

        for attempt in 1..=MAX_COMMIT_ATTEMPTS {
            let order = self.fetch_completable_order(order_id).await?;
            if order.status == OrderStatus::Completed {
                return Ok(OrderCompletionResult {
                    success: true,
                    order_number: order.order_number,
                    total_amount: order.total_amount,
                    stock_items_updated: 0,
                    already_completed: true,
                    deductions: Vec::new(),
                });
            }

            let (mutations, deductions) = self.plan_deductions(order_id, &merged).await?;

            match self
                .repo
                .commit_order_completion(order_id, &mutations)
                .await?
            {
                CommitOutcome::Applied => {
                    tracing::info!(
                        %order_id,
                        order_number = %order.order_number,
                        items = mutations.len(),
                        "order completed, stock deducted"
                    );
                    return Ok(OrderCompletionResult {
                        success: true,
                        order_number: order.order_number,
                        total_amount: order.total_amount,
                        stock_items_updated: mutations.len(),
                        already_completed: false,
                        deductions,
                    });
                }
                CommitOutcome::AlreadyApplied => {
                    return Ok(OrderCompletionResult {
                        success: true,
                        order_number: order.order_number,
                        total_amount: order.total_amount,
                        stock_items_updated: 0,
                        already_completed: true,
                        deductions: Vec::new(),
                    });
                }
                CommitOutcome::Conflict => {
                    tracing::warn!(%order_id, attempt, "version conflict, rebuilding plan");
                }
            }
        }

        Err(AppError::ConcurrentModification)
    }

    /// Dry-run of the order sufficiency check. Reads current state, mutates
    /// nothing. The UI calls this before offering the "complete" button.
    pub async fn can_complete_order(
        &self,
        order_id: Uuid,
        required: &[RequiredLineItem],
    ) -> Result<CanCompleteReport, AppError> {
        let merged = merge_required_lines(required)?;

        let order = self.fetch_completable_order(order_id).await?;
        if order.status == OrderStatus::Completed {
            return Ok(CanCompleteReport {
                can_complete: false,
                already_completed: true,
                total_ingredients: merged.len(),
                available_ingredients: 0,
                insufficient_stock: Vec::new(),
            });
        }

        let mut shortages = Vec::new();
        let mut available = 0usize;
        for line in &merged {
            let item = self.fetch_item(line.item_id).await?;
            if item.current_stock >= line.quantity_needed {
                available += 1;
            } else {
                shortages.push(shortage_for(&item, line.quantity_needed));
            }
        }

        Ok(CanCompleteReport {
            can_complete: shortages.is_empty(),
            already_completed: false,
            total_ingredients: merged.len(),
            available_ingredients: available,
            insufficient_stock: shortages,
        })
    }

    /// Manual stock correction (stocktake, spoilage, spillage). Carries no
    /// cost information, so the WAC is left alone; a correction that would
    /// take stock negative is refused like any other overdraw.
    pub async fn adjust_stock(
        &self,
        item_id: Uuid,
        delta: Decimal,
        correlation_id: Uuid,
    ) -> Result<InventoryItem, AppError> {
        if delta == Decimal::ZERO {
            return Err(AppError::InvalidLineItems(vec![
                "adjustment delta must not be zero".to_string(),
            ]));
        }

        for attempt in 1..=MAX_COMMIT_ATTEMPTS {
            let item = self.fetch_item(item_id).await?;

            let new_stock = item.current_stock + delta;
            if new_stock < Decimal::ZERO {
                return Err(AppError::InsufficientStock(vec![shortage_for(&item, -delta)]));
            }

            let mutation = StockMutation {
                item_id,
                delta,
                reason: StockMovementReason::ManualAdjustment,
                correlation_id,
                expected_version: item.version,
                new_stock,
                new_wac: item.current_wac,
                movement_unit_cost: None,
            };

            match self.repo.commit_adjustment(&mutation).await? {
                CommitOutcome::Applied => {
                    tracing::info!(%item_id, %delta, "manual stock adjustment applied");
                    return self.fetch_item(item_id).await;
                }
                CommitOutcome::AlreadyApplied => return self.fetch_item(item_id).await,
                CommitOutcome::Conflict => {
                    tracing::warn!(%item_id, attempt, "version conflict, retrying adjustment");
                }
            }
        }

        Err(AppError::ConcurrentModification)
    }

    /// Recomputes WAC from the full purchase ledger and compares it to the
    /// incrementally maintained value. Read-only; the repair utility acts on
    /// what this reports.
    pub async fn reconcile_stock(&self, item_id: Uuid) -> Result<StockReconciliation, AppError> {
        let item = self.fetch_item(item_id).await?;
        let lines = self.repo.completed_line_items_for(item_id).await?;
        let ledger_wac = wac::weighted_average_cost(&lines);

        let stored_wac = item.current_wac;
        let (drift, consistent) = match (stored_wac, ledger_wac) {
            (Some(stored), Some(ledger)) => {
                let drift = (stored - ledger).abs();
                (Some(drift), drift <= WAC_DRIFT_TOLERANCE)
            }
            (None, None) => (None, true),
            // One side valued, the other not: that IS the drift.
            _ => (None, false),
        };

        Ok(StockReconciliation {
            item_id,
            name: item.name,
            current_stock: item.current_stock,
            stored_wac,
            ledger_wac,
            drift,
            consistent,
        })
    }

    // --- planning helpers ---

    // One mutation per distinct item. A purchase can list the same item on
    // several lines; they are folded in order so the committed row carries
    // the final stock and blended WAC.
    async fn plan_receipts(&self, purchase: &Purchase) -> Result<Vec<StockMutation>, AppError> {
        let mut item_order: Vec<Uuid> = Vec::new();
        let mut grouped: HashMap<Uuid, Vec<&PurchaseLineItem>> = HashMap::new();
        for line in &purchase.line_items {
            grouped
                .entry(line.item_id)
                .or_insert_with(|| {
                    item_order.push(line.item_id);
                    Vec::new()
                })
                .push(line);
        }

        let mut mutations = Vec::with_capacity(item_order.len());
        for item_id in item_order {
            // An unknown item fails the whole purchase before anything is
            // written; the purchase stays pending.
            let item = self.fetch_item(item_id).await?;

            let mut stock = item.current_stock;
            let mut current_wac = item.current_wac;
            let mut received = Decimal::ZERO;
            let mut priced_quantity = Decimal::ZERO;
            let mut priced_value = Decimal::ZERO;

            for line in &grouped[&item_id] {
                if line.unit_cost <= Decimal::ZERO {
                    tracing::warn!(
                        %item_id,
                        quantity = %line.quantity_received,
                        "zero-cost receipt: stock grows, WAC unchanged"
                    );
                } else {
                    priced_quantity += line.quantity_received;
                    priced_value += line.quantity_received * line.unit_cost;
                }
                current_wac =
                    wac::next_wac(stock, current_wac, line.quantity_received, line.unit_cost);
                stock += line.quantity_received;
                received += line.quantity_received;
            }

            let movement_unit_cost = if priced_quantity > Decimal::ZERO {
                Some(priced_value / priced_quantity)
            } else {
                None
            };

            mutations.push(StockMutation {
                item_id,
                delta: received,
                reason: StockMovementReason::PurchaseCompleted,
                correlation_id: purchase.id,
                expected_version: item.version,
                new_stock: stock,
                new_wac: current_wac,
                movement_unit_cost,
            });
        }

        Ok(mutations)
    }

    // The check-then-act pair: shortages are gathered across every line
    // before anything is decided, and the resulting plan only commits if no
    // item row moved in between (version check in the repository).
    async fn plan_deductions(
        &self,
        order_id: Uuid,
        merged: &[RequiredLineItem],
    ) -> Result<(Vec<StockMutation>, Vec<DeductedItem>), AppError> {
        let mut mutations = Vec::with_capacity(merged.len());
        let mut deductions = Vec::with_capacity(merged.len());
        let mut shortages = Vec::new();

        for line in merged {
            let item = self.fetch_item(line.item_id).await?;

            if item.current_stock < line.quantity_needed {
                shortages.push(shortage_for(&item, line.quantity_needed));
                continue;
            }

            mutations.push(StockMutation {
                item_id: item.id,
                delta: -line.quantity_needed,
                reason: StockMovementReason::OrderCompleted,
                correlation_id: order_id,
                expected_version: item.version,
                new_stock: item.current_stock - line.quantity_needed,
                // Deduction never moves the average.
                new_wac: item.current_wac,
                movement_unit_cost: None,
            });
            deductions.push(DeductedItem {
                item_id: item.id,
                name: item.name,
                quantity_deducted: line.quantity_needed,
            });
        }

        if !shortages.is_empty() {
            return Err(AppError::InsufficientStock(shortages));
        }

        Ok((mutations, deductions))
    }

    async fn fetch_item(&self, item_id: Uuid) -> Result<InventoryItem, AppError> {
        self.repo
            .get_item(item_id)
            .await?
            .ok_or(AppError::ItemNotFound(item_id))
    }

    async fn fetch_completable_order(&self, order_id: Uuid) -> Result<Order, AppError> {
        let order = self
            .repo
            .get_order(order_id)
            .await?
            .ok_or(AppError::OrderNotFound(order_id))?;
        if order.status == OrderStatus::Cancelled {
            return Err(AppError::OrderNotCompletable {
                order_id,
                status: "cancelled".to_string(),
            });
        }
        Ok(order)
    }
}

fn shortage_for(item: &InventoryItem, required: Decimal) -> StockShortage {
    StockShortage {
        item_id: item.id,
        name: item.name.clone(),
        required,
        available: item.current_stock,
        shortfall: required - item.current_stock,
    }
}

// Collapses duplicate item ids by summing their quantities and rejects lines
// that could never deduct anything meaningful.
fn merge_required_lines(
    required: &[RequiredLineItem],
) -> Result<Vec<RequiredLineItem>, AppError> {
    if required.is_empty() {
        return Err(AppError::InvalidLineItems(vec![
            "order has no required ingredients".to_string(),
        ]));
    }

    let mut problems = Vec::new();
    let mut order: Vec<Uuid> = Vec::new();
    let mut totals: HashMap<Uuid, Decimal> = HashMap::new();
    for line in required {
        if line.quantity_needed <= Decimal::ZERO {
            problems.push(format!(
                "item {} has non-positive required quantity {}",
                line.item_id, line.quantity_needed
            ));
            continue;
        }
        if !totals.contains_key(&line.item_id) {
            order.push(line.item_id);
        }
        *totals.entry(line.item_id).or_insert(Decimal::ZERO) += line.quantity_needed;
    }

    if !problems.is_empty() {
        return Err(AppError::InvalidLineItems(problems));
    }

    Ok(order
        .into_iter()
        .map(|item_id| RequiredLineItem {
            item_id,
            quantity_needed: totals[&item_id],
        })
        .collect())
}

// The price diagnostic/repair batch: ledger WAC first, category default
// second, and it only ever fills gaps.

mod common;

use std::sync::Arc;

use bakehouse_backend::{
    config::CategoryDefaultPrices,
    db::WarehouseRepository,
    models::repair::RepairMethod,
    services::repair_service::RepairService,
};
use common::*;

fn repair_service(repo: &Arc<bakehouse_backend::db::MemoryWarehouseRepository>) -> RepairService {
    RepairService::new(repo.clone(), CategoryDefaultPrices::default())
}

#[tokio::test]
async fn free_sample_stock_falls_back_to_the_category_default() {
    let (repo, service) = setup();
    let item = register_item(&repo, "Daun Salam", "Bumbu").await;

    // One historical purchase of 3 units at no cost: stock exists but the
    // ledger carries no pricing signal at all.
    receive(&repo, &service, item.id, "3", "0").await;
    assert_eq!(stock_of(&repo, item.id).await.current_wac, None);

    let repair = repair_service(&repo);
    let diagnostic = repair.diagnose().await.unwrap();
    assert_eq!(diagnostic.total_items, 1);
    assert_eq!(diagnostic.zero_price_items, 1);
    assert_eq!(diagnostic.items_with_purchase_history, 1);
    assert_eq!(diagnostic.fixable_items, 0);

    let report = repair.repair().await.unwrap();
    assert_eq!(report.fix_results.total_fixed, 1);
    assert_eq!(report.fix_results.fixed_via_wac_recalculation, 0);
    assert_eq!(report.fix_results.fixed_via_default_price, 1);
    assert!(report.fix_results.errors.is_empty());
    assert_eq!(report.repaired_items[0].method, RepairMethod::CategoryDefault);

    // "Bumbu" in the built-in table.
    let item = stock_of(&repo, item.id).await;
    assert_eq!(item.current_wac, Some(dec("10000")));
}

#[tokio::test]
async fn priced_history_is_preferred_over_the_default() {
    let (repo, service) = setup();
    let item = register_item(&repo, "Daging Sapi", "Daging").await;

    // Legacy shape: a priced purchase was marked completed without its stock
    // mutation ever landing on the item row.
    let priced = pending_purchase(&repo, vec![line(item.id, "10", "5000")]).await;
    repo.commit_purchase_completion(priced.id, &[]).await.unwrap();

    // The stock itself arrived as an unpriced receipt, so the item holds
    // quantity but no valuation.
    receive(&repo, &service, item.id, "10", "0").await;
    let state = stock_of(&repo, item.id).await;
    assert_eq!(state.current_stock, dec("10"));
    assert_eq!(state.current_wac, None);

    let repair = repair_service(&repo);
    let diagnostic = repair.diagnose().await.unwrap();
    assert_eq!(diagnostic.fixable_items, 1);

    let report = repair.repair().await.unwrap();
    assert_eq!(report.fix_results.total_fixed, 1);
    assert_eq!(report.fix_results.fixed_via_wac_recalculation, 1);
    assert_eq!(report.fix_results.fixed_via_default_price, 0);
    assert_eq!(report.repaired_items[0].method, RepairMethod::PurchaseHistory);

    // From the ledger, not the 50000 category default.
    let item = stock_of(&repo, item.id).await;
    assert_eq!(item.current_wac, Some(dec("5000")));
}

#[tokio::test]
async fn second_run_is_a_no_op_and_valid_wacs_are_never_overwritten() {
    let (repo, service) = setup();

    // A healthy item whose valuation must survive untouched.
    let healthy = register_item(&repo, "Tepung Terigu", "Tepung").await;
    receive(&repo, &service, healthy.id, "10", "8000").await;

    // A broken one the batch should fix.
    let broken = register_item(&repo, "Daun Salam", "Bumbu").await;
    receive(&repo, &service, broken.id, "3", "0").await;

    let repair = repair_service(&repo);
    let first = repair.repair().await.unwrap();
    assert_eq!(first.total_items, 2);
    assert_eq!(first.zero_price_items, 1);
    assert_eq!(first.fix_results.total_fixed, 1);

    let second = repair.repair().await.unwrap();
    assert_eq!(second.zero_price_items, 0);
    assert_eq!(second.fix_results.total_fixed, 0);
    assert!(second.repaired_items.is_empty());

    let healthy = stock_of(&repo, healthy.id).await;
    assert_eq!(healthy.current_wac, Some(dec("8000")));
    let broken = stock_of(&repo, broken.id).await;
    assert_eq!(broken.current_wac, Some(dec("10000")));
}

#[tokio::test]
async fn items_without_stock_are_left_alone() {
    let (repo, _service) = setup();
    // Registered but never received: nothing to value, nothing to fix.
    register_item(&repo, "Vanili", "Bumbu").await;

    let repair = repair_service(&repo);
    let diagnostic = repair.diagnose().await.unwrap();
    assert_eq!(diagnostic.total_items, 1);
    assert_eq!(diagnostic.zero_price_items, 0);

    let report = repair.repair().await.unwrap();
    assert_eq!(report.fix_results.total_fixed, 0);
}

#[tokio::test]
async fn unknown_category_gets_the_generic_fallback() {
    let (repo, service) = setup();
    let item = register_item(&repo, "Stiker Kemasan", "Kemasan").await;
    receive(&repo, &service, item.id, "100", "0").await;

    let repair = repair_service(&repo);
    let report = repair.repair().await.unwrap();
    assert_eq!(report.fix_results.fixed_via_default_price, 1);

    let item = stock_of(&repo, item.id).await;
    assert_eq!(item.current_wac, Some(dec("5000")));
}

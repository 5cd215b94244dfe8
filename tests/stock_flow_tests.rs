// End-to-end flows through the stock mutation engine against the in-memory
// warehouse: receipts, deductions, idempotency and atomicity.

mod common;

use bakehouse_backend::{
    common::AppError,
    db::WarehouseRepository,
    models::{purchases::PurchaseStatus, warehouse::StockMovementReason},
};
use common::*;
use rust_decimal::Decimal;
use uuid::Uuid;

#[tokio::test]
async fn first_receipt_sets_stock_and_wac() {
    let (repo, service) = setup();
    let item = register_item(&repo, "Tepung Terigu", "Tepung").await;

    receive(&repo, &service, item.id, "10", "5000").await;

    let item = stock_of(&repo, item.id).await;
    assert_eq!(item.current_stock, dec("10"));
    assert_eq!(item.current_wac, Some(dec("5000")));
    assert!(item.last_recalculated_at.is_some());
}

#[tokio::test]
async fn second_receipt_blends_the_average() {
    let (repo, service) = setup();
    let item = register_item(&repo, "Tepung Terigu", "Tepung").await;

    receive(&repo, &service, item.id, "10", "5000").await;
    receive(&repo, &service, item.id, "5", "8000").await;

    let item = stock_of(&repo, item.id).await;
    assert_eq!(item.current_stock, dec("15"));
    // (10*5000 + 5*8000) / 15 = 6000
    assert_eq!(item.current_wac, Some(dec("6000")));
}

#[tokio::test]
async fn overdraw_is_rejected_with_the_shortfall_and_stock_is_untouched() {
    let (repo, service) = setup();
    let item = register_item(&repo, "Tepung Terigu", "Tepung").await;
    receive(&repo, &service, item.id, "10", "5000").await;
    receive(&repo, &service, item.id, "5", "8000").await;

    let order = pending_order(&repo, "ORD-001").await;
    let err = service
        .complete_order(order.id, &[need(item.id, "20")])
        .await
        .unwrap_err();

    match err {
        AppError::InsufficientStock(shortages) => {
            assert_eq!(shortages.len(), 1);
            assert_eq!(shortages[0].item_id, item.id);
            assert_eq!(shortages[0].required, dec("20"));
            assert_eq!(shortages[0].available, dec("15"));
            assert_eq!(shortages[0].shortfall, dec("5"));
        }
        other => panic!("expected InsufficientStock, got {other:?}"),
    }

    let item = stock_of(&repo, item.id).await;
    assert_eq!(item.current_stock, dec("15"));
}

#[tokio::test]
async fn deduction_empties_stock_and_leaves_wac_alone() {
    let (repo, service) = setup();
    let item = register_item(&repo, "Tepung Terigu", "Tepung").await;
    receive(&repo, &service, item.id, "10", "5000").await;
    receive(&repo, &service, item.id, "5", "8000").await;

    let order = pending_order(&repo, "ORD-002").await;
    let result = service
        .complete_order(order.id, &[need(item.id, "15")])
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(result.order_number, "ORD-002");
    assert_eq!(result.stock_items_updated, 1);
    assert_eq!(result.deductions.len(), 1);
    assert_eq!(result.deductions[0].quantity_deducted, dec("15"));

    let item = stock_of(&repo, item.id).await;
    assert_eq!(item.current_stock, Decimal::ZERO);
    assert_eq!(item.current_wac, Some(dec("6000")));
}

#[tokio::test]
async fn purchase_completion_is_idempotent() {
    let (repo, service) = setup();
    let item = register_item(&repo, "Gula Pasir", "Gula").await;

    let purchase = pending_purchase(&repo, vec![line(item.id, "10", "12000")]).await;
    let first = service.complete_purchase(purchase.id).await.unwrap();
    let second = service.complete_purchase(purchase.id).await.unwrap();

    assert!(!first.already_completed);
    assert_eq!(first.stock_items_updated, 1);
    assert!(second.already_completed);
    assert_eq!(second.stock_items_updated, 0);

    // Stock counted once, not twice.
    let item = stock_of(&repo, item.id).await;
    assert_eq!(item.current_stock, dec("10"));
}

#[tokio::test]
async fn order_completion_is_idempotent() {
    let (repo, service) = setup();
    let item = register_item(&repo, "Gula Pasir", "Gula").await;
    receive(&repo, &service, item.id, "10", "12000").await;

    let order = pending_order(&repo, "ORD-003").await;
    let required = [need(item.id, "4")];
    let first = service.complete_order(order.id, &required).await.unwrap();
    let second = service.complete_order(order.id, &required).await.unwrap();

    assert!(!first.already_completed);
    assert!(second.already_completed);
    assert_eq!(second.stock_items_updated, 0);

    let item = stock_of(&repo, item.id).await;
    assert_eq!(item.current_stock, dec("6"));
}

#[tokio::test]
async fn unknown_item_fails_the_whole_purchase_atomically() {
    let (repo, service) = setup();
    let item = register_item(&repo, "Telur Ayam", "Telur").await;

    let purchase = pending_purchase(
        &repo,
        vec![line(item.id, "30", "2500"), line(Uuid::new_v4(), "5", "9000")],
    )
    .await;
    let err = service.complete_purchase(purchase.id).await.unwrap_err();
    assert!(matches!(err, AppError::ItemNotFound(_)));

    // No partial stock increase; the purchase stays pending.
    let item = stock_of(&repo, item.id).await;
    assert_eq!(item.current_stock, Decimal::ZERO);
    let purchase = repo.get_purchase(purchase.id).await.unwrap().unwrap();
    assert_eq!(purchase.status, PurchaseStatus::Pending);
}

#[tokio::test]
async fn insufficient_stock_names_every_deficient_item() {
    let (repo, service) = setup();
    let flour = register_item(&repo, "Tepung Terigu", "Tepung").await;
    let sugar = register_item(&repo, "Gula Pasir", "Gula").await;
    let eggs = register_item(&repo, "Telur Ayam", "Telur").await;
    receive(&repo, &service, flour.id, "10", "8000").await;
    receive(&repo, &service, sugar.id, "2", "12000").await;
    receive(&repo, &service, eggs.id, "30", "2500").await;

    let order = pending_order(&repo, "ORD-004").await;
    let err = service
        .complete_order(
            order.id,
            &[need(flour.id, "12"), need(sugar.id, "5"), need(eggs.id, "10")],
        )
        .await
        .unwrap_err();

    match err {
        AppError::InsufficientStock(shortages) => {
            assert_eq!(shortages.len(), 2);
            let flour_short = shortages.iter().find(|s| s.item_id == flour.id).unwrap();
            assert_eq!(flour_short.shortfall, dec("2"));
            let sugar_short = shortages.iter().find(|s| s.item_id == sugar.id).unwrap();
            assert_eq!(sugar_short.shortfall, dec("3"));
        }
        other => panic!("expected InsufficientStock, got {other:?}"),
    }

    // All-or-nothing: the sufficient item was not deducted either.
    assert_eq!(stock_of(&repo, eggs.id).await.current_stock, dec("30"));
}

#[tokio::test]
async fn zero_cost_receipt_grows_stock_but_not_the_wac() {
    let (repo, service) = setup();
    let item = register_item(&repo, "Daun Pisang", "Bumbu").await;

    // Free sample first: stock exists, item still unvalued.
    receive(&repo, &service, item.id, "3", "0").await;
    let state = stock_of(&repo, item.id).await;
    assert_eq!(state.current_stock, dec("3"));
    assert_eq!(state.current_wac, None);

    // A priced receipt then sets the WAC from its own cost alone.
    receive(&repo, &service, item.id, "2", "4000").await;
    let state = stock_of(&repo, item.id).await;
    assert_eq!(state.current_stock, dec("5"));
    assert_eq!(state.current_wac, Some(dec("4000")));
}

#[tokio::test]
async fn multiple_lines_for_one_item_fold_in_order() {
    let (repo, service) = setup();
    let item = register_item(&repo, "Mentega", "Minyak").await;

    let purchase = pending_purchase(
        &repo,
        vec![line(item.id, "10", "5000"), line(item.id, "5", "8000")],
    )
    .await;
    let result = service.complete_purchase(purchase.id).await.unwrap();

    // One mutation per distinct item.
    assert_eq!(result.stock_items_updated, 1);
    let item = stock_of(&repo, item.id).await;
    assert_eq!(item.current_stock, dec("15"));
    assert_eq!(item.current_wac, Some(dec("6000")));
}

#[tokio::test]
async fn can_complete_reports_without_mutating() {
    let (repo, service) = setup();
    let flour = register_item(&repo, "Tepung Terigu", "Tepung").await;
    let sugar = register_item(&repo, "Gula Pasir", "Gula").await;
    receive(&repo, &service, flour.id, "10", "8000").await;
    receive(&repo, &service, sugar.id, "2", "12000").await;

    let order = pending_order(&repo, "ORD-005").await;
    let report = service
        .can_complete_order(order.id, &[need(flour.id, "8"), need(sugar.id, "5")])
        .await
        .unwrap();

    assert!(!report.can_complete);
    assert_eq!(report.total_ingredients, 2);
    assert_eq!(report.available_ingredients, 1);
    assert_eq!(report.insufficient_stock.len(), 1);
    assert_eq!(report.insufficient_stock[0].item_id, sugar.id);

    // Dry-run only.
    assert_eq!(stock_of(&repo, flour.id).await.current_stock, dec("10"));
    assert_eq!(stock_of(&repo, sugar.id).await.current_stock, dec("2"));
}

#[tokio::test]
async fn movements_record_every_mutation_with_its_correlation() {
    let (repo, service) = setup();
    let item = register_item(&repo, "Susu UHT", "Susu").await;

    let purchase_id = receive(&repo, &service, item.id, "12", "15000").await;
    let order = pending_order(&repo, "ORD-006").await;
    service
        .complete_order(order.id, &[need(item.id, "5")])
        .await
        .unwrap();

    let movements = repo.list_movements(item.id).await.unwrap();
    assert_eq!(movements.len(), 2);

    let receipt = movements
        .iter()
        .find(|m| m.reason == StockMovementReason::PurchaseCompleted)
        .unwrap();
    assert_eq!(receipt.quantity_changed, dec("12"));
    assert_eq!(receipt.unit_cost, Some(dec("15000")));
    assert_eq!(receipt.correlation_id, purchase_id);

    let deduction = movements
        .iter()
        .find(|m| m.reason == StockMovementReason::OrderCompleted)
        .unwrap();
    assert_eq!(deduction.quantity_changed, dec("-5"));
    assert_eq!(deduction.unit_cost, None);
    assert_eq!(deduction.correlation_id, order.id);
}

#[tokio::test]
async fn manual_adjustment_moves_stock_but_never_the_wac() {
    let (repo, service) = setup();
    let item = register_item(&repo, "Keju", "Susu").await;
    receive(&repo, &service, item.id, "10", "30000").await;

    let updated = service
        .adjust_stock(item.id, dec("-2"), Uuid::new_v4())
        .await
        .unwrap();
    assert_eq!(updated.current_stock, dec("8"));
    assert_eq!(updated.current_wac, Some(dec("30000")));

    // Taking more than exists is refused like any other overdraw.
    let err = service
        .adjust_stock(item.id, dec("-9"), Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InsufficientStock(_)));
    assert_eq!(stock_of(&repo, item.id).await.current_stock, dec("8"));
}

#[tokio::test]
async fn reconcile_agrees_with_the_ledger_after_normal_operation() {
    let (repo, service) = setup();
    let item = register_item(&repo, "Coklat Bubuk", "Bumbu").await;
    receive(&repo, &service, item.id, "10", "5000").await;
    receive(&repo, &service, item.id, "5", "8000").await;

    // Deduction does not disturb the ledger comparison; WAC only moves on
    // receipt on both sides.
    let order = pending_order(&repo, "ORD-007").await;
    service
        .complete_order(order.id, &[need(item.id, "7")])
        .await
        .unwrap();

    let report = service.reconcile_stock(item.id).await.unwrap();
    assert!(report.consistent);
    assert_eq!(report.stored_wac, Some(dec("6000")));
    assert_eq!(report.ledger_wac, Some(dec("6000")));
    assert_eq!(report.drift, Some(Decimal::ZERO));
}

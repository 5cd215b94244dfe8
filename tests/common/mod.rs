// Shared helpers for the integration suites: an in-memory warehouse wired
// the same way `AppState` wires the Postgres one. Not every suite uses every
// helper.
#![allow(dead_code)]

use std::str::FromStr;
use std::sync::Arc;

use bakehouse_backend::{
    db::{MemoryWarehouseRepository, WarehouseRepository},
    models::{
        orders::{NewOrder, Order, RequiredLineItem},
        purchases::{NewPurchase, Purchase, PurchaseLineItem},
        warehouse::{InventoryItem, NewInventoryItem},
    },
    services::stock_service::StockService,
};
use rust_decimal::Decimal;
use uuid::Uuid;

pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

pub fn setup() -> (Arc<MemoryWarehouseRepository>, StockService) {
    let repo = Arc::new(MemoryWarehouseRepository::new());
    let service = StockService::new(repo.clone());
    (repo, service)
}

pub async fn register_item(
    repo: &MemoryWarehouseRepository,
    name: &str,
    category: &str,
) -> InventoryItem {
    repo.insert_item(NewInventoryItem {
        name: name.to_string(),
        category: category.to_string(),
        unit: "kg".to_string(),
        minimum_stock: Decimal::ZERO,
    })
    .await
    .unwrap()
}

pub fn line(item_id: Uuid, quantity: &str, cost: &str) -> PurchaseLineItem {
    PurchaseLineItem {
        item_id,
        quantity_received: dec(quantity),
        unit_cost: dec(cost),
    }
}

pub async fn pending_purchase(
    repo: &MemoryWarehouseRepository,
    lines: Vec<PurchaseLineItem>,
) -> Purchase {
    let total_value = lines
        .iter()
        .map(|l| l.quantity_received * l.unit_cost)
        .sum();
    repo.insert_purchase(NewPurchase {
        supplier: "Pasar Induk".to_string(),
        line_items: lines,
        total_value,
    })
    .await
    .unwrap()
}

/// Creates and completes a purchase in one step.
pub async fn receive(
    repo: &MemoryWarehouseRepository,
    service: &StockService,
    item_id: Uuid,
    quantity: &str,
    cost: &str,
) -> Uuid {
    let purchase = pending_purchase(repo, vec![line(item_id, quantity, cost)]).await;
    service.complete_purchase(purchase.id).await.unwrap();
    purchase.id
}

pub async fn pending_order(repo: &MemoryWarehouseRepository, number: &str) -> Order {
    repo.insert_order(NewOrder {
        order_number: number.to_string(),
        customer_name: "Ibu Sari".to_string(),
        total_amount: dec("100000"),
    })
    .await
    .unwrap()
}

pub fn need(item_id: Uuid, quantity: &str) -> RequiredLineItem {
    RequiredLineItem {
        item_id,
        quantity_needed: dec(quantity),
    }
}

pub async fn stock_of(repo: &MemoryWarehouseRepository, item_id: Uuid) -> InventoryItem {
    repo.get_item(item_id).await.unwrap().unwrap()
}

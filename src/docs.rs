// src/docs.rs

use utoipa::OpenApi;

use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Warehouse ---
        handlers::warehouse::create_item,
        handlers::warehouse::list_items,
        handlers::warehouse::get_item,
        handlers::warehouse::adjust_stock,
        handlers::warehouse::list_item_movements,
        handlers::warehouse::reconcile_item,
        handlers::warehouse::diagnose_prices,
        handlers::warehouse::repair_prices,

        // --- Purchases ---
        handlers::purchases::create_purchase,
        handlers::purchases::complete_purchase,

        // --- Orders ---
        handlers::orders::create_order,
        handlers::orders::can_complete_order,
        handlers::orders::complete_order,
    ),
    components(
        schemas(
            // --- Warehouse ---
            models::warehouse::InventoryItem,
            models::warehouse::StockMovement,
            models::warehouse::StockMovementReason,
            models::warehouse::StockShortage,
            models::warehouse::StockReconciliation,

            // --- Purchases ---
            models::purchases::PurchaseStatus,
            models::purchases::Purchase,
            models::purchases::PurchaseLineItem,
            models::purchases::PurchaseCompletionResult,

            // --- Orders ---
            models::orders::OrderStatus,
            models::orders::Order,
            models::orders::RequiredLineItem,
            models::orders::DeductedItem,
            models::orders::OrderCompletionResult,
            models::orders::CanCompleteReport,

            // --- Price repair ---
            models::repair::RepairMethod,
            models::repair::PriceDiagnostic,
            models::repair::RepairedItem,
            models::repair::RepairError,
            models::repair::FixResults,
            models::repair::PriceRepairReport,

            // --- Payloads ---
            handlers::warehouse::CreateItemPayload,
            handlers::warehouse::AdjustStockPayload,
            handlers::purchases::CreatePurchasePayload,
            handlers::orders::CreateOrderPayload,
            handlers::orders::OrderLinesPayload,
        )
    ),
    tags(
        (name = "Warehouse", description = "Inventory items, valuation and price repair"),
        (name = "Purchases", description = "Purchase ledger and completion"),
        (name = "Orders", description = "Order completion and stock deduction"),
    )
)]
pub struct ApiDoc;

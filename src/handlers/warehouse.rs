// src/handlers/warehouse.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    handlers::validate_not_negative,
    models::warehouse::NewInventoryItem,
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateItemPayload {
    #[validate(length(min = 1, message = "The name is required."))]
    pub name: String,

    #[validate(length(min = 1, message = "The category is required."))]
    pub category: String,

    #[validate(length(min = 1, message = "The unit is required."))]
    pub unit: String,

    // Low-stock alert threshold. Optional; defaults to zero.
    #[validate(custom(function = validate_not_negative))]
    #[serde(default)]
    pub minimum_stock: Decimal,
}

/// Registers a new inventory item. Stock starts at zero and unvalued; only
/// purchase completions move it from there.
#[utoipa::path(
    post,
    path = "/api/warehouse/items",
    tag = "Warehouse",
    request_body = CreateItemPayload,
    responses(
        (status = 201, description = "Item registered", body = crate::models::warehouse::InventoryItem),
        (status = 400, description = "Validation failed"),
    )
)]
pub async fn create_item(
    State(app_state): State<AppState>,
    Json(payload): Json<CreateItemPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let item = app_state
        .warehouse_repo
        .insert_item(NewInventoryItem {
            name: payload.name,
            category: payload.category,
            unit: payload.unit,
            minimum_stock: payload.minimum_stock,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(item)))
}

#[utoipa::path(
    get,
    path = "/api/warehouse/items",
    tag = "Warehouse",
    responses(
        (status = 200, description = "All inventory items", body = [crate::models::warehouse::InventoryItem]),
    )
)]
pub async fn list_items(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let items = app_state.warehouse_repo.list_items().await?;
    Ok((StatusCode::OK, Json(items)))
}

#[utoipa::path(
    get,
    path = "/api/warehouse/items/{id}",
    tag = "Warehouse",
    params(("id" = Uuid, Path, description = "Inventory item id")),
    responses(
        (status = 200, description = "The item", body = crate::models::warehouse::InventoryItem),
        (status = 404, description = "Item not found"),
    )
)]
pub async fn get_item(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let item = app_state
        .warehouse_repo
        .get_item(id)
        .await?
        .ok_or(AppError::ItemNotFound(id))?;
    Ok((StatusCode::OK, Json(item)))
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdjustStockPayload {
    // Positive adds stock, negative removes it. Must not be zero.
    pub delta: Decimal,

    // Optional idempotency/audit key; one is generated when absent.
    pub adjustment_id: Option<Uuid>,
}

/// Manual stock correction. Stock changes, the WAC does not.
#[utoipa::path(
    post,
    path = "/api/warehouse/items/{id}/adjust",
    tag = "Warehouse",
    params(("id" = Uuid, Path, description = "Inventory item id")),
    request_body = AdjustStockPayload,
    responses(
        (status = 200, description = "Updated item", body = crate::models::warehouse::InventoryItem),
        (status = 404, description = "Item not found"),
        (status = 409, description = "Adjustment would take stock negative, or concurrent modification"),
    )
)]
pub async fn adjust_stock(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AdjustStockPayload>,
) -> Result<impl IntoResponse, AppError> {
    let correlation_id = payload.adjustment_id.unwrap_or_else(Uuid::new_v4);
    let item = app_state
        .stock_service
        .adjust_stock(id, payload.delta, correlation_id)
        .await?;
    Ok((StatusCode::OK, Json(item)))
}

/// Movement history for one item, newest first.
#[utoipa::path(
    get,
    path = "/api/warehouse/items/{id}/movements",
    tag = "Warehouse",
    params(("id" = Uuid, Path, description = "Inventory item id")),
    responses(
        (status = 200, description = "Stock movements, newest first", body = [crate::models::warehouse::StockMovement]),
        (status = 404, description = "Item not found"),
    )
)]
pub async fn list_item_movements(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    app_state
        .warehouse_repo
        .get_item(id)
        .await?
        .ok_or(AppError::ItemNotFound(id))?;
    let movements = app_state.warehouse_repo.list_movements(id).await?;
    Ok((StatusCode::OK, Json(movements)))
}

/// Compares the stored WAC against a fresh full-ledger recomputation.
#[utoipa::path(
    get,
    path = "/api/warehouse/items/{id}/reconcile",
    tag = "Warehouse",
    params(("id" = Uuid, Path, description = "Inventory item id")),
    responses(
        (status = 200, description = "Drift report", body = crate::models::warehouse::StockReconciliation),
        (status = 404, description = "Item not found"),
    )
)]
pub async fn reconcile_item(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let report = app_state.stock_service.reconcile_stock(id).await?;
    Ok((StatusCode::OK, Json(report)))
}

/// Scans for items holding stock without a valid price. Read-only.
#[utoipa::path(
    get,
    path = "/api/warehouse/price-repair",
    tag = "Warehouse",
    responses(
        (status = 200, description = "Diagnostic counts", body = crate::models::repair::PriceDiagnostic),
    )
)]
pub async fn diagnose_prices(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let diagnostic = app_state.repair_service.diagnose().await?;
    Ok((StatusCode::OK, Json(diagnostic)))
}

/// Runs the repair batch: ledger WAC first, category default second.
#[utoipa::path(
    post,
    path = "/api/warehouse/price-repair",
    tag = "Warehouse",
    responses(
        (status = 200, description = "What was fixed, how, and what failed", body = crate::models::repair::PriceRepairReport),
    )
)]
pub async fn repair_prices(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let report = app_state.repair_service.repair().await?;
    Ok((StatusCode::OK, Json(report)))
}

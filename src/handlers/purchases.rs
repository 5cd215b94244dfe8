// src/handlers/purchases.rs

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
    models::purchases::{NewPurchase, PurchaseLineItem, RawPurchaseLineItem},
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePurchasePayload {
    #[validate(length(min = 1, message = "The supplier is required."))]
    pub supplier: String,

    // Lines are accepted in any of the historical field spellings and
    // normalized right here, before anything else sees them.
    #[validate(length(min = 1, message = "At least one line item is required."))]
    #[schema(value_type = Vec<PurchaseLineItem>)]
    pub line_items: Vec<RawPurchaseLineItem>,

    // Defaults to the sum of the normalized lines.
    pub total_value: Option<Decimal>,
}

/// Creates a pending purchase. Nothing touches stock until it is completed.
#[utoipa::path(
    post,
    path = "/api/purchases",
    tag = "Purchases",
    request_body = CreatePurchasePayload,
    responses(
        (status = 201, description = "Pending purchase created", body = crate::models::purchases::Purchase),
        (status = 400, description = "Validation failed or invalid line items"),
    )
)]
pub async fn create_purchase(
    State(app_state): State<AppState>,
    Json(payload): Json<CreatePurchasePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let mut lines = Vec::with_capacity(payload.line_items.len());
    let mut problems = Vec::new();
    for (index, raw) in payload.line_items.iter().enumerate() {
        match raw.normalize() {
            Ok(line) => lines.push(line),
            Err(problem) => problems.push(format!("line {index}: {problem}")),
        }
    }
    if !problems.is_empty() {
        return Err(AppError::InvalidLineItems(problems));
    }

    let total_value = payload.total_value.unwrap_or_else(|| {
        lines
            .iter()
            .map(|l| l.quantity_received * l.unit_cost)
            .sum()
    });

    let purchase = app_state
        .warehouse_repo
        .insert_purchase(NewPurchase {
            supplier: payload.supplier,
            line_items: lines,
            total_value,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(purchase)))
}

/// Marks a purchase completed: stock increases and the WAC folds in the
/// receipt, atomically across all line items. Safe to retry.
#[utoipa::path(
    post,
    path = "/api/purchases/{id}/complete",
    tag = "Purchases",
    params(("id" = Uuid, Path, description = "Purchase id")),
    responses(
        (status = 200, description = "Purchase completed (or already was)", body = crate::models::purchases::PurchaseCompletionResult),
        (status = 404, description = "Purchase or a line item's inventory item not found"),
        (status = 409, description = "Purchase cancelled, or concurrent modification"),
    )
)]
pub async fn complete_purchase(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let result = app_state.stock_service.complete_purchase(id).await?;
    Ok((StatusCode::OK, Json(result)))
}

// src/handlers/orders.rs

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
    models::orders::{NewOrder, RequiredLineItem},
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderPayload {
    #[validate(length(min = 1, message = "The order number is required."))]
    pub order_number: String,

    #[validate(length(min = 1, message = "The customer name is required."))]
    pub customer_name: String,

    #[validate(custom(function = validate_not_negative))]
    #[serde(default)]
    pub total_amount: Decimal,
}

// The ingredient requirements for a completion or its dry-run. Recipe
// explosion happens upstream; this subsystem only sees the flattened lines.
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderLinesPayload {
    #[validate(length(min = 1, message = "At least one required ingredient is needed."))]
    pub required_items: Vec<RequiredLineItem>,
}

/// Creates a pending order. Stock is untouched until completion.
#[utoipa::path(
    post,
    path = "/api/orders",
    tag = "Orders",
    request_body = CreateOrderPayload,
    responses(
        (status = 201, description = "Pending order created", body = crate::models::orders::Order),
        (status = 400, description = "Validation failed"),
    )
)]
pub async fn create_order(
    State(app_state): State<AppState>,
    Json(payload): Json<CreateOrderPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let order = app_state
        .warehouse_repo
        .insert_order(NewOrder {
            order_number: payload.order_number,
            customer_name: payload.customer_name,
            total_amount: payload.total_amount,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(order)))
}

/// Dry-run of the sufficiency check: reports every shortage, changes nothing.
#[utoipa::path(
    post,
    path = "/api/orders/{id}/can-complete",
    tag = "Orders",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = OrderLinesPayload,
    responses(
        (status = 200, description = "Whether the order could complete right now", body = crate::models::orders::CanCompleteReport),
        (status = 404, description = "Order or item not found"),
    )
)]
pub async fn can_complete_order(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<OrderLinesPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let report = app_state
        .stock_service
        .can_complete_order(id, &payload.required_items)
        .await?;
    Ok((StatusCode::OK, Json(report)))
}

/// Completes the order and deducts stock for every required ingredient,
/// all-or-nothing. Insufficient stock names every deficient item. Safe to
/// retry; a second completion deducts nothing.
#[utoipa::path(
    post,
    path = "/api/orders/{id}/complete",
    tag = "Orders",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = OrderLinesPayload,
    responses(
        (status = 200, description = "Order completed, stock deducted", body = crate::models::orders::OrderCompletionResult),
        (status = 404, description = "Order or item not found"),
        (status = 409, description = "Insufficient stock, cancelled order, or concurrent modification"),
    )
)]
pub async fn complete_order(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<OrderLinesPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let result = app_state
        .stock_service
        .complete_order(id, &payload.required_items)
        .await?;
    Ok((StatusCode::OK, Json(result)))
}

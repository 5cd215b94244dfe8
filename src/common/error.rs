// src/common/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::models::warehouse::StockShortage;

// Our error type, built on `thiserror` for better ergonomics.
// Every variant a caller can act on carries enough structure to act on,
// never just a message string.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("One or more purchase line items are invalid")]
    InvalidLineItems(Vec<String>),

    #[error("Inventory item {0} not found")]
    ItemNotFound(Uuid),

    #[error("Purchase {0} not found")]
    PurchaseNotFound(Uuid),

    #[error("Order {0} not found")]
    OrderNotFound(Uuid),

    #[error("Purchase {purchase_id} cannot be completed from status '{status}'")]
    PurchaseNotCompletable { purchase_id: Uuid, status: String },

    #[error("Order {order_id} cannot be completed from status '{status}'")]
    OrderNotCompletable { order_id: Uuid, status: String },

    // Carries every deficient item, not just the first one found.
    #[error("Insufficient stock for {} item(s)", .0.len())]
    InsufficientStock(Vec<StockShortage>),

    // Optimistic-concurrency retries exhausted. Transient: the caller
    // should retry the whole operation.
    #[error("Inventory was modified concurrently, retry the operation")]
    ConcurrentModification,

    // Database error variant (sqlx)
    #[error("Database error")]
    DatabaseError(#[from] sqlx::Error),

    // Generic variant for any other unexpected error.
    // `anyhow::Error` keeps the error context around for the logs.
    #[error("Internal server error")]
    InternalServerError(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            // Return every validation detail, field by field.
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                (
                    StatusCode::BAD_REQUEST,
                    json!({ "error": "One or more fields are invalid.", "details": details }),
                )
            }
            AppError::InvalidLineItems(problems) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "One or more purchase line items are invalid.", "details": problems }),
            ),
            AppError::ItemNotFound(id) => (
                StatusCode::NOT_FOUND,
                json!({ "error": "Inventory item not found.", "itemId": id }),
            ),
            AppError::PurchaseNotFound(id) => (
                StatusCode::NOT_FOUND,
                json!({ "error": "Purchase not found.", "purchaseId": id }),
            ),
            AppError::OrderNotFound(id) => (
                StatusCode::NOT_FOUND,
                json!({ "error": "Order not found.", "orderId": id }),
            ),
            AppError::PurchaseNotCompletable { purchase_id, status } => (
                StatusCode::CONFLICT,
                json!({
                    "error": "Purchase cannot be completed from its current status.",
                    "purchaseId": purchase_id,
                    "status": status,
                }),
            ),
            AppError::OrderNotCompletable { order_id, status } => (
                StatusCode::CONFLICT,
                json!({
                    "error": "Order cannot be completed from its current status.",
                    "orderId": order_id,
                    "status": status,
                }),
            ),
            AppError::InsufficientStock(shortages) => (
                StatusCode::CONFLICT,
                json!({
                    "error": "Insufficient stock to complete the order.",
                    "insufficientStock": shortages,
                }),
            ),
            AppError::ConcurrentModification => (
                StatusCode::CONFLICT,
                json!({
                    "error": "Inventory was modified concurrently. Please retry.",
                    "retryable": true,
                }),
            ),

            // Everything else (DatabaseError, InternalServerError) becomes a 500.
            // `tracing` logs the detailed message that `thiserror` gives us.
            ref e => {
                tracing::error!("Internal server error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "An unexpected error occurred." }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

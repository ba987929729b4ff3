//! Order API routes.

use axum::{
    Json,
    extract::{Path, State},
};

use limoda_checkout::model::Order;
use limoda_core::OrderId;

use crate::error::{AppError, Result};
use crate::state::AppState;

/// Fetch a committed order.
///
/// GET /api/orders/{id}
///
/// Orders are frozen at commit; this view is what the confirmation page
/// renders, PIX QR code included.
///
/// # Errors
///
/// Returns 404 if the order does not exist.
pub async fn show(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Order>> {
    let order_id = OrderId::new(id);
    let order = state
        .store()
        .order(&order_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {order_id}")))?;
    Ok(Json(order))
}

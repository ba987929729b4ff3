//! Checkout API route.

use axum::{Json, extract::State, http::StatusCode};

use limoda_checkout::CheckoutRequest;
use limoda_checkout::model::Order;

use crate::error::Result;
use crate::state::AppState;

/// Run a cart through the full pipeline.
///
/// POST /api/checkout
///
/// Validates the cart and contact fields, resolves the delivery address,
/// prices the cart, charges the gateway, and commits the order
/// atomically. On success the response carries the frozen order document
/// (with the PIX QR code when that method was chosen).
///
/// # Errors
///
/// Returns 422 for validation and coupon failures, 409 when stock ran
/// out or the commit kept conflicting, 402 when the card was declined,
/// and 502 when an upstream service failed.
pub async fn submit(
    State(state): State<AppState>,
    Json(request): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<Order>)> {
    let order = state.checkout().submit(request).await?;

    // The committed decrements make any cached snapshots stale
    for line in &order.lines {
        state.availability().invalidate(&line.variant_id).await;
    }

    Ok((StatusCode::CREATED, Json(order)))
}

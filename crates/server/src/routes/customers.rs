//! Customer API routes.
//!
//! The aggregate view, the loyalty ladder position, and the two coupon
//! slot operations (issue, mark read). Redemption never happens here;
//! only a committed checkout consumes a coupon.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;

use limoda_checkout::coupon::IssuePolicy;
use limoda_checkout::loyalty::{self, LoyaltyStatus};
use limoda_checkout::model::{Coupon, CustomerAggregate};
use limoda_core::{CustomerId, DiscountSpec};

use crate::error::{AppError, Result};
use crate::state::AppState;

/// Message used when neither the request nor the loyalty tier has one.
const FALLBACK_COUPON_MESSAGE: &str = "Você ganhou um cupom especial!";

/// Fetch a customer aggregate.
///
/// GET /api/customers/{id}
///
/// # Errors
///
/// Returns 404 if the customer does not exist.
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CustomerAggregate>> {
    let customer_id = CustomerId::new(id);
    let read = state
        .store()
        .customer(&customer_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("customer {customer_id}")))?;
    Ok(Json(read.doc))
}

/// Loyalty ladder position for a customer.
///
/// GET /api/customers/{id}/loyalty
///
/// # Errors
///
/// Returns 404 if the customer does not exist.
pub async fn loyalty_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<LoyaltyStatus>> {
    let customer_id = CustomerId::new(id);
    let read = state
        .store()
        .customer(&customer_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("customer {customer_id}")))?;
    Ok(Json(loyalty::status_for(read.doc.total_spent)))
}

// ============================================================================
// Coupon slot
// ============================================================================

/// Request to issue a coupon into the customer's slot.
#[derive(Debug, Default, Deserialize)]
pub struct IssueCouponRequest {
    /// Discount to grant; omitted means "whatever the loyalty tier
    /// suggests".
    pub discount: Option<DiscountSpec>,
    /// Message shown with the coupon; defaults to the loyalty-tier text.
    pub message: Option<String>,
    /// Replace an unredeemed coupon instead of rejecting the issue.
    #[serde(default)]
    pub overwrite: bool,
}

/// Issue a coupon into the customer's single slot.
///
/// POST /api/customers/{id}/coupon
///
/// The code is generated from the customer's first name and the
/// discount. An empty body issues the discount the customer's loyalty
/// tier suggests.
///
/// # Errors
///
/// Returns 422 if the slot is occupied and `overwrite` is false, 400 if
/// no discount was given and the tier suggests none, 404 if the
/// customer does not exist.
pub async fn issue_coupon(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<IssueCouponRequest>,
) -> Result<(StatusCode, Json<Coupon>)> {
    let customer_id = CustomerId::new(id);
    let policy = if request.overwrite {
        IssuePolicy::Overwrite
    } else {
        IssuePolicy::Reject
    };

    let read = state
        .store()
        .customer(&customer_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("customer {customer_id}")))?;
    let tier = loyalty::classify(read.doc.total_spent);

    let discount = match request.discount {
        Some(discount) => discount,
        None => {
            let percent = loyalty::suggested_discount_percent(tier);
            if percent.is_zero() {
                return Err(AppError::BadRequest(format!(
                    "no discount given and the {} tier has none to suggest",
                    tier.display_name()
                )));
            }
            DiscountSpec::percent(percent)
        }
    };

    let message = match request.message {
        Some(message) => message,
        None => loyalty::suggestion_message(tier)
            .unwrap_or_else(|| FALLBACK_COUPON_MESSAGE.to_string()),
    };

    let coupon = state
        .coupons()
        .issue(&customer_id, discount, message, policy)
        .await?;
    Ok((StatusCode::CREATED, Json(coupon)))
}

/// Mark the active coupon as seen.
///
/// POST /api/customers/{id}/coupon/read
///
/// # Errors
///
/// Returns 422 if no coupon is active, 404 if the customer does not
/// exist.
pub async fn mark_coupon_read(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let customer_id = CustomerId::new(id);
    state.coupons().mark_read(&customer_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

//! The single-slot coupon ledger.
//!
//! Each customer holds at most one active coupon. Redeeming clears the
//! slot inside the order commit batch, so a coupon can never be spent
//! twice even from two devices. Issuing and read-marking go through
//! their own compare-and-swap loop against the customer document.

use std::sync::Arc;

use chrono::Utc;
use limoda_core::{CouponCode, CustomerId, DiscountKind, DiscountSpec};
use rand::Rng;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::error::CheckoutError;
use crate::model::{Coupon, CustomerAggregate};
use crate::store::{CommerceStore, CustomerWrite, MAX_CAS_ATTEMPTS, StoreError};

/// Errors from coupon lookup or redemption.
#[derive(Debug, Error)]
pub enum CouponError {
    /// The slot already holds an unredeemed coupon and the issue policy
    /// forbids replacing it.
    #[error("customer already has an unredeemed coupon: {code}")]
    SlotOccupied { code: CouponCode },
    /// No coupon is active on this account.
    #[error("no coupon is active on this account")]
    NoneActive,
    /// The entered code does not match the active coupon.
    #[error("coupon code does not match the active coupon")]
    CodeMismatch,
}

/// What to do when issuing into an occupied slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssuePolicy {
    /// Fail with [`CouponError::SlotOccupied`].
    Reject,
    /// Replace the unredeemed coupon.
    Overwrite,
}

/// Generate a coupon code: the first four letters of the customer's
/// first name, four random digits, the discount value, and a `%` or `RS`
/// suffix. E.g. `ANAP482325%`.
pub fn generate_code(first_name: &str, discount: &DiscountSpec) -> CouponCode {
    let prefix: String = first_name.chars().take(4).collect::<String>().to_uppercase();
    let digits: u32 = rand::rng().random_range(1000..10_000);
    let suffix = match discount.kind {
        DiscountKind::Percent => "%",
        DiscountKind::Fixed => "RS",
    };
    CouponCode::new(format!("{prefix}{digits}{}{suffix}", discount.value))
}

// =============================================================================
// Slot rules
// =============================================================================

/// Place a coupon into the customer's slot.
///
/// # Errors
///
/// With [`IssuePolicy::Reject`], fails if the slot is occupied.
pub fn place_in_slot(
    customer: &mut CustomerAggregate,
    coupon: Coupon,
    policy: IssuePolicy,
) -> Result<(), CouponError> {
    if let Some(active) = &customer.active_coupon
        && policy == IssuePolicy::Reject
    {
        return Err(CouponError::SlotOccupied {
            code: active.code.clone(),
        });
    }
    customer.active_coupon = Some(coupon);
    Ok(())
}

/// Mark the active coupon's notification as opened.
///
/// # Errors
///
/// Fails if no coupon is active.
pub fn mark_read(customer: &mut CustomerAggregate) -> Result<(), CouponError> {
    match customer.active_coupon.as_mut() {
        Some(coupon) => {
            coupon.is_read = true;
            Ok(())
        }
        None => Err(CouponError::NoneActive),
    }
}

/// Resolve customer input against the active coupon.
///
/// # Errors
///
/// Fails if no coupon is active or the code does not match it.
pub fn match_active(customer: &CustomerAggregate, entered: &str) -> Result<Coupon, CouponError> {
    let active = customer
        .active_coupon
        .as_ref()
        .ok_or(CouponError::NoneActive)?;
    if active.code.matches(entered) {
        Ok(active.clone())
    } else {
        Err(CouponError::CodeMismatch)
    }
}

/// Take the active coupon out of the slot. Called inside the commit
/// batch build; the emptied slot lands atomically with the order.
pub fn redeem(customer: &mut CustomerAggregate) -> Option<Coupon> {
    customer.active_coupon.take()
}

// =============================================================================
// CouponLedger
// =============================================================================

/// Store-backed coupon operations with optimistic retry.
#[derive(Clone)]
pub struct CouponLedger {
    store: Arc<dyn CommerceStore>,
}

impl CouponLedger {
    #[must_use]
    pub fn new(store: Arc<dyn CommerceStore>) -> Self {
        Self { store }
    }

    /// Issue a coupon to a customer, generating its code from their
    /// first name.
    ///
    /// # Errors
    ///
    /// Fails if the customer does not exist, the slot is occupied under
    /// [`IssuePolicy::Reject`], or the write keeps losing version races.
    #[instrument(skip(self, message), fields(customer_id = %customer_id))]
    pub async fn issue(
        &self,
        customer_id: &CustomerId,
        discount: DiscountSpec,
        message: String,
        policy: IssuePolicy,
    ) -> Result<Coupon, CheckoutError> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            let read = self
                .store
                .customer(customer_id)
                .await?
                .ok_or_else(|| CheckoutError::CustomerNotFound(customer_id.clone()))?;
            let mut doc = read.doc;
            let coupon = Coupon {
                code: generate_code(doc.first_name(), &discount),
                message: message.clone(),
                discount,
                is_read: false,
                assigned_at: Utc::now(),
            };
            place_in_slot(&mut doc, coupon.clone(), policy)?;

            match self
                .store
                .update_customer(CustomerWrite {
                    expected_version: read.version,
                    customer: doc,
                })
                .await
            {
                Ok(_) => {
                    info!(code = %coupon.code, "coupon issued");
                    return Ok(coupon);
                }
                Err(StoreError::VersionConflict { .. }) if attempts < MAX_CAS_ATTEMPTS => {
                    warn!(attempts, "coupon issue lost a version race, retrying");
                }
                Err(StoreError::VersionConflict { .. }) => {
                    return Err(CheckoutError::CommitConflict { attempts });
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Mark the customer's active coupon as read.
    ///
    /// # Errors
    ///
    /// Fails if the customer does not exist, no coupon is active, or the
    /// write keeps losing version races.
    #[instrument(skip(self), fields(customer_id = %customer_id))]
    pub async fn mark_read(&self, customer_id: &CustomerId) -> Result<(), CheckoutError> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            let read = self
                .store
                .customer(customer_id)
                .await?
                .ok_or_else(|| CheckoutError::CustomerNotFound(customer_id.clone()))?;
            let mut doc = read.doc;
            mark_read(&mut doc)?;

            match self
                .store
                .update_customer(CustomerWrite {
                    expected_version: read.version,
                    customer: doc,
                })
                .await
            {
                Ok(_) => return Ok(()),
                Err(StoreError::VersionConflict { .. }) if attempts < MAX_CAS_ATTEMPTS => {
                    warn!(attempts, "read-mark lost a version race, retrying");
                }
                Err(StoreError::VersionConflict { .. }) => {
                    return Err(CheckoutError::CommitConflict { attempts });
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}

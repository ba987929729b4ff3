//! Unified error taxonomy for the checkout pipeline.
//!
//! Module-specific errors (`CouponError`, `LookupError`, `PaymentError`,
//! `StoreError`) live next to their code; this module folds them into the
//! one error the orchestrator and the HTTP layer speak.

use limoda_core::{CepError, CpfError, CustomerId, EmailError, VariantId};
use thiserror::Error;

use crate::clients::{LookupError, PaymentError};
use crate::coupon::CouponError;
use crate::inventory::StockShortfall;
use crate::orchestrator::FlowError;
use crate::store::StoreError;

/// A cart or contact field failed validation before anything was charged
/// or written.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// The cart has no lines.
    #[error("cart is empty")]
    EmptyCart,
    /// A line asked for zero units.
    #[error("quantity must be at least 1 for variant {variant_id}")]
    ZeroQuantity { variant_id: VariantId },
    /// A line references a variant the catalog does not have.
    #[error("unknown variant: {variant_id}")]
    UnknownVariant { variant_id: VariantId },
    /// A line references a variant that is not for sale.
    #[error("variant is not available for purchase: {variant_id}")]
    InactiveVariant { variant_id: VariantId },
    /// The contact name is missing or blank.
    #[error("customer name is required")]
    MissingName,
    /// The contact email failed to parse.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),
    /// The CPF failed to parse or its check digits are wrong.
    #[error("invalid CPF: {0}")]
    InvalidCpf(#[from] CpfError),
    /// The CEP failed to parse.
    #[error("invalid CEP: {0}")]
    InvalidCep(#[from] CepError),
    /// Courier delivery was chosen but no address is available.
    #[error("delivery requires an address")]
    MissingAddress,
    /// Courier delivery was chosen but the house number is blank.
    #[error("delivery address requires a house number")]
    MissingAddressNumber,
    /// Card payment was chosen but no encrypted card token was sent.
    #[error("card payment requires a card token")]
    MissingCardToken,
    /// The purchase terms checkbox was not accepted.
    #[error("purchase terms must be accepted")]
    TermsNotAccepted,
}

/// Everything that can go wrong between a submitted cart and a committed
/// order.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Input validation failed; nothing was charged or written.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// One or more lines exceed the stock on hand.
    #[error("insufficient stock for {} line(s)", .shortfalls.len())]
    InsufficientStock { shortfalls: Vec<StockShortfall> },

    /// Coupon lookup or redemption failed.
    #[error(transparent)]
    Coupon(#[from] CouponError),

    /// The postal lookup failed or the CEP does not exist.
    #[error(transparent)]
    Lookup(#[from] LookupError),

    /// The payment gateway declined or errored. Nothing was written.
    #[error(transparent)]
    Payment(#[from] PaymentError),

    /// The document store rejected a read or write.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A stage transition was attempted out of order.
    #[error(transparent)]
    Flow(#[from] FlowError),

    /// No customer aggregate exists for this id.
    #[error("customer not found: {0}")]
    CustomerNotFound(CustomerId),

    /// The commit kept losing the version race and gave up.
    #[error("order commit conflicted {attempts} times, giving up")]
    CommitConflict { attempts: u32 },
}

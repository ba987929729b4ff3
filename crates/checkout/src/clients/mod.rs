//! Outbound HTTP clients and their service contracts.
//!
//! Checkout talks to two external services: ViaCEP for postal code
//! resolution and PagBank for payment capture. Both sit behind traits
//! so the pipeline can run against stubs in tests.

mod pagbank;
mod viacep;

pub use pagbank::PagBankClient;
pub use viacep::ViaCepClient;

use async_trait::async_trait;
use limoda_core::{CepCode, Cpf, Email, Money, PaymentMethod};
use thiserror::Error;

use crate::model::{Address, PixQr};

/// Errors from postal code resolution.
#[derive(Debug, Error)]
pub enum LookupError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The postal code is well formed but not registered.
    #[error("no address registered for postal code {0}")]
    NotFound(CepCode),

    /// The lookup service returned an error response.
    #[error("lookup service error: {status} - {message}")]
    Service { status: u16, message: String },

    /// Failed to parse the response.
    #[error("parse error: {0}")]
    Parse(String),
}

/// Errors from the payment gateway.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The gateway processed the charge and refused it.
    #[error("payment declined: {reason}")]
    Declined { reason: String },

    /// The gateway returned an error response.
    #[error("gateway error: {status} - {message}")]
    Gateway { status: u16, message: String },

    /// Failed to parse the response.
    #[error("parse error: {0}")]
    Parse(String),
}

/// The street-level address a postal code resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAddress {
    pub street: String,
    pub neighborhood: String,
    pub city: String,
    pub state: String,
}

/// Resolves postal codes to street addresses.
#[async_trait]
pub trait PostalLookup: Send + Sync {
    /// Resolve a postal code.
    ///
    /// # Errors
    ///
    /// Fails if the code is unregistered or the service is unreachable.
    async fn resolve(&self, cep: &CepCode) -> Result<ResolvedAddress, LookupError>;
}

/// Encrypted card data produced by the gateway's browser SDK. Only this
/// ciphertext ever reaches the service; raw card numbers do not.
#[derive(Debug, Clone)]
pub struct CardDetails {
    pub encrypted_token: String,
}

/// One display line sent along with a charge. Informational only; the
/// captured amount always comes from [`ChargeRequest::amount`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargeItem {
    pub name: String,
    pub quantity: u32,
    /// Unit price in centavos.
    pub unit_amount: i64,
}

/// A charge for one order, built after pricing and sent before commit.
#[derive(Debug, Clone)]
pub struct ChargeRequest {
    /// Our reference for the payment order (`LIMODA-<millis>`).
    pub reference: String,
    pub customer_name: String,
    pub customer_email: Email,
    pub customer_tax_id: Cpf,
    pub method: PaymentMethod,
    /// The grand total to capture.
    pub amount: Money,
    pub items: Vec<ChargeItem>,
    /// Delivery address; `None` for store pickup.
    pub shipping_address: Option<Address>,
    /// Required for card payments.
    pub card: Option<CardDetails>,
}

/// What a successful charge produced.
#[derive(Debug, Clone)]
pub struct ChargeOutcome {
    /// The gateway's id for the created payment order.
    pub gateway_order_id: String,
    /// QR code for the customer to pay, present for PIX charges.
    pub pix_qr: Option<PixQr>,
}

/// Captures payment for an order.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a payment order and capture the charge.
    ///
    /// # Errors
    ///
    /// Fails if the gateway declines the charge, rejects the request,
    /// or is unreachable.
    async fn charge(&self, request: &ChargeRequest) -> Result<ChargeOutcome, PaymentError>;
}

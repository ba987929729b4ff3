//! Li Moda Checkout - the order pipeline library.
//!
//! Everything between a submitted cart and a durable order lives here:
//! validation, pricing, shipping-zone resolution, the coupon ledger,
//! loyalty classification, the payment gateway call, and the atomic
//! commit against the versioned document store.
//!
//! # Modules
//!
//! - [`model`] - Domain documents (variants, customers, coupons, orders)
//! - [`pricing`] - Cart totals from effective prices and discounts
//! - [`shipping`] - Delivery fee resolution with free-zone neighborhoods
//! - [`loyalty`] - Tier classification from lifetime spend
//! - [`coupon`] - The single-slot coupon ledger
//! - [`inventory`] - Advisory availability and reservation plans
//! - [`store`] - Versioned document store contract and memory backend
//! - [`clients`] - ViaCEP postal lookup and PagBank payment gateway
//! - [`orchestrator`] - The checkout flow itself

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod clients;
pub mod coupon;
pub mod error;
pub mod inventory;
pub mod loyalty;
pub mod model;
pub mod orchestrator;
pub mod pricing;
pub mod shipping;
pub mod store;

pub use error::{CheckoutError, ValidationError};
pub use orchestrator::{
    CheckoutFlow, CheckoutRequest, CheckoutService, CheckoutStage, ContactForm, DeliveryRequest,
    PaymentRequest,
};

//! Core types for Li Moda.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod coupon;
pub mod cpf;
pub mod email;
pub mod id;
pub mod loyalty;
pub mod money;
pub mod postal;
pub mod status;

pub use coupon::{CouponCode, DiscountKind, DiscountSpec};
pub use cpf::{Cpf, CpfError};
pub use email::{Email, EmailError};
pub use id::*;
pub use loyalty::LoyaltyTier;
pub use money::Money;
pub use postal::{CepCode, CepError};
pub use status::*;

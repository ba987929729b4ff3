//! Li Moda Core - Shared domain types.
//!
//! This crate provides common types used across the Li Moda components:
//! - `checkout` - Cart validation, pricing, and the order commit pipeline
//! - `server` - Public-facing HTTP API
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no storage access, no HTTP
//! clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, money, CPF, CEP, and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;

//! HTTP API server for the Li Moda checkout pipeline.
//!
//! Library crate exposing the router, state, and configuration so
//! integration tests can drive the full application in-process.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod routes;
pub mod seed;
pub mod state;

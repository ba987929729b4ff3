//! HTTP route handlers for the checkout API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                              - Liveness check
//! GET  /health/ready                        - Readiness check (store reachable)
//!
//! # Catalog
//! GET  /api/catalog                         - Active variants with effective prices
//! GET  /api/variants/{id}/availability      - Cached stock snapshot for one variant
//!
//! # Checkout
//! POST /api/checkout                        - Run a cart through the full pipeline
//!
//! # Customers
//! GET  /api/customers/{id}                  - Customer aggregate
//! GET  /api/customers/{id}/loyalty          - Loyalty ladder position
//! POST /api/customers/{id}/coupon           - Issue a coupon into the slot
//! POST /api/customers/{id}/coupon/read      - Mark the active coupon as seen
//!
//! # Orders
//! GET  /api/orders/{id}                     - Committed order document
//! ```

pub mod catalog;
pub mod checkout;
pub mod customers;
pub mod orders;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the variant routes router.
pub fn variant_routes() -> Router<AppState> {
    Router::new().route("/{id}/availability", get(catalog::availability))
}

/// Create the customer routes router.
pub fn customer_routes() -> Router<AppState> {
    Router::new()
        .route("/{id}", get(customers::show))
        .route("/{id}/loyalty", get(customers::loyalty_status))
        .route("/{id}/coupon", post(customers::issue_coupon))
        .route("/{id}/coupon/read", post(customers::mark_coupon_read))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new().route("/{id}", get(orders::show))
}

/// Create all API routes for the server.
pub fn routes() -> Router<AppState> {
    Router::new()
        // Catalog
        .route("/api/catalog", get(catalog::index))
        .nest("/api/variants", variant_routes())
        // Checkout pipeline
        .route("/api/checkout", post(checkout::submit))
        // Customer aggregates and the coupon slot
        .nest("/api/customers", customer_routes())
        // Committed orders
        .nest("/api/orders", order_routes())
}

//! Versioned document store contract.
//!
//! # Collections
//!
//! - `variants` - Catalog variants with authoritative stock counts
//! - `customers` - Customer aggregates (spend, history, coupon slot)
//! - `orders` - Committed orders, append-only
//!
//! Every read returns the document together with its version; every
//! write names the version it read. A write whose expected version no
//! longer matches fails with [`StoreError::VersionConflict`] and changes
//! nothing, which is what lets checkout retry safely.
//!
//! [`CommerceStore::apply`] is the one multi-document operation: the
//! order insert, the stock decrements, and the customer update land
//! together or not at all.

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use limoda_core::{CustomerId, OrderId, VariantId};
use thiserror::Error;

use crate::model::{CustomerAggregate, Order, ProductVariant};

/// Upper bound on optimistic retry loops before a conflict is surfaced.
pub const MAX_CAS_ATTEMPTS: u32 = 3;

/// Errors from the document store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The referenced document does not exist.
    #[error("{collection} document not found: {key}")]
    NotFound {
        collection: &'static str,
        key: String,
    },

    /// An insert collided with an existing key.
    #[error("{collection} document already exists: {key}")]
    AlreadyExists {
        collection: &'static str,
        key: String,
    },

    /// A compare-and-swap write lost the version race.
    #[error("version conflict on {collection} document {key}")]
    VersionConflict {
        collection: &'static str,
        key: String,
    },
}

/// A document together with the version it was read at.
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
    pub doc: T,
    pub version: u64,
}

impl<T> Versioned<T> {
    #[must_use]
    pub const fn new(doc: T, version: u64) -> Self {
        Self { doc, version }
    }
}

/// A planned stock write for one variant, conditional on its version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantWrite {
    pub id: VariantId,
    /// Version the planner read. The write fails if it moved.
    pub expected_version: u64,
    /// Stock after the decrement.
    pub stock: u32,
    /// Sales counter after the increment.
    pub sales_count: u64,
}

/// A full customer replacement, conditional on its version.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerWrite {
    /// Version the caller read. The write fails if it moved.
    pub expected_version: u64,
    pub customer: CustomerAggregate,
}

/// Everything one checkout commits, applied atomically.
#[derive(Debug, Clone, PartialEq)]
pub struct CommitBatch {
    /// The new order. Its id must not exist yet.
    pub order: Order,
    /// Stock decrements, one per distinct cart variant.
    pub variants: Vec<VariantWrite>,
    /// The updated customer aggregate (spend, history, coupon slot).
    pub customer: CustomerWrite,
}

/// The document store the pipeline runs against.
#[async_trait]
pub trait CommerceStore: Send + Sync {
    /// Insert a new catalog variant. Fails if the id exists.
    async fn insert_variant(&self, variant: ProductVariant) -> Result<(), StoreError>;

    /// Insert a new customer aggregate. Fails if the id exists.
    async fn insert_customer(&self, customer: CustomerAggregate) -> Result<(), StoreError>;

    /// Read one variant with its version.
    async fn variant(&self, id: &VariantId) -> Result<Option<Versioned<ProductVariant>>, StoreError>;

    /// Read the whole catalog. Ordering is unspecified.
    async fn list_variants(&self) -> Result<Vec<Versioned<ProductVariant>>, StoreError>;

    /// Read one customer aggregate with its version.
    async fn customer(
        &self,
        id: &CustomerId,
    ) -> Result<Option<Versioned<CustomerAggregate>>, StoreError>;

    /// Replace a customer aggregate if its version still matches.
    /// Returns the new version.
    async fn update_customer(&self, write: CustomerWrite) -> Result<u64, StoreError>;

    /// Read one order. Orders are unversioned; they never change.
    async fn order(&self, id: &OrderId) -> Result<Option<Order>, StoreError>;

    /// Apply a commit batch: insert the order, write the stock
    /// decrements, and replace the customer, all or nothing. Any version
    /// mismatch or duplicate order id fails the whole batch with no
    /// partial effects.
    async fn apply(&self, batch: CommitBatch) -> Result<(), StoreError>;
}

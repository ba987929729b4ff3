//! In-memory store backend.
//!
//! One `RwLock` over all three collections. `apply` validates the whole
//! batch before touching anything, so a rejected batch leaves no partial
//! writes. This backend carries the test suite and local development;
//! it is also the reference semantics any durable backend must match.

use std::collections::HashMap;

use async_trait::async_trait;
use limoda_core::{CustomerId, OrderId, VariantId};
use tokio::sync::RwLock;

use crate::model::{CustomerAggregate, Order, ProductVariant};

use super::{CommerceStore, CommitBatch, CustomerWrite, StoreError, Versioned};

#[derive(Default)]
struct Collections {
    variants: HashMap<VariantId, Versioned<ProductVariant>>,
    customers: HashMap<CustomerId, Versioned<CustomerAggregate>>,
    orders: HashMap<OrderId, Order>,
}

/// The in-memory [`CommerceStore`].
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Collections>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CommerceStore for MemoryStore {
    async fn insert_variant(&self, variant: ProductVariant) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if inner.variants.contains_key(&variant.id) {
            return Err(StoreError::AlreadyExists {
                collection: "variants",
                key: variant.id.to_string(),
            });
        }
        inner
            .variants
            .insert(variant.id.clone(), Versioned::new(variant, 0));
        Ok(())
    }

    async fn insert_customer(&self, customer: CustomerAggregate) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if inner.customers.contains_key(&customer.id) {
            return Err(StoreError::AlreadyExists {
                collection: "customers",
                key: customer.id.to_string(),
            });
        }
        inner
            .customers
            .insert(customer.id.clone(), Versioned::new(customer, 0));
        Ok(())
    }

    async fn variant(&self, id: &VariantId) -> Result<Option<Versioned<ProductVariant>>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.variants.get(id).cloned())
    }

    async fn list_variants(&self) -> Result<Vec<Versioned<ProductVariant>>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.variants.values().cloned().collect())
    }

    async fn customer(
        &self,
        id: &CustomerId,
    ) -> Result<Option<Versioned<CustomerAggregate>>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.customers.get(id).cloned())
    }

    async fn update_customer(&self, write: CustomerWrite) -> Result<u64, StoreError> {
        let mut inner = self.inner.write().await;
        let id = write.customer.id.clone();
        let entry = inner
            .customers
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound {
                collection: "customers",
                key: id.to_string(),
            })?;
        if entry.version != write.expected_version {
            return Err(StoreError::VersionConflict {
                collection: "customers",
                key: id.to_string(),
            });
        }
        let new_version = entry.version + 1;
        *entry = Versioned::new(write.customer, new_version);
        Ok(new_version)
    }

    async fn order(&self, id: &OrderId) -> Result<Option<Order>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.orders.get(id).cloned())
    }

    async fn apply(&self, batch: CommitBatch) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;

        // Validate the whole batch first. Nothing below may fail once
        // mutation starts.
        if inner.orders.contains_key(&batch.order.id) {
            return Err(StoreError::AlreadyExists {
                collection: "orders",
                key: batch.order.id.to_string(),
            });
        }
        for write in &batch.variants {
            let current = inner
                .variants
                .get(&write.id)
                .ok_or_else(|| StoreError::NotFound {
                    collection: "variants",
                    key: write.id.to_string(),
                })?;
            if current.version != write.expected_version {
                return Err(StoreError::VersionConflict {
                    collection: "variants",
                    key: write.id.to_string(),
                });
            }
        }
        let customer_id = batch.customer.customer.id.clone();
        let current_customer =
            inner
                .customers
                .get(&customer_id)
                .ok_or_else(|| StoreError::NotFound {
                    collection: "customers",
                    key: customer_id.to_string(),
                })?;
        if current_customer.version != batch.customer.expected_version {
            return Err(StoreError::VersionConflict {
                collection: "customers",
                key: customer_id.to_string(),
            });
        }

        // Apply.
        for write in batch.variants {
            if let Some(entry) = inner.variants.get_mut(&write.id) {
                entry.doc.stock = write.stock;
                entry.doc.sales_count = write.sales_count;
                entry.version += 1;
            }
        }
        let customer_version = batch.customer.expected_version + 1;
        inner.customers.insert(
            customer_id,
            Versioned::new(batch.customer.customer, customer_version),
        );
        inner.orders.insert(batch.order.id.clone(), batch.order);
        Ok(())
    }
}

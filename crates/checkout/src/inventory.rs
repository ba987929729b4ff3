//! Stock planning and the advisory availability cache.

use std::sync::Arc;
use std::time::Duration;

use limoda_core::VariantId;
use moka::future::Cache;
use serde::Serialize;
use tracing::debug;

use crate::model::ProductVariant;
use crate::store::{CommerceStore, StoreError, VariantWrite, Versioned};

/// One cart line that current stock cannot cover.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockShortfall {
    pub variant_id: VariantId,
    pub requested: u32,
    pub available: u32,
}

/// Turn cart lines into conditional stock decrements.
///
/// Either every line fits and the full write set comes back, or the
/// complete list of shortfalls does. A partial plan is never produced,
/// so a cart with two short lines reports both at once.
///
/// # Errors
///
/// Returns every [`StockShortfall`] found.
pub fn plan_decrements(
    cart: &[(Versioned<ProductVariant>, u32)],
) -> Result<Vec<VariantWrite>, Vec<StockShortfall>> {
    let mut writes = Vec::with_capacity(cart.len());
    let mut shortfalls = Vec::new();

    for (variant, quantity) in cart {
        if variant.doc.stock < *quantity {
            shortfalls.push(StockShortfall {
                variant_id: variant.doc.id.clone(),
                requested: *quantity,
                available: variant.doc.stock,
            });
        } else {
            writes.push(VariantWrite {
                id: variant.doc.id.clone(),
                expected_version: variant.version,
                stock: variant.doc.stock - *quantity,
                sales_count: variant.doc.sales_count + u64::from(*quantity),
            });
        }
    }

    if shortfalls.is_empty() {
        Ok(writes)
    } else {
        Err(shortfalls)
    }
}

// =============================================================================
// AvailabilityCache
// =============================================================================

const CACHE_CAPACITY: u64 = 10_000;
const CACHE_TTL: Duration = Duration::from_secs(5);

/// A stock snapshot for storefront badges. It can lag live stock by up
/// to the cache TTL; the commit path re-reads under its own validation,
/// so a stale yes here never oversells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Availability {
    pub stock: u32,
    pub active: bool,
}

impl Availability {
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.active && self.stock > 0
    }
}

/// Read-through availability cache over the variant collection.
#[derive(Clone)]
pub struct AvailabilityCache {
    store: Arc<dyn CommerceStore>,
    cache: Cache<VariantId, Availability>,
}

impl AvailabilityCache {
    #[must_use]
    pub fn new(store: Arc<dyn CommerceStore>) -> Self {
        let cache = Cache::builder()
            .max_capacity(CACHE_CAPACITY)
            .time_to_live(CACHE_TTL)
            .build();
        Self { store, cache }
    }

    /// Look up a variant's advisory availability.
    ///
    /// # Errors
    ///
    /// Fails if the variant does not exist or the store read fails.
    pub async fn check(&self, variant_id: &VariantId) -> Result<Availability, StoreError> {
        if let Some(hit) = self.cache.get(variant_id).await {
            debug!(variant_id = %variant_id, "availability cache hit");
            return Ok(hit);
        }

        let variant =
            self.store
                .variant(variant_id)
                .await?
                .ok_or_else(|| StoreError::NotFound {
                    collection: "variants",
                    key: variant_id.to_string(),
                })?;
        let availability = Availability {
            stock: variant.doc.stock,
            active: variant.doc.active,
        };
        self.cache.insert(variant_id.clone(), availability).await;
        Ok(availability)
    }

    /// Drop the cached entry for a variant a commit just touched.
    pub async fn invalidate(&self, variant_id: &VariantId) {
        self.cache.invalidate(variant_id).await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use limoda_core::{Category, Money, ProductId, SizeSpec};
    use rust_decimal_macros::dec;

    use crate::store::MemoryStore;

    fn variant(id: &str, stock: u32) -> ProductVariant {
        ProductVariant {
            id: VariantId::new(id),
            product_id: ProductId::new("p-1"),
            name: "Legging Classic".to_owned(),
            category: Category::Leggings,
            color: Some("Preto".to_owned()),
            size: SizeSpec::Sized("M".to_owned()),
            price: Money::new(dec!(100)),
            promo: None,
            stock,
            sales_count: 7,
            active: true,
        }
    }

    #[test]
    fn plan_covers_every_line() {
        let cart = vec![
            (Versioned::new(variant("v-1", 5), 3), 2),
            (Versioned::new(variant("v-2", 1), 8), 1),
        ];

        let writes = plan_decrements(&cart).unwrap();
        assert_eq!(writes.len(), 2);
        let first = writes.first().unwrap();
        assert_eq!(first.stock, 3);
        assert_eq!(first.sales_count, 9);
        assert_eq!(first.expected_version, 3);
        let second = writes.get(1).unwrap();
        assert_eq!(second.stock, 0);
    }

    #[test]
    fn plan_reports_all_shortfalls_at_once() {
        let cart = vec![
            (Versioned::new(variant("v-1", 1), 1), 2),
            (Versioned::new(variant("v-2", 10), 1), 3),
            (Versioned::new(variant("v-3", 0), 1), 1),
        ];

        let shortfalls = plan_decrements(&cart).unwrap_err();
        assert_eq!(shortfalls.len(), 2);
        assert_eq!(
            shortfalls.first().unwrap(),
            &StockShortfall {
                variant_id: VariantId::new("v-1"),
                requested: 2,
                available: 1,
            }
        );
        assert_eq!(shortfalls.get(1).unwrap().variant_id, VariantId::new("v-3"));
    }

    #[test]
    fn exact_stock_is_not_a_shortfall() {
        let cart = vec![(Versioned::new(variant("v-1", 2), 1), 2)];
        let writes = plan_decrements(&cart).unwrap();
        assert_eq!(writes.first().unwrap().stock, 0);
    }

    #[tokio::test]
    async fn cache_serves_the_stored_snapshot() {
        let store = Arc::new(MemoryStore::new());
        store.insert_variant(variant("v-1", 4)).await.unwrap();
        let cache = AvailabilityCache::new(store);

        let availability = cache.check(&VariantId::new("v-1")).await.unwrap();
        assert_eq!(availability.stock, 4);
        assert!(availability.in_stock());
    }

    #[tokio::test]
    async fn cache_returns_stale_reads_until_invalidated() {
        use chrono::Utc;
        use limoda_core::{
            CustomerId, DeliveryMethod, Email, OrderId, OrderStatus, PaymentMethod,
        };

        use crate::model::{CustomerAggregate, Order};
        use crate::store::{CommitBatch, CustomerWrite};

        let store = Arc::new(MemoryStore::new());
        store.insert_variant(variant("v-1", 4)).await.unwrap();
        let customer = CustomerAggregate::new(
            CustomerId::new("c-1"),
            "Teste",
            Email::parse("teste@example.com").unwrap(),
        );
        store.insert_customer(customer).await.unwrap();
        let cache = AvailabilityCache::new(store.clone());

        // Prime the cache, then commit a sale behind its back.
        cache.check(&VariantId::new("v-1")).await.unwrap();
        let variant_read = store.variant(&VariantId::new("v-1")).await.unwrap().unwrap();
        let customer_read = store
            .customer(&CustomerId::new("c-1"))
            .await
            .unwrap()
            .unwrap();
        let order = Order {
            id: OrderId::new("ORDER-1"),
            customer_id: CustomerId::new("c-1"),
            customer_name: "Teste".to_owned(),
            customer_phone: None,
            lines: Vec::new(),
            subtotal: Money::ZERO,
            discount: Money::ZERO,
            coupon_used: None,
            shipping_fee: Money::ZERO,
            total: Money::ZERO,
            payment_method: PaymentMethod::Pix,
            delivery_method: DeliveryMethod::Pickup,
            delivery_address: None,
            gateway_reference: "LIMODA-1".to_owned(),
            gateway_order_id: "PAG-1".to_owned(),
            pix_qr: None,
            status: OrderStatus::Pending,
            terms_accepted_at: Utc::now(),
            placed_at: Utc::now(),
        };
        store
            .apply(CommitBatch {
                order,
                variants: vec![VariantWrite {
                    id: VariantId::new("v-1"),
                    expected_version: variant_read.version,
                    stock: 0,
                    sales_count: variant_read.doc.sales_count + 4,
                }],
                customer: CustomerWrite {
                    expected_version: customer_read.version,
                    customer: customer_read.doc,
                },
            })
            .await
            .unwrap();

        let stale = cache.check(&VariantId::new("v-1")).await.unwrap();
        assert_eq!(stale.stock, 4);

        cache.invalidate(&VariantId::new("v-1")).await;
        let fresh = cache.check(&VariantId::new("v-1")).await.unwrap();
        assert_eq!(fresh.stock, 0);
    }

    #[tokio::test]
    async fn unknown_variant_is_not_found() {
        let cache = AvailabilityCache::new(Arc::new(MemoryStore::new()));
        let err = cache.check(&VariantId::new("missing")).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }
}

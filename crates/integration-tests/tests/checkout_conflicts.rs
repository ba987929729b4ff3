//! Stock races and failed payments: the paths where nothing, or exactly
//! one thing, may be written.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal_macros::dec;

use limoda_checkout::coupon::{CouponLedger, IssuePolicy};
use limoda_checkout::model::{CustomerAggregate, Order, ProductVariant};
use limoda_checkout::store::{
    CommerceStore, CommitBatch, CustomerWrite, MemoryStore, StoreError, Versioned,
};
use limoda_checkout::{CheckoutError, CheckoutService};
use limoda_core::{CustomerId, DiscountSpec, Money, OrderId, VariantId};
use limoda_integration_tests::{
    CountingGateway, DecliningGateway, StaticPostal, cart, customer, pickup_pix_request, variant,
};

/// Delegates every read to the real store but loses every commit, as if
/// another writer always got there first.
struct ContestedStore {
    inner: Arc<MemoryStore>,
}

#[async_trait]
impl CommerceStore for ContestedStore {
    async fn insert_variant(&self, variant: ProductVariant) -> Result<(), StoreError> {
        self.inner.insert_variant(variant).await
    }

    async fn insert_customer(&self, customer: CustomerAggregate) -> Result<(), StoreError> {
        self.inner.insert_customer(customer).await
    }

    async fn variant(
        &self,
        id: &VariantId,
    ) -> Result<Option<Versioned<ProductVariant>>, StoreError> {
        self.inner.variant(id).await
    }

    async fn list_variants(&self) -> Result<Vec<Versioned<ProductVariant>>, StoreError> {
        self.inner.list_variants().await
    }

    async fn customer(
        &self,
        id: &CustomerId,
    ) -> Result<Option<Versioned<CustomerAggregate>>, StoreError> {
        self.inner.customer(id).await
    }

    async fn update_customer(&self, write: CustomerWrite) -> Result<u64, StoreError> {
        self.inner.update_customer(write).await
    }

    async fn order(&self, id: &OrderId) -> Result<Option<Order>, StoreError> {
        self.inner.order(id).await
    }

    async fn apply(&self, batch: CommitBatch) -> Result<(), StoreError> {
        Err(StoreError::VersionConflict {
            collection: "variants",
            key: batch
                .variants
                .first()
                .map_or_else(String::new, |write| write.id.as_str().to_owned()),
        })
    }
}

// ============================================================================
// Oversell protection
// ============================================================================

#[tokio::test]
async fn concurrent_checkouts_never_oversell() {
    let store = Arc::new(MemoryStore::new());
    store
        .insert_variant(variant("v-last-one", "Top Energia", dec!(120), 1))
        .await
        .unwrap();
    store
        .insert_customer(customer("cust-a", "Ana Paula Sousa", "ana@example.com"))
        .await
        .unwrap();
    store
        .insert_customer(customer("cust-b", "Bruna Lima", "bruna@example.com"))
        .await
        .unwrap();

    let gateway = Arc::new(CountingGateway::new());
    let service = CheckoutService::new(
        store.clone(),
        Arc::new(StaticPostal::teresina()),
        gateway.clone(),
    );

    let mut request_b = pickup_pix_request("cust-b", cart("v-last-one", 1));
    request_b.contact.name = "Bruna Lima".to_string();
    request_b.contact.email = "bruna@example.com".to_string();
    request_b.contact.cpf = "111.444.777-35".to_string();

    let first = service.submit(pickup_pix_request("cust-a", cart("v-last-one", 1)));
    let second = service.submit(request_b);
    let (first, second) = tokio::join!(first, second);

    let results = [first, second];
    assert_eq!(
        results.iter().filter(|result| result.is_ok()).count(),
        1,
        "exactly one checkout may win the last unit"
    );
    let loser = results.iter().find(|result| result.is_err()).unwrap();
    assert!(matches!(
        loser.as_ref().unwrap_err(),
        CheckoutError::InsufficientStock { .. }
    ));

    let stocked = store
        .variant(&VariantId::new("v-last-one"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stocked.doc.stock, 0);
    assert_eq!(stocked.doc.sales_count, 1);

    // Exactly one aggregate moved
    let ana = store
        .customer(&CustomerId::new("cust-a"))
        .await
        .unwrap()
        .unwrap();
    let bruna = store
        .customer(&CustomerId::new("cust-b"))
        .await
        .unwrap()
        .unwrap();
    let spends = [ana.doc.total_spent, bruna.doc.total_spent];
    assert!(spends.contains(&Money::new(dec!(120))));
    assert!(spends.contains(&Money::ZERO));
    assert_eq!(ana.doc.order_count + bruna.doc.order_count, 1);
}

#[tokio::test]
async fn oversized_cart_is_rejected_before_charging() {
    let store = Arc::new(MemoryStore::new());
    store
        .insert_variant(variant("v-scarce", "Legging Limitada", dec!(90), 1))
        .await
        .unwrap();
    store
        .insert_customer(customer("cust-e", "Elisa Prado", "elisa@example.com"))
        .await
        .unwrap();

    let gateway = Arc::new(CountingGateway::new());
    let service = CheckoutService::new(
        store.clone(),
        Arc::new(StaticPostal::teresina()),
        gateway.clone(),
    );

    let err = service
        .submit(pickup_pix_request("cust-e", cart("v-scarce", 3)))
        .await
        .unwrap_err();

    match err {
        CheckoutError::InsufficientStock { shortfalls } => {
            let shortfall = shortfalls.first().unwrap();
            assert_eq!(shortfall.requested, 3);
            assert_eq!(shortfall.available, 1);
        }
        other => panic!("expected InsufficientStock, got {other}"),
    }
    assert_eq!(gateway.charge_count(), 0, "rejected before money moved");

    let stocked = store
        .variant(&VariantId::new("v-scarce"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stocked.doc.stock, 1);
}

// ============================================================================
// Failed payments
// ============================================================================

#[tokio::test]
async fn declined_payment_leaves_no_trace() {
    let store = Arc::new(MemoryStore::new());
    store
        .insert_variant(variant("v-calca", "Calça Jogger", dec!(140), 5))
        .await
        .unwrap();
    store
        .insert_customer(customer("cust-f", "Fernanda Dias", "fernanda@example.com"))
        .await
        .unwrap();

    // An unredeemed coupon must survive the failed attempt
    let ledger = CouponLedger::new(store.clone());
    let coupon = ledger
        .issue(
            &CustomerId::new("cust-f"),
            DiscountSpec::percent(dec!(15)),
            "Cupom de boas-vindas".to_string(),
            IssuePolicy::Reject,
        )
        .await
        .unwrap();
    let before = store
        .customer(&CustomerId::new("cust-f"))
        .await
        .unwrap()
        .unwrap();

    let service = CheckoutService::new(
        store.clone(),
        Arc::new(StaticPostal::teresina()),
        Arc::new(DecliningGateway),
    );

    let mut request = pickup_pix_request("cust-f", cart("v-calca", 2));
    request.coupon_code = Some(coupon.code.as_str().to_string());

    let err = service.submit(request).await.unwrap_err();
    assert!(matches!(err, CheckoutError::Payment(_)));

    // Nothing moved: not stock, not the aggregate, not the coupon slot
    let stocked = store
        .variant(&VariantId::new("v-calca"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stocked.doc.stock, 5);
    assert_eq!(stocked.doc.sales_count, 0);
    assert_eq!(stocked.version, 0);

    let after = store
        .customer(&CustomerId::new("cust-f"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after.version, before.version);
    assert_eq!(after.doc.total_spent, Money::ZERO);
    assert_eq!(after.doc.order_count, 0);
    assert_eq!(
        after.doc.active_coupon.as_ref().map(|c| c.code.clone()),
        Some(coupon.code)
    );
}

// ============================================================================
// Contested commits
// ============================================================================

#[tokio::test]
async fn exhausted_retries_surface_a_commit_conflict() {
    let inner = Arc::new(MemoryStore::new());
    inner
        .insert_variant(variant("v-body", "Body Fit", dec!(110), 4))
        .await
        .unwrap();
    inner
        .insert_customer(customer("cust-g", "Gabriela Nunes", "gabi@example.com"))
        .await
        .unwrap();

    let gateway = Arc::new(CountingGateway::new());
    let service = CheckoutService::new(
        Arc::new(ContestedStore {
            inner: inner.clone(),
        }),
        Arc::new(StaticPostal::teresina()),
        gateway.clone(),
    );

    let err = service
        .submit(pickup_pix_request("cust-g", cart("v-body", 1)))
        .await
        .unwrap_err();
    match err {
        CheckoutError::CommitConflict { attempts } => assert_eq!(attempts, 3),
        other => panic!("expected CommitConflict, got {other}"),
    }

    // Charged once up front, then every commit attempt lost the race
    assert_eq!(gateway.charge_count(), 1);

    // The store underneath saw no writes at all
    let stocked = inner
        .variant(&VariantId::new("v-body"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stocked.doc.stock, 4);
    assert_eq!(stocked.doc.sales_count, 0);
}

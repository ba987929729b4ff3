//! Integration test fixtures for the Li Moda checkout pipeline.
//!
//! The document store is in-memory, so these tests run the real
//! pipeline in-process: real store, real pricing, real commit path.
//! Only the two outbound HTTP clients (ViaCEP, PagBank) are stubbed.
//!
//! # Test Categories
//!
//! - `checkout_pipeline` - Full checkout runs and their totals
//! - `checkout_conflicts` - Stock races and failed payments
//! - `coupon_lifecycle` - The single-slot ledger end to end
//! - `api_surface` - The HTTP layer driven through the router

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use secrecy::SecretString;
use tower::ServiceExt;

use limoda_checkout::clients::{
    ChargeOutcome, ChargeRequest, LookupError, PaymentError, PaymentGateway, PostalLookup,
    ResolvedAddress,
};
use limoda_checkout::model::{CartLine, CustomerAggregate, PixQr, ProductVariant};
use limoda_checkout::store::MemoryStore;
use limoda_checkout::{CheckoutRequest, ContactForm, DeliveryRequest, PaymentRequest};
use limoda_core::{
    Category, CepCode, CustomerId, DeliveryMethod, Email, Money, PaymentMethod, ProductId,
    SizeSpec, VariantId,
};
use limoda_server::config::{PagBankConfig, ServerConfig};
use limoda_server::state::AppState;

// ============================================================================
// Outbound client stubs
// ============================================================================

/// Postal lookup stub resolving from a fixed table.
#[derive(Debug, Clone, Default)]
pub struct StaticPostal {
    addresses: HashMap<String, ResolvedAddress>,
}

impl StaticPostal {
    /// A table with one Teresina address per zone kind: `64049-000`
    /// lands in a free-delivery neighborhood, `64000-100` outside one.
    #[must_use]
    pub fn teresina() -> Self {
        Self::default()
            .with(
                "64049000",
                ResolvedAddress {
                    street: "Rua das Acácias".to_string(),
                    neighborhood: "Parque Ideal".to_string(),
                    city: "Teresina".to_string(),
                    state: "PI".to_string(),
                },
            )
            .with(
                "64000100",
                ResolvedAddress {
                    street: "Avenida Frei Serafim".to_string(),
                    neighborhood: "Centro".to_string(),
                    city: "Teresina".to_string(),
                    state: "PI".to_string(),
                },
            )
    }

    /// Register an address under its bare-digit CEP.
    #[must_use]
    pub fn with(mut self, digits: &str, address: ResolvedAddress) -> Self {
        self.addresses.insert(digits.to_string(), address);
        self
    }
}

#[async_trait]
impl PostalLookup for StaticPostal {
    async fn resolve(&self, cep: &CepCode) -> Result<ResolvedAddress, LookupError> {
        self.addresses
            .get(cep.as_str())
            .cloned()
            .ok_or_else(|| LookupError::NotFound(cep.clone()))
    }
}

/// Gateway stub that approves every charge and counts the calls.
#[derive(Debug, Default)]
pub struct CountingGateway {
    charges: AtomicU32,
}

impl CountingGateway {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times `charge` was called.
    #[must_use]
    pub fn charge_count(&self) -> u32 {
        self.charges.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentGateway for CountingGateway {
    async fn charge(&self, request: &ChargeRequest) -> Result<ChargeOutcome, PaymentError> {
        let serial = self.charges.fetch_add(1, Ordering::SeqCst) + 1;
        let pix_qr = match request.method {
            PaymentMethod::Pix => Some(PixQr {
                text: format!("pix-payload-{serial}"),
                png_url: None,
                expires_at: Utc::now() + Duration::hours(1),
            }),
            PaymentMethod::Card => None,
        };
        Ok(ChargeOutcome {
            gateway_order_id: format!("GATE-{serial}"),
            pix_qr,
        })
    }
}

/// Gateway stub that declines every charge.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecliningGateway;

#[async_trait]
impl PaymentGateway for DecliningGateway {
    async fn charge(&self, _request: &ChargeRequest) -> Result<ChargeOutcome, PaymentError> {
        Err(PaymentError::Declined {
            reason: "insufficient funds".to_string(),
        })
    }
}

// ============================================================================
// Document fixtures
// ============================================================================

/// An active, unpromoted catalog variant.
#[must_use]
pub fn variant(id: &str, name: &str, price: Decimal, stock: u32) -> ProductVariant {
    ProductVariant {
        id: VariantId::new(id),
        product_id: ProductId::new(format!("prod-{id}")),
        name: name.to_string(),
        category: Category::Leggings,
        color: None,
        size: SizeSpec::Sized("M".to_string()),
        price: Money::new(price),
        promo: None,
        stock,
        sales_count: 0,
        active: true,
    }
}

/// A fresh customer aggregate with no history.
///
/// # Panics
///
/// Panics if `email` is not a valid address.
#[must_use]
pub fn customer(id: &str, name: &str, email: &str) -> CustomerAggregate {
    CustomerAggregate::new(
        CustomerId::new(id),
        name,
        Email::parse(email).expect("fixture email"),
    )
}

/// A one-line cart.
#[must_use]
pub fn cart(variant_id: &str, quantity: u32) -> Vec<CartLine> {
    vec![CartLine {
        variant_id: VariantId::new(variant_id),
        quantity,
    }]
}

/// A complete pickup + PIX submission for the given cart.
#[must_use]
pub fn pickup_pix_request(customer_id: &str, lines: Vec<CartLine>) -> CheckoutRequest {
    CheckoutRequest {
        customer_id: CustomerId::new(customer_id),
        contact: ContactForm {
            name: "Ana Paula Sousa".to_string(),
            email: "ana.sousa@example.com".to_string(),
            cpf: "529.982.247-25".to_string(),
            phone: Some("(86) 99999-1234".to_string()),
        },
        lines,
        delivery: DeliveryRequest {
            method: DeliveryMethod::Pickup,
            cep: None,
            number: None,
            complement: None,
        },
        payment: PaymentRequest {
            method: PaymentMethod::Pix,
            card_token: None,
        },
        coupon_code: None,
        accept_terms: true,
    }
}

/// Switch a request to courier delivery at the given CEP.
#[must_use]
pub fn with_delivery(mut request: CheckoutRequest, cep: &str, number: &str) -> CheckoutRequest {
    request.delivery = DeliveryRequest {
        method: DeliveryMethod::Delivery,
        cep: Some(cep.to_string()),
        number: Some(number.to_string()),
        complement: None,
    };
    request
}

// ============================================================================
// Application assembly
// ============================================================================

/// Server config for in-process tests; nothing real is ever dialed.
#[must_use]
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: IpAddr::from([127, 0, 0, 1]),
        port: 0,
        pagbank: PagBankConfig {
            token: SecretString::from("kX9mQ2vR7pL4wN8jT3bY6hF1dZ5gW0aC"),
            base_url: None,
            notification_url: None,
        },
        viacep_base_url: None,
        seed_file: None,
    }
}

/// Assemble application state around stubbed outbound clients.
#[must_use]
pub fn app_state(
    store: Arc<MemoryStore>,
    postal: Arc<dyn PostalLookup>,
    gateway: Arc<dyn PaymentGateway>,
) -> AppState {
    AppState::with_components(test_config(), store, postal, gateway)
}

// ============================================================================
// Router driving
// ============================================================================

/// Drive one request through the router and decode the JSON body.
/// Empty bodies decode as `Null`.
///
/// # Panics
///
/// Panics if the call fails or a non-empty body is not JSON.
pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.oneshot(request).await.expect("router call failed");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    let value = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("response body was not JSON")
    };
    (status, value)
}

/// A POST request carrying a JSON body.
///
/// # Panics
///
/// Panics if the request fails to build.
#[must_use]
pub fn post_json(uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request build failed")
}

/// A bare GET request.
///
/// # Panics
///
/// Panics if the request fails to build.
#[must_use]
pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request build failed")
}

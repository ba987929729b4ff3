//! The checkout flow: validate, resolve, price, charge, commit.
//!
//! `submit` runs the whole pipeline for one cart. The gateway is charged
//! exactly once, before any write; the commit then retries version races
//! a bounded number of times, re-validating stock and the coupon slot
//! against fresh reads on every attempt. Prices are frozen at charge
//! time and never recomputed during retries.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use limoda_core::{
    CepCode, CouponCode, Cpf, CustomerId, DeliveryMethod, Email, OrderId, OrderStatus,
    PaymentMethod,
};
use rand::Rng;
use rand::distr::Alphanumeric;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::clients::{CardDetails, ChargeItem, ChargeRequest, PaymentGateway, PostalLookup};
use crate::coupon;
use crate::error::{CheckoutError, ValidationError};
use crate::inventory::plan_decrements;
use crate::model::{Address, CartLine, CustomerAggregate, Order, ProductVariant};
use crate::pricing::{self, PriceBreakdown};
use crate::shipping::ShippingPolicy;
use crate::store::{CommerceStore, CommitBatch, CustomerWrite, MAX_CAS_ATTEMPTS, StoreError, Versioned};

// =============================================================================
// Stage machine
// =============================================================================

/// Stages a checkout moves through, strictly forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutStage {
    /// Cart and contact data are being assembled.
    Building,
    /// Delivery is resolved: an address, or pickup.
    AddressCollected,
    /// Payment method chosen and the cart priced.
    PaymentSelected,
    /// The gateway has been (or is being) charged and the commit loop
    /// is running. No turning back from here.
    Committing,
    /// The order is durable.
    Committed,
    /// Terminal failure.
    Failed,
}

/// A stage transition was attempted out of order.
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("cannot {action} while checkout is {stage:?}")]
    InvalidStage {
        stage: CheckoutStage,
        action: &'static str,
    },
}

/// Tracks one checkout's progress through the stages.
#[derive(Debug)]
pub struct CheckoutFlow {
    stage: CheckoutStage,
}

impl CheckoutFlow {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            stage: CheckoutStage::Building,
        }
    }

    #[must_use]
    pub const fn stage(&self) -> CheckoutStage {
        self.stage
    }

    /// Record that delivery is resolved.
    ///
    /// # Errors
    ///
    /// Fails unless the flow is still [`CheckoutStage::Building`].
    pub fn collect_address(&mut self) -> Result<(), FlowError> {
        self.advance(
            CheckoutStage::Building,
            CheckoutStage::AddressCollected,
            "collect an address",
        )
    }

    /// Record that payment is chosen and the cart priced.
    ///
    /// # Errors
    ///
    /// Fails unless delivery was resolved first.
    pub fn select_payment(&mut self) -> Result<(), FlowError> {
        self.advance(
            CheckoutStage::AddressCollected,
            CheckoutStage::PaymentSelected,
            "select payment",
        )
    }

    /// Enter the irreversible charge-and-commit phase.
    ///
    /// # Errors
    ///
    /// Fails unless payment was selected first.
    pub fn begin_commit(&mut self) -> Result<(), FlowError> {
        self.advance(
            CheckoutStage::PaymentSelected,
            CheckoutStage::Committing,
            "begin the commit",
        )
    }

    /// Record the durable order.
    ///
    /// # Errors
    ///
    /// Fails unless the flow was committing.
    pub fn complete(&mut self) -> Result<(), FlowError> {
        self.advance(
            CheckoutStage::Committing,
            CheckoutStage::Committed,
            "complete",
        )
    }

    /// Mark the checkout failed.
    ///
    /// # Errors
    ///
    /// Fails only on an already committed flow.
    pub fn fail(&mut self) -> Result<(), FlowError> {
        if self.stage == CheckoutStage::Committed {
            return Err(FlowError::InvalidStage {
                stage: self.stage,
                action: "fail",
            });
        }
        self.stage = CheckoutStage::Failed;
        Ok(())
    }

    /// Walk away from an unpaid checkout, returning to
    /// [`CheckoutStage::Building`].
    ///
    /// # Errors
    ///
    /// Fails once the commit phase has begun: by then the customer may
    /// already be charged.
    pub fn abort(&mut self) -> Result<(), FlowError> {
        match self.stage {
            CheckoutStage::Building
            | CheckoutStage::AddressCollected
            | CheckoutStage::PaymentSelected => {
                self.stage = CheckoutStage::Building;
                Ok(())
            }
            stage => Err(FlowError::InvalidStage {
                stage,
                action: "abort",
            }),
        }
    }

    fn advance(
        &mut self,
        from: CheckoutStage,
        to: CheckoutStage,
        action: &'static str,
    ) -> Result<(), FlowError> {
        if self.stage == from {
            self.stage = to;
            Ok(())
        } else {
            Err(FlowError::InvalidStage {
                stage: self.stage,
                action,
            })
        }
    }
}

impl Default for CheckoutFlow {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Request types
// =============================================================================

/// Contact fields confirmed at checkout. They also update the customer
/// profile when the order commits.
#[derive(Debug, Clone, Deserialize)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    pub cpf: String,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Where the order goes.
#[derive(Debug, Clone, Deserialize)]
pub struct DeliveryRequest {
    pub method: DeliveryMethod,
    /// CEP to resolve. When absent, courier delivery falls back to the
    /// customer's saved address.
    #[serde(default)]
    pub cep: Option<String>,
    /// House number, required when a CEP is given.
    #[serde(default)]
    pub number: Option<String>,
    #[serde(default)]
    pub complement: Option<String>,
}

/// How the order is paid.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentRequest {
    pub method: PaymentMethod,
    /// Browser-encrypted card blob, required for card payments.
    #[serde(default)]
    pub card_token: Option<String>,
}

/// A complete checkout submission.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutRequest {
    pub customer_id: CustomerId,
    pub contact: ContactForm,
    pub lines: Vec<CartLine>,
    pub delivery: DeliveryRequest,
    pub payment: PaymentRequest,
    #[serde(default)]
    pub coupon_code: Option<String>,
    pub accept_terms: bool,
}

/// Contact form after parsing.
struct ValidContact {
    name: String,
    email: Email,
    cpf: Cpf,
    phone: Option<String>,
}

// =============================================================================
// CheckoutService
// =============================================================================

/// The checkout pipeline service.
#[derive(Clone)]
pub struct CheckoutService {
    store: Arc<dyn CommerceStore>,
    postal: Arc<dyn PostalLookup>,
    gateway: Arc<dyn PaymentGateway>,
    shipping: ShippingPolicy,
}

impl CheckoutService {
    #[must_use]
    pub fn new(
        store: Arc<dyn CommerceStore>,
        postal: Arc<dyn PostalLookup>,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self {
            store,
            postal,
            gateway,
            shipping: ShippingPolicy::default(),
        }
    }

    /// Replace the default shipping policy.
    #[must_use]
    pub fn with_shipping_policy(mut self, shipping: ShippingPolicy) -> Self {
        self.shipping = shipping;
        self
    }

    /// Run one cart through the whole pipeline and return the committed
    /// order.
    ///
    /// # Errors
    ///
    /// Validation, lookup, and stock errors return before the gateway is
    /// charged. After the charge, only commit errors remain: losing a
    /// re-validated stock race, a consumed coupon slot, or exhausting
    /// the retry budget.
    #[instrument(skip(self, request), fields(customer_id = %request.customer_id))]
    pub async fn submit(&self, request: CheckoutRequest) -> Result<Order, CheckoutError> {
        let mut flow = CheckoutFlow::new();

        let contact = validate_contact(&request.contact)?;
        let lines = normalize_lines(&request.lines)?;
        if !request.accept_terms {
            return Err(ValidationError::TermsNotAccepted.into());
        }
        let terms_accepted_at = Utc::now();

        let card = match request.payment.method {
            PaymentMethod::Card => Some(CardDetails {
                encrypted_token: request
                    .payment
                    .card_token
                    .clone()
                    .ok_or(ValidationError::MissingCardToken)?,
            }),
            PaymentMethod::Pix => None,
        };

        let customer_read = self
            .store
            .customer(&request.customer_id)
            .await?
            .ok_or_else(|| CheckoutError::CustomerNotFound(request.customer_id.clone()))?;

        let delivery_address = self
            .resolve_delivery(&request.delivery, &customer_read.doc)
            .await?;
        flow.collect_address()?;

        let matched_coupon = match request.coupon_code.as_deref() {
            Some(entered) => Some(coupon::match_active(&customer_read.doc, entered)?),
            None => None,
        };

        let cart = self.load_cart(&lines).await?;
        let quote = self.shipping.quote(
            request.delivery.method,
            delivery_address
                .as_ref()
                .map(|address| address.neighborhood.as_str()),
        );

        let priced_at = Utc::now();
        let docs: Vec<(ProductVariant, u32)> = cart
            .iter()
            .map(|(variant, quantity)| (variant.doc.clone(), *quantity))
            .collect();
        let breakdown = pricing::price_cart(
            &docs,
            matched_coupon.as_ref().map(|coupon| &coupon.discount),
            quote.fee,
            priced_at,
        );
        flow.select_payment()?;

        // Last stock look before money moves. The commit re-validates,
        // but failing here spares the customer a charge.
        if let Err(shortfalls) = plan_decrements(&cart) {
            return Err(CheckoutError::InsufficientStock { shortfalls });
        }

        flow.begin_commit()?;
        let reference = format!("LIMODA-{}", priced_at.timestamp_millis());
        let charge_request = build_charge_request(
            reference.clone(),
            &contact,
            request.payment.method,
            &breakdown,
            delivery_address.as_ref(),
            card,
        );
        let outcome = match self.gateway.charge(&charge_request).await {
            Ok(outcome) => outcome,
            Err(err) => {
                flow.fail()?;
                return Err(err.into());
            }
        };

        let mut attempts = 0;
        loop {
            attempts += 1;

            let cart = self.load_cart(&lines).await?;
            let variant_writes = match plan_decrements(&cart) {
                Ok(writes) => writes,
                Err(shortfalls) => {
                    flow.fail()?;
                    return Err(CheckoutError::InsufficientStock { shortfalls });
                }
            };

            let customer_read = self
                .store
                .customer(&request.customer_id)
                .await?
                .ok_or_else(|| CheckoutError::CustomerNotFound(request.customer_id.clone()))?;
            let mut customer = customer_read.doc;

            // The coupon priced into this charge must still be in the
            // slot. If another device spent it since, stop rather than
            // honor a discount that no longer exists.
            let coupon_used: Option<CouponCode> = match &matched_coupon {
                Some(matched) => {
                    coupon::match_active(&customer, matched.code.as_str())?;
                    coupon::redeem(&mut customer);
                    Some(matched.code.clone())
                }
                None => None,
            };

            let placed_at = Utc::now();
            let order = Order {
                id: new_order_id(placed_at),
                customer_id: request.customer_id.clone(),
                customer_name: contact.name.clone(),
                customer_phone: contact.phone.clone(),
                lines: breakdown.lines.clone(),
                subtotal: breakdown.subtotal,
                discount: breakdown.discount,
                coupon_used,
                shipping_fee: breakdown.shipping,
                total: breakdown.total,
                payment_method: request.payment.method,
                delivery_method: request.delivery.method,
                delivery_address: delivery_address.as_ref().map(Address::formatted_with_number),
                gateway_reference: reference.clone(),
                gateway_order_id: outcome.gateway_order_id.clone(),
                pix_qr: outcome.pix_qr.clone(),
                status: OrderStatus::Pending,
                terms_accepted_at,
                placed_at,
            };

            customer.name = contact.name.clone();
            customer.email = contact.email.clone();
            customer.cpf = Some(contact.cpf.clone());
            if contact.phone.is_some() {
                customer.phone = contact.phone.clone();
            }
            if let Some(address) = &delivery_address {
                customer.address = Some(address.clone());
            }
            customer.total_spent += breakdown.total;
            customer.order_count += 1;
            customer.order_ids.push(order.id.clone());
            customer.last_activity = Some(placed_at);

            let batch = CommitBatch {
                order: order.clone(),
                variants: variant_writes,
                customer: CustomerWrite {
                    expected_version: customer_read.version,
                    customer,
                },
            };

            match self.store.apply(batch).await {
                Ok(()) => {
                    flow.complete()?;
                    info!(
                        order_id = %order.id,
                        total = %order.total,
                        attempts,
                        "order committed"
                    );
                    return Ok(order);
                }
                Err(StoreError::VersionConflict { .. } | StoreError::AlreadyExists { .. })
                    if attempts < MAX_CAS_ATTEMPTS =>
                {
                    warn!(attempts, "commit lost a version race, retrying");
                }
                Err(StoreError::VersionConflict { .. } | StoreError::AlreadyExists { .. }) => {
                    flow.fail()?;
                    return Err(CheckoutError::CommitConflict { attempts });
                }
                Err(err) => {
                    flow.fail()?;
                    return Err(err.into());
                }
            }
        }
    }

    /// Resolve where the order goes. Courier delivery takes a fresh CEP
    /// lookup when one was entered, otherwise the saved address.
    async fn resolve_delivery(
        &self,
        delivery: &DeliveryRequest,
        customer: &CustomerAggregate,
    ) -> Result<Option<Address>, CheckoutError> {
        match delivery.method {
            DeliveryMethod::Pickup => Ok(None),
            DeliveryMethod::Delivery => {
                if let Some(raw) = trimmed(delivery.cep.as_deref()) {
                    let cep = CepCode::parse(raw).map_err(ValidationError::from)?;
                    let number = trimmed(delivery.number.as_deref())
                        .ok_or(ValidationError::MissingAddressNumber)?
                        .to_owned();
                    let resolved = self.postal.resolve(&cep).await?;
                    Ok(Some(Address {
                        cep,
                        street: resolved.street,
                        neighborhood: resolved.neighborhood,
                        city: resolved.city,
                        state: resolved.state,
                        number,
                        complement: trimmed(delivery.complement.as_deref()).map(ToOwned::to_owned),
                    }))
                } else if let Some(saved) = &customer.address {
                    Ok(Some(saved.clone()))
                } else {
                    Err(ValidationError::MissingAddress.into())
                }
            }
        }
    }

    /// Read every cart variant with its version, rejecting unknown and
    /// unlisted ones.
    async fn load_cart(
        &self,
        lines: &[CartLine],
    ) -> Result<Vec<(Versioned<ProductVariant>, u32)>, CheckoutError> {
        let mut cart = Vec::with_capacity(lines.len());
        for line in lines {
            let variant = self.store.variant(&line.variant_id).await?.ok_or_else(|| {
                ValidationError::UnknownVariant {
                    variant_id: line.variant_id.clone(),
                }
            })?;
            if !variant.doc.active {
                return Err(ValidationError::InactiveVariant {
                    variant_id: line.variant_id.clone(),
                }
                .into());
            }
            cart.push((variant, line.quantity));
        }
        Ok(cart)
    }
}

fn validate_contact(form: &ContactForm) -> Result<ValidContact, ValidationError> {
    let name = form.name.trim();
    if name.is_empty() {
        return Err(ValidationError::MissingName);
    }
    let email = Email::parse(&form.email)?;
    let cpf = Cpf::parse(&form.cpf)?;
    let phone = trimmed(form.phone.as_deref()).map(ToOwned::to_owned);
    Ok(ValidContact {
        name: name.to_owned(),
        email,
        cpf,
        phone,
    })
}

/// Merge duplicate variant lines, keeping first-seen order.
fn normalize_lines(lines: &[CartLine]) -> Result<Vec<CartLine>, ValidationError> {
    if lines.is_empty() {
        return Err(ValidationError::EmptyCart);
    }
    let mut merged: Vec<CartLine> = Vec::with_capacity(lines.len());
    for line in lines {
        if line.quantity == 0 {
            return Err(ValidationError::ZeroQuantity {
                variant_id: line.variant_id.clone(),
            });
        }
        match merged
            .iter_mut()
            .find(|candidate| candidate.variant_id == line.variant_id)
        {
            Some(existing) => existing.quantity += line.quantity,
            None => merged.push(line.clone()),
        }
    }
    Ok(merged)
}

fn build_charge_request(
    reference: String,
    contact: &ValidContact,
    method: PaymentMethod,
    breakdown: &PriceBreakdown,
    delivery_address: Option<&Address>,
    card: Option<CardDetails>,
) -> ChargeRequest {
    let items = breakdown
        .lines
        .iter()
        .map(|line| ChargeItem {
            name: format!("{} ({})", line.name, line.size.label()),
            quantity: line.quantity,
            unit_amount: line.unit_price.to_centavos(),
        })
        .collect();

    ChargeRequest {
        reference,
        customer_name: contact.name.clone(),
        customer_email: contact.email.clone(),
        customer_tax_id: contact.cpf.clone(),
        method,
        amount: breakdown.total,
        items,
        shipping_address: delivery_address.cloned(),
        card,
    }
}

/// `ORDER-<unix-millis>-<4 random alphanumerics>`. The random suffix
/// keeps two orders placed in the same millisecond from colliding.
fn new_order_id(now: DateTime<Utc>) -> OrderId {
    let suffix: String = rand::rng()
        .sample_iter(Alphanumeric)
        .take(4)
        .map(char::from)
        .collect::<String>()
        .to_uppercase();
    OrderId::new(format!("ORDER-{}-{suffix}", now.timestamp_millis()))
}

fn trimmed(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

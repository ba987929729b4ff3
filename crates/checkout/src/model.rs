//! Domain documents stored and moved by the pipeline.
//!
//! These mirror the shape of the persisted documents: catalog variants,
//! customer aggregates with their single coupon slot, and orders frozen
//! at commit time.

use chrono::{DateTime, Utc};
use limoda_core::{
    Category, CepCode, CouponCode, Cpf, CustomerId, DeliveryMethod, DiscountSpec, Email, Money,
    OrderId, OrderStatus, PaymentMethod, ProductId, SizeSpec, VariantId,
};
use serde::{Deserialize, Serialize};

// =============================================================================
// Catalog
// =============================================================================

/// A time-boxed promotional price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Promotion {
    /// The promotional unit price while active.
    pub price: Money,
    /// Instant the promotion ends. Active strictly before this.
    pub until: DateTime<Utc>,
}

impl Promotion {
    /// Whether the promotion applies at `now`. The boundary instant is
    /// already expired.
    #[must_use]
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        now < self.until
    }
}

/// The sellable unit: one size of one product, with its own stock count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductVariant {
    pub id: VariantId,
    pub product_id: ProductId,
    pub name: String,
    pub category: Category,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub size: SizeSpec,
    /// Base unit price.
    pub price: Money,
    /// Optional promotional price with an expiry.
    pub promo: Option<Promotion>,
    /// Units on hand. Only the commit path may decrement this.
    pub stock: u32,
    /// Lifetime units sold, incremented at commit.
    pub sales_count: u64,
    /// Whether the variant is listed for sale at all.
    pub active: bool,
}

impl ProductVariant {
    /// The unit price in effect at `now`: the promo price while the
    /// promotion is active, the base price otherwise.
    #[must_use]
    pub fn effective_price(&self, now: DateTime<Utc>) -> Money {
        self.promo
            .as_ref()
            .filter(|promo| promo.is_active(now))
            .map_or(self.price, |promo| promo.price)
    }
}

/// One line of a submitted cart: which variant, how many.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub variant_id: VariantId,
    pub quantity: u32,
}

// =============================================================================
// Customers
// =============================================================================

/// A structured delivery address, filled from a ViaCEP lookup plus the
/// customer's house number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub cep: CepCode,
    pub street: String,
    pub neighborhood: String,
    pub city: String,
    pub state: String,
    pub number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complement: Option<String>,
}

impl Address {
    /// The lookup portion, formatted as the address form shows it.
    #[must_use]
    pub fn formatted(&self) -> String {
        format!(
            "{}, {}, {} - {}",
            self.street, self.neighborhood, self.city, self.state
        )
    }

    /// The full line printed on order documents, with the house number.
    #[must_use]
    pub fn formatted_with_number(&self) -> String {
        format!("{}, {}", self.formatted(), self.number)
    }
}

/// An issued coupon occupying the customer's single coupon slot.
///
/// Redemption clears the slot, so a present coupon is by definition
/// still redeemable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coupon {
    pub code: CouponCode,
    /// The message shown when the customer opens the coupon.
    pub message: String,
    pub discount: DiscountSpec,
    /// Whether the customer has opened the coupon notification.
    pub is_read: bool,
    pub assigned_at: DateTime<Utc>,
}

/// The customer aggregate document.
///
/// Spend totals and order history are updated in the same atomic batch
/// as the order insert, so they never drift from the orders collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerAggregate {
    pub id: CustomerId,
    pub name: String,
    pub email: Email,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpf: Option<Cpf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    /// Lifetime sum of order grand totals.
    pub total_spent: Money,
    pub order_count: u32,
    /// Order ids, oldest first.
    pub order_ids: Vec<OrderId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_coupon: Option<Coupon>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_activity: Option<DateTime<Utc>>,
}

impl CustomerAggregate {
    /// A fresh aggregate with no history.
    #[must_use]
    pub fn new(id: CustomerId, name: impl Into<String>, email: Email) -> Self {
        Self {
            id,
            name: name.into(),
            email,
            cpf: None,
            phone: None,
            address: None,
            total_spent: Money::ZERO,
            order_count: 0,
            order_ids: Vec::new(),
            active_coupon: None,
            last_activity: None,
        }
    }

    /// The customer's first name, used as the coupon code prefix.
    #[must_use]
    pub fn first_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or("")
    }
}

// =============================================================================
// Orders
// =============================================================================

/// A PIX QR code returned by the gateway and kept on the order for
/// display until it expires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixQr {
    /// The copy-and-paste payload.
    pub text: String,
    /// Rendered QR image, when the gateway provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub png_url: Option<String>,
    pub expires_at: DateTime<Utc>,
}

/// A priced order line, frozen at commit time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub variant_id: VariantId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub size: SizeSpec,
    /// Unit price actually charged (promo already applied).
    pub unit_price: Money,
    pub quantity: u32,
    pub line_total: Money,
}

/// An order document. Append-only: nothing edits an order after the
/// commit that created it, except the back office advancing `status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub customer_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_phone: Option<String>,
    pub lines: Vec<OrderLine>,
    pub subtotal: Money,
    pub discount: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coupon_used: Option<CouponCode>,
    pub shipping_fee: Money,
    pub total: Money,
    pub payment_method: PaymentMethod,
    pub delivery_method: DeliveryMethod,
    /// Formatted delivery address line; `None` for store pickup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_address: Option<String>,
    /// Our reference sent to the gateway (`LIMODA-<millis>`).
    pub gateway_reference: String,
    /// The gateway's id for the created payment order.
    pub gateway_order_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pix_qr: Option<PixQr>,
    pub status: OrderStatus,
    pub terms_accepted_at: DateTime<Utc>,
    pub placed_at: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn variant_with_promo(until: DateTime<Utc>) -> ProductVariant {
        ProductVariant {
            id: VariantId::new("v-1"),
            product_id: ProductId::new("p-1"),
            name: "Legging Pro".to_owned(),
            category: Category::Leggings,
            color: Some("Preto".to_owned()),
            size: SizeSpec::Sized("M".to_owned()),
            price: Money::new(dec!(100)),
            promo: Some(Promotion {
                price: Money::new(dec!(80)),
                until,
            }),
            stock: 5,
            sales_count: 0,
            active: true,
        }
    }

    #[test]
    fn effective_price_uses_promo_while_active() {
        let now = Utc::now();
        let variant = variant_with_promo(now + Duration::hours(1));
        assert_eq!(variant.effective_price(now), Money::new(dec!(80)));
    }

    #[test]
    fn effective_price_falls_back_after_expiry() {
        let now = Utc::now();
        let variant = variant_with_promo(now - Duration::seconds(1));
        assert_eq!(variant.effective_price(now), Money::new(dec!(100)));
    }

    #[test]
    fn effective_price_at_the_boundary_is_expired() {
        let now = Utc::now();
        let variant = variant_with_promo(now);
        assert_eq!(variant.effective_price(now), Money::new(dec!(100)));
    }

    #[test]
    fn address_formats_like_the_lookup_fill() {
        let address = Address {
            cep: CepCode::parse("64078-213").unwrap(),
            street: "Rua das Acácias".to_owned(),
            neighborhood: "Dirceu Arcoverde".to_owned(),
            city: "Teresina".to_owned(),
            state: "PI".to_owned(),
            number: "142".to_owned(),
            complement: None,
        };
        assert_eq!(
            address.formatted(),
            "Rua das Acácias, Dirceu Arcoverde, Teresina - PI"
        );
        assert_eq!(
            address.formatted_with_number(),
            "Rua das Acácias, Dirceu Arcoverde, Teresina - PI, 142"
        );
    }

    #[test]
    fn first_name_takes_the_leading_word() {
        let customer = CustomerAggregate::new(
            CustomerId::new("c-1"),
            "Ana Paula Souza",
            Email::parse("ana@example.com").unwrap(),
        );
        assert_eq!(customer.first_name(), "Ana");
    }
}

//! Coupon codes and discount specifications.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::money::Money;

/// A coupon code, stored trimmed and uppercased.
///
/// Customers type codes by hand, so matching is insensitive to case and
/// surrounding whitespace. Normalizing at construction keeps every later
/// comparison a plain equality check.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CouponCode(String);

impl CouponCode {
    /// Create a code, normalizing it to the canonical uppercase form.
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into().trim().to_uppercase())
    }

    /// Whether customer input refers to this code.
    #[must_use]
    pub fn matches(&self, input: &str) -> bool {
        self.0 == input.trim().to_uppercase()
    }

    /// Returns the canonical form as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `CouponCode` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for CouponCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CouponCode {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

impl AsRef<str> for CouponCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// How a discount value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountKind {
    /// `value` is a percentage of the merchandise subtotal.
    Percent,
    /// `value` is an amount in reais.
    Fixed,
}

/// A discount: a kind plus its value.
///
/// Percentages apply to the merchandise subtotal only, never to shipping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountSpec {
    pub kind: DiscountKind,
    pub value: Decimal,
}

impl DiscountSpec {
    /// A percentage discount (e.g. `25` for 25% off).
    #[must_use]
    pub const fn percent(value: Decimal) -> Self {
        Self {
            kind: DiscountKind::Percent,
            value,
        }
    }

    /// A fixed discount in reais.
    #[must_use]
    pub const fn fixed(value: Decimal) -> Self {
        Self {
            kind: DiscountKind::Fixed,
            value,
        }
    }

    /// The amount taken off a merchandise subtotal, clamped so the
    /// discount never exceeds the subtotal itself.
    #[must_use]
    pub fn amount_off(&self, subtotal: Money) -> Money {
        let raw = match self.kind {
            DiscountKind::Percent => subtotal.percent(self.value),
            DiscountKind::Fixed => Money::new(self.value),
        };
        if raw > subtotal { subtotal } else { raw }
    }
}

impl fmt::Display for DiscountSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            DiscountKind::Percent => write!(f, "{}% OFF", self.value),
            DiscountKind::Fixed => write!(f, "{} OFF", Money::new(self.value)),
        }
    }
}

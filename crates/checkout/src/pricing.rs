//! Cart pricing: effective unit prices, coupon discount, shipping, total.
//!
//! Pricing is a pure function of the resolved cart. The caller picks one
//! `now` and every promotional price in the cart is judged against that
//! same instant, so a promotion cannot expire halfway through a cart.

use chrono::{DateTime, Utc};
use limoda_core::{DiscountSpec, Money};

use crate::model::{OrderLine, ProductVariant};

/// The complete price breakdown for a cart.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceBreakdown {
    /// Priced lines in cart order.
    pub lines: Vec<OrderLine>,
    /// Sum of line totals before any discount.
    pub subtotal: Money,
    /// Amount taken off the subtotal. Never exceeds the subtotal.
    pub discount: Money,
    /// Shipping fee as quoted. Discounts never touch it.
    pub shipping: Money,
    /// `subtotal - discount + shipping`.
    pub total: Money,
}

/// Price a resolved cart.
///
/// `discount` is the coupon's specification if one was applied. Percent
/// discounts are taken from the merchandise subtotal and rounded to whole
/// centavos; fixed discounts are clamped so the merchandise portion never
/// goes negative. Shipping is added after the discount.
#[must_use]
pub fn price_cart(
    cart: &[(ProductVariant, u32)],
    discount: Option<&DiscountSpec>,
    shipping: Money,
    now: DateTime<Utc>,
) -> PriceBreakdown {
    let lines: Vec<OrderLine> = cart
        .iter()
        .map(|(variant, quantity)| {
            let unit_price = variant.effective_price(now);
            OrderLine {
                variant_id: variant.id.clone(),
                name: variant.name.clone(),
                color: variant.color.clone(),
                size: variant.size.clone(),
                unit_price,
                quantity: *quantity,
                line_total: unit_price.times(*quantity),
            }
        })
        .collect();

    let subtotal: Money = lines.iter().map(|line| line.line_total).sum();
    let discount = discount.map_or(Money::ZERO, |spec| spec.amount_off(subtotal));
    let total = subtotal.saturating_sub(discount) + shipping;

    PriceBreakdown {
        lines,
        subtotal,
        discount,
        shipping,
        total,
    }
}

//! Loyalty tiers derived from lifetime spend.
//!
//! The tier is never stored. Both the storefront header and the back
//! office recompute it from `total_spent` on demand, so there is nothing
//! to keep in sync.

use limoda_core::{LoyaltyTier, Money};
use rust_decimal::Decimal;
use serde::Serialize;

/// Minimum lifetime spend for each paid tier, in centavos.
const BRONZE_MIN_CENTAVOS: i64 = 15_000;
const SILVER_MIN_CENTAVOS: i64 = 25_000;
const DIAMOND_MIN_CENTAVOS: i64 = 50_000;

/// The spend threshold where a tier begins.
#[must_use]
pub fn min_spend(tier: LoyaltyTier) -> Money {
    match tier {
        LoyaltyTier::Starter => Money::ZERO,
        LoyaltyTier::Bronze => Money::from_centavos(BRONZE_MIN_CENTAVOS),
        LoyaltyTier::Silver => Money::from_centavos(SILVER_MIN_CENTAVOS),
        LoyaltyTier::Diamond => Money::from_centavos(DIAMOND_MIN_CENTAVOS),
    }
}

/// Classify a lifetime spend into a tier. Thresholds are inclusive, so
/// exactly R$ 150.00 is already Bronze.
#[must_use]
pub fn classify(total_spent: Money) -> LoyaltyTier {
    if total_spent >= min_spend(LoyaltyTier::Diamond) {
        LoyaltyTier::Diamond
    } else if total_spent >= min_spend(LoyaltyTier::Silver) {
        LoyaltyTier::Silver
    } else if total_spent >= min_spend(LoyaltyTier::Bronze) {
        LoyaltyTier::Bronze
    } else {
        LoyaltyTier::Starter
    }
}

/// The discount percentage the back office suggests when rewarding a
/// customer of this tier.
#[must_use]
pub fn suggested_discount_percent(tier: LoyaltyTier) -> Decimal {
    match tier {
        LoyaltyTier::Starter => Decimal::ZERO,
        LoyaltyTier::Bronze => Decimal::from(15_u32),
        LoyaltyTier::Silver => Decimal::from(25_u32),
        LoyaltyTier::Diamond => Decimal::from(40_u32),
    }
}

/// The canned congratulation used when issuing a tier reward coupon.
/// `None` for Starter, which has nothing to suggest.
#[must_use]
pub fn suggestion_message(tier: LoyaltyTier) -> Option<String> {
    let percent = suggested_discount_percent(tier);
    if percent.is_zero() {
        return None;
    }
    Some(format!(
        "Parabéns! Pelo seu nível {}, você liberou {percent}% OFF em itens selecionados!",
        tier.display_name()
    ))
}

/// A customer's position on the loyalty ladder.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoyaltyStatus {
    pub tier: LoyaltyTier,
    pub total_spent: Money,
    /// The next tier to reach, or `None` at the top.
    pub next_tier: Option<LoyaltyTier>,
    /// How much more spend reaches `next_tier`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_to_next: Option<Money>,
}

/// Compute the full ladder position for a lifetime spend.
#[must_use]
pub fn status_for(total_spent: Money) -> LoyaltyStatus {
    let tier = classify(total_spent);
    let next_tier = tier.next();
    let amount_to_next = next_tier.map(|next| min_spend(next).saturating_sub(total_spent));
    LoyaltyStatus {
        tier,
        total_spent,
        next_tier,
        amount_to_next,
    }
}

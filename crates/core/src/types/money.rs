//! Type-safe money representation using decimal arithmetic.
//!
//! All amounts are Brazilian reais (BRL). Amounts are stored in the
//! currency's standard unit (reais, not centavos) with two decimal places;
//! the payment gateway wants centavos, so conversion helpers live here too.

use core::fmt;
use core::iter::Sum;
use core::ops::{Add, AddAssign};

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// A monetary amount in BRL.
///
/// # Example
///
/// ```rust
/// use limoda_core::Money;
/// use rust_decimal::Decimal;
///
/// let price = Money::from_centavos(15_990);
/// assert_eq!(price.to_string(), "R$ 159.90");
/// assert_eq!(price.amount(), Decimal::new(15_990, 2));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// R$ 0.00.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a new amount from a decimal number of reais.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Create an amount from an integer number of centavos.
    #[must_use]
    pub fn from_centavos(centavos: i64) -> Self {
        Self(Decimal::new(centavos, 2))
    }

    /// The underlying decimal amount in reais.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// The amount as an integer number of centavos, as the payment gateway
    /// expects. Rounds half away from zero at the second decimal place.
    #[must_use]
    pub fn to_centavos(&self) -> i64 {
        (self.0 * Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
            .unwrap_or(i64::MAX)
    }

    /// Whether the amount is exactly zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Subtract, flooring at zero. A discount can never push a total
    /// negative.
    #[must_use]
    pub fn saturating_sub(self, rhs: Self) -> Self {
        if rhs.0 >= self.0 {
            Self::ZERO
        } else {
            Self(self.0 - rhs.0)
        }
    }

    /// Multiply by a unit count.
    #[must_use]
    pub fn times(self, quantity: u32) -> Self {
        Self(self.0 * Decimal::from(quantity))
    }

    /// Take a percentage of this amount, rounded to whole centavos with
    /// half-away-from-zero ties.
    #[must_use]
    pub fn percent(self, percentage: Decimal) -> Self {
        Self(
            (self.0 * percentage / Decimal::ONE_HUNDRED)
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
        )
    }

    /// Round to whole centavos with half-away-from-zero ties.
    #[must_use]
    pub fn rounded(self) -> Self {
        Self(
            self.0
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
        )
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R$ {:.2}", self.0)
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

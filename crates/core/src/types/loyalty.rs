//! Customer loyalty tiers.

use serde::{Deserialize, Serialize};

/// Loyalty tier, derived from a customer's lifetime spend.
///
/// Tiers are never stored; they are recomputed from the spend total
/// whenever someone asks. Serialized forms keep the Portuguese labels the
/// storefront and back office display.
///
/// The derived ordering is the progression order, so `Bronze < Silver`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LoyaltyTier {
    #[serde(rename = "Iniciante")]
    Starter,
    #[serde(rename = "Bronze")]
    Bronze,
    #[serde(rename = "Prata")]
    Silver,
    #[serde(rename = "Diamante VIP")]
    Diamond,
}

impl LoyaltyTier {
    /// The label shown to customers and staff.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::Starter => "Iniciante",
            Self::Bronze => "Bronze",
            Self::Silver => "Prata",
            Self::Diamond => "Diamante VIP",
        }
    }

    /// The tier after this one, or `None` at the top.
    #[must_use]
    pub const fn next(&self) -> Option<Self> {
        match self {
            Self::Starter => Some(Self::Bronze),
            Self::Bronze => Some(Self::Silver),
            Self::Silver => Some(Self::Diamond),
            Self::Diamond => None,
        }
    }
}

impl std::fmt::Display for LoyaltyTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_tiers_order_by_progression() {
        assert!(LoyaltyTier::Starter < LoyaltyTier::Bronze);
        assert!(LoyaltyTier::Bronze < LoyaltyTier::Silver);
        assert!(LoyaltyTier::Silver < LoyaltyTier::Diamond);
    }

    #[test]
    fn test_next_walks_the_ladder() {
        assert_eq!(LoyaltyTier::Starter.next(), Some(LoyaltyTier::Bronze));
        assert_eq!(LoyaltyTier::Diamond.next(), None);
    }

    #[test]
    fn test_serde_uses_display_labels() {
        assert_eq!(
            serde_json::to_string(&LoyaltyTier::Silver).unwrap(),
            "\"Prata\""
        );
        let parsed: LoyaltyTier = serde_json::from_str("\"Diamante VIP\"").unwrap();
        assert_eq!(parsed, LoyaltyTier::Diamond);
    }
}

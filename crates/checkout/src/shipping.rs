//! Shipping fee resolution.
//!
//! Delivery inside the store's southeast-zone neighborhoods is free;
//! everywhere else pays a flat courier fee. Pickup never pays shipping.

use limoda_core::{DeliveryMethod, Money};

/// Neighborhoods with free courier delivery. Matching is done uppercase
/// against the neighborhood the postal lookup returned, by containment,
/// so "DIRCEU ARCOVERDE I" still matches "DIRCEU".
pub const FREE_DELIVERY_ZONES: [&str; 11] = [
    "PARQUE IDEAL",
    "DIRCEU",
    "ITARARE",
    "SÃO JOÃO",
    "GURUPÍ",
    "COLORADO",
    "RENASCENÇA",
    "NOVO HORIZONTE",
    "TODOS OS SANTOS",
    "ALTO DA RESSURREIÇÃO",
    "ESTORIL",
];

/// Flat courier fee outside the free zones, in centavos.
const FLAT_FEE_CENTAVOS: i64 = 1500;

/// A resolved shipping quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShippingQuote {
    pub fee: Money,
    /// Whether a free-zone neighborhood waived the fee.
    pub free_zone: bool,
}

/// Shipping policy: the flat fee plus the free-zone list.
#[derive(Debug, Clone)]
pub struct ShippingPolicy {
    flat_fee: Money,
    free_zones: Vec<String>,
}

impl Default for ShippingPolicy {
    fn default() -> Self {
        Self {
            flat_fee: Money::from_centavos(FLAT_FEE_CENTAVOS),
            free_zones: FREE_DELIVERY_ZONES
                .iter()
                .map(|zone| (*zone).to_owned())
                .collect(),
        }
    }
}

impl ShippingPolicy {
    /// A policy with a non-default flat fee, keeping the standard zones.
    #[must_use]
    pub fn with_flat_fee(flat_fee: Money) -> Self {
        Self {
            flat_fee,
            ..Self::default()
        }
    }

    /// Quote the shipping fee for a delivery method and the neighborhood
    /// the address resolved to. Pickup is always free; the neighborhood
    /// only matters for courier delivery.
    #[must_use]
    pub fn quote(&self, method: DeliveryMethod, neighborhood: Option<&str>) -> ShippingQuote {
        match method {
            DeliveryMethod::Pickup => ShippingQuote {
                fee: Money::ZERO,
                free_zone: false,
            },
            DeliveryMethod::Delivery => {
                let free = neighborhood.is_some_and(|n| self.is_free_zone(n));
                ShippingQuote {
                    fee: if free { Money::ZERO } else { self.flat_fee },
                    free_zone: free,
                }
            }
        }
    }

    /// Whether a neighborhood falls inside the free delivery zones.
    #[must_use]
    pub fn is_free_zone(&self, neighborhood: &str) -> bool {
        let upper = neighborhood.to_uppercase();
        self.free_zones.iter().any(|zone| upper.contains(zone))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn free_zone_neighborhood_waives_the_fee() {
        let policy = ShippingPolicy::default();
        let quote = policy.quote(DeliveryMethod::Delivery, Some("Dirceu Arcoverde I"));
        assert_eq!(quote.fee, Money::ZERO);
        assert!(quote.free_zone);
    }

    #[test]
    fn matching_is_case_insensitive_and_accent_exact() {
        let policy = ShippingPolicy::default();
        assert!(policy.is_free_zone("renascença"));
        assert!(policy.is_free_zone("Residencial São João"));
        assert!(!policy.is_free_zone("Sao Joao"));
    }

    #[test]
    fn outside_the_zones_pays_the_flat_fee() {
        let policy = ShippingPolicy::default();
        let quote = policy.quote(DeliveryMethod::Delivery, Some("Centro"));
        assert_eq!(quote.fee, Money::new(dec!(15.00)));
        assert!(!quote.free_zone);
    }

    #[test]
    fn missing_neighborhood_pays_the_flat_fee() {
        let policy = ShippingPolicy::default();
        let quote = policy.quote(DeliveryMethod::Delivery, None);
        assert_eq!(quote.fee, Money::new(dec!(15.00)));
    }

    #[test]
    fn pickup_is_always_free() {
        let policy = ShippingPolicy::default();
        let quote = policy.quote(DeliveryMethod::Pickup, Some("Centro"));
        assert_eq!(quote.fee, Money::ZERO);
        assert!(!quote.free_zone);
    }

    #[test]
    fn custom_flat_fee_keeps_the_zone_list() {
        let policy = ShippingPolicy::with_flat_fee(Money::new(dec!(22.50)));
        assert_eq!(
            policy.quote(DeliveryMethod::Delivery, Some("Centro")).fee,
            Money::new(dec!(22.50))
        );
        assert!(policy.is_free_zone("ESTORIL"));
    }
}

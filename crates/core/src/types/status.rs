//! Status and classification enums for orders, carts, and the catalog.

use serde::{Deserialize, Serialize};

/// How the customer pays.
///
/// Serialized forms match the values the storefront sends and the order
/// documents store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Instant bank transfer via a QR code.
    Pix,
    /// Credit card, charged through the gateway.
    Card,
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pix => write!(f, "pix"),
            Self::Card => write!(f, "card"),
        }
    }
}

/// How the order reaches the customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMethod {
    /// Courier delivery to the customer's address.
    Delivery,
    /// Customer picks the order up at the store.
    Pickup,
}

impl std::fmt::Display for DeliveryMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Delivery => write!(f, "delivery"),
            Self::Pickup => write!(f, "pickup"),
        }
    }
}

/// Order lifecycle status.
///
/// Checkout always writes `Pending`; later stages are set by back-office
/// tooling reading the same documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Paid,
    Shipped,
    Delivered,
    Cancelled,
}

/// Product catalog category.
///
/// Serialized forms keep the accented Portuguese labels the catalog
/// documents use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Leggings,
    Tops,
    Conjuntos,
    Shorts,
    #[serde(rename = "Acessórios")]
    Acessorios,
    #[serde(rename = "Calçados")]
    Calcados,
}

/// Size of a catalog variant.
///
/// One-size products use the `ÚNICO` sentinel the catalog has always
/// carried; sized products store the chosen size label (`P`, `M`, `G`...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeSpec {
    /// One-size-fits-all product.
    Single,
    /// A specific size label.
    Sized(String),
}

impl SizeSpec {
    /// The label shown on labels and order lines.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Single => "ÚNICO",
            Self::Sized(size) => size,
        }
    }
}

impl std::fmt::Display for SizeSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_method_serde() {
        assert_eq!(
            serde_json::to_string(&PaymentMethod::Pix).unwrap(),
            "\"pix\""
        );
        let parsed: PaymentMethod = serde_json::from_str("\"card\"").unwrap();
        assert_eq!(parsed, PaymentMethod::Card);
    }

    #[test]
    fn test_order_status_defaults_to_pending() {
        assert_eq!(OrderStatus::default(), OrderStatus::Pending);
        assert_eq!(
            serde_json::to_string(&OrderStatus::Pending).unwrap(),
            "\"pending\""
        );
    }

    #[test]
    fn test_category_keeps_accented_labels() {
        assert_eq!(
            serde_json::to_string(&Category::Acessorios).unwrap(),
            "\"Acessórios\""
        );
        let parsed: Category = serde_json::from_str("\"Calçados\"").unwrap();
        assert_eq!(parsed, Category::Calcados);
    }

    #[test]
    fn test_size_spec_label() {
        assert_eq!(SizeSpec::Single.label(), "ÚNICO");
        assert_eq!(SizeSpec::Sized("M".to_owned()).label(), "M");
    }
}

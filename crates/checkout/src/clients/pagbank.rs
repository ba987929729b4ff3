//! PagBank Orders API client (API v4).
//!
//! One call creates a payment order and captures the charge: PIX
//! charges come back with a QR code to display, card charges are
//! captured immediately from the browser-encrypted card blob.

use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use limoda_core::PaymentMethod;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::{ChargeOutcome, ChargeRequest, PaymentError, PaymentGateway};
use crate::model::PixQr;

/// Production PagBank endpoint.
const DEFAULT_BASE_URL: &str = "https://api.pagseguro.com";

/// Description printed on card statements and gateway dashboards.
const CHARGE_DESCRIPTION: &str = "Pedido Li Moda Fitness";

/// How long a PIX QR code stays payable.
const PIX_EXPIRY: Duration = Duration::hours(1);

/// Charge capture can be slow on the gateway side, but never unbounded.
const REQUEST_TIMEOUT: StdDuration = StdDuration::from_secs(30);

/// PagBank API client.
#[derive(Clone)]
pub struct PagBankClient {
    client: reqwest::Client,
    base_url: String,
    notification_url: Option<String>,
}

impl PagBankClient {
    /// Create a client against the production endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is not a valid header value or the
    /// HTTP client fails to build.
    pub fn new(
        token: &SecretString,
        notification_url: Option<String>,
    ) -> Result<Self, PaymentError> {
        Self::with_base_url(token, notification_url, DEFAULT_BASE_URL)
    }

    /// Create a client against a custom endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is not a valid header value or the
    /// HTTP client fails to build.
    pub fn with_base_url(
        token: &SecretString,
        notification_url: Option<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, PaymentError> {
        let mut headers = HeaderMap::new();

        let auth_value = format!("Bearer {}", token.expose_secret());
        let mut auth = HeaderValue::from_str(&auth_value)
            .map_err(|e| PaymentError::Parse(format!("invalid gateway token: {e}")))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            notification_url,
        })
    }

    /// Assemble the order payload for one charge.
    fn build_payload<'a>(
        &'a self,
        request: &'a ChargeRequest,
        now: DateTime<Utc>,
    ) -> Result<OrderPayload<'a>, PaymentError> {
        let amount_centavos = request.amount.to_centavos();

        let (qr_codes, charges) = match request.method {
            PaymentMethod::Pix => {
                let expiration = (now + PIX_EXPIRY).to_rfc3339_opts(SecondsFormat::Millis, true);
                let qr = QrCodeNode {
                    amount: AmountNode {
                        value: amount_centavos,
                    },
                    expiration_date: expiration,
                };
                (Some(vec![qr]), None)
            }
            PaymentMethod::Card => {
                let card = request.card.as_ref().ok_or_else(|| {
                    PaymentError::Parse("card payment without encrypted card data".to_owned())
                })?;
                let charge = ChargeNode {
                    reference_id: format!("CHARGE-{}", now.timestamp_millis()),
                    description: CHARGE_DESCRIPTION,
                    amount: ChargeAmountNode {
                        value: amount_centavos,
                        currency: "BRL",
                    },
                    payment_method: PaymentMethodNode {
                        kind: "CREDIT_CARD",
                        installments: 1,
                        capture: true,
                        card: CardNode {
                            encrypted: &card.encrypted_token,
                            store: false,
                        },
                    },
                };
                (None, Some(vec![charge]))
            }
        };

        let shipping = request.shipping_address.as_ref().map(|address| ShippingNode {
            address: AddressNode {
                street: &address.street,
                number: &address.number,
                complement: address.complement.as_deref(),
                locality: &address.neighborhood,
                city: &address.city,
                region_code: &address.state,
                country: "BRA",
                postal_code: address.cep.as_str(),
            },
        });

        Ok(OrderPayload {
            reference_id: &request.reference,
            customer: CustomerNode {
                name: &request.customer_name,
                email: request.customer_email.as_str(),
                tax_id: request.customer_tax_id.as_str(),
            },
            items: request
                .items
                .iter()
                .map(|item| ItemNode {
                    name: &item.name,
                    quantity: item.quantity,
                    unit_amount: item.unit_amount,
                })
                .collect(),
            notification_urls: self
                .notification_url
                .as_deref()
                .map(|url| vec![url]),
            qr_codes,
            charges,
            shipping,
        })
    }
}

#[async_trait]
impl PaymentGateway for PagBankClient {
    #[instrument(skip(self, request), fields(reference = %request.reference, method = %request.method))]
    async fn charge(&self, request: &ChargeRequest) -> Result<ChargeOutcome, PaymentError> {
        let url = format!("{}/orders", self.base_url);
        let now = Utc::now();
        let payload = self.build_payload(request, now)?;

        let response = self.client.post(&url).json(&payload).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PaymentError::Gateway {
                status: status.as_u16(),
                message,
            });
        }

        let order: OrderResponse = response
            .json()
            .await
            .map_err(|e| PaymentError::Parse(e.to_string()))?;
        debug!(gateway_order_id = %order.id, "payment order created");

        outcome_from_response(order, request.method, now + PIX_EXPIRY)
    }
}

/// Map the gateway response to an outcome for the requested method.
fn outcome_from_response(
    order: OrderResponse,
    method: PaymentMethod,
    fallback_expiry: DateTime<Utc>,
) -> Result<ChargeOutcome, PaymentError> {
    match method {
        PaymentMethod::Card => {
            let charge = order.charges.into_iter().next().ok_or_else(|| {
                PaymentError::Parse("gateway response carries no charge".to_owned())
            })?;
            if charge.status != "PAID" {
                let reason = charge
                    .payment_response
                    .and_then(|r| r.message)
                    .unwrap_or(charge.status);
                return Err(PaymentError::Declined { reason });
            }
            Ok(ChargeOutcome {
                gateway_order_id: order.id,
                pix_qr: None,
            })
        }
        PaymentMethod::Pix => {
            let qr = order.qr_codes.into_iter().next().ok_or_else(|| {
                PaymentError::Parse("gateway response carries no QR code".to_owned())
            })?;
            let expires_at = qr
                .expiration_date
                .as_deref()
                .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
                .map_or(fallback_expiry, |dt| dt.with_timezone(&Utc));
            let png_url = qr
                .links
                .into_iter()
                .find(|link| link.rel == "QRCODE.PNG")
                .map(|link| link.href);
            Ok(ChargeOutcome {
                gateway_order_id: order.id,
                pix_qr: Some(PixQr {
                    text: qr.text,
                    png_url,
                    expires_at,
                }),
            })
        }
    }
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Serialize)]
struct OrderPayload<'a> {
    reference_id: &'a str,
    customer: CustomerNode<'a>,
    items: Vec<ItemNode<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    notification_urls: Option<Vec<&'a str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    qr_codes: Option<Vec<QrCodeNode>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    charges: Option<Vec<ChargeNode<'a>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    shipping: Option<ShippingNode<'a>>,
}

#[derive(Debug, Serialize)]
struct CustomerNode<'a> {
    name: &'a str,
    email: &'a str,
    tax_id: &'a str,
}

#[derive(Debug, Serialize)]
struct ItemNode<'a> {
    name: &'a str,
    quantity: u32,
    unit_amount: i64,
}

#[derive(Debug, Serialize)]
struct QrCodeNode {
    amount: AmountNode,
    expiration_date: String,
}

#[derive(Debug, Serialize)]
struct AmountNode {
    value: i64,
}

#[derive(Debug, Serialize)]
struct ChargeNode<'a> {
    reference_id: String,
    description: &'static str,
    amount: ChargeAmountNode,
    payment_method: PaymentMethodNode<'a>,
}

#[derive(Debug, Serialize)]
struct ChargeAmountNode {
    value: i64,
    currency: &'static str,
}

#[derive(Debug, Serialize)]
struct PaymentMethodNode<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    installments: u32,
    capture: bool,
    card: CardNode<'a>,
}

#[derive(Debug, Serialize)]
struct CardNode<'a> {
    encrypted: &'a str,
    store: bool,
}

#[derive(Debug, Serialize)]
struct ShippingNode<'a> {
    address: AddressNode<'a>,
}

#[derive(Debug, Serialize)]
struct AddressNode<'a> {
    street: &'a str,
    number: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    complement: Option<&'a str>,
    locality: &'a str,
    city: &'a str,
    region_code: &'a str,
    country: &'static str,
    postal_code: &'a str,
}

#[derive(Debug, Deserialize)]
struct OrderResponse {
    id: String,
    #[serde(default)]
    qr_codes: Vec<QrCodeResponse>,
    #[serde(default)]
    charges: Vec<ChargeResponse>,
}

#[derive(Debug, Deserialize)]
struct QrCodeResponse {
    text: String,
    #[serde(default)]
    links: Vec<LinkResponse>,
    #[serde(default)]
    expiration_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LinkResponse {
    rel: String,
    href: String,
}

#[derive(Debug, Deserialize)]
struct ChargeResponse {
    status: String,
    #[serde(default)]
    payment_response: Option<PaymentResponseNode>,
}

#[derive(Debug, Deserialize)]
struct PaymentResponseNode {
    #[serde(default)]
    message: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use limoda_core::{CepCode, Cpf, Email, Money};
    use rust_decimal_macros::dec;

    use crate::clients::{CardDetails, ChargeItem};
    use crate::model::Address;

    fn client() -> PagBankClient {
        PagBankClient::new(&SecretString::from("test-token"), None).unwrap()
    }

    fn request(method: PaymentMethod) -> ChargeRequest {
        ChargeRequest {
            reference: "LIMODA-1700000000000".to_owned(),
            customer_name: "Ana Paula Souza".to_owned(),
            customer_email: Email::parse("ana@example.com").unwrap(),
            customer_tax_id: Cpf::parse("529.982.247-25").unwrap(),
            method,
            amount: Money::new(dec!(165)),
            items: vec![ChargeItem {
                name: "Legging Classic (M)".to_owned(),
                quantity: 2,
                unit_amount: 10_000,
            }],
            shipping_address: None,
            card: match method {
                PaymentMethod::Card => Some(CardDetails {
                    encrypted_token: "encrypted-blob".to_owned(),
                }),
                PaymentMethod::Pix => None,
            },
        }
    }

    fn address() -> Address {
        Address {
            cep: CepCode::parse("64078-213").unwrap(),
            street: "Rua das Acácias".to_owned(),
            neighborhood: "Parque Ideal".to_owned(),
            city: "Teresina".to_owned(),
            state: "PI".to_owned(),
            number: "95".to_owned(),
            complement: None,
        }
    }

    #[test]
    fn pix_payload_carries_a_qr_code_request() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let client = client();
        let request = request(PaymentMethod::Pix);
        let payload = client.build_payload(&request, now).unwrap();
        let value = serde_json::to_value(&payload).unwrap();

        assert_eq!(
            value.pointer("/reference_id").unwrap(),
            "LIMODA-1700000000000"
        );
        assert_eq!(value.pointer("/customer/tax_id").unwrap(), "52998224725");
        assert_eq!(
            value.pointer("/qr_codes/0/amount/value").unwrap(),
            &serde_json::json!(16_500)
        );
        assert_eq!(
            value.pointer("/qr_codes/0/expiration_date").unwrap(),
            "2026-03-01T13:00:00.000Z"
        );
        assert!(value.pointer("/charges").is_none());
        assert!(value.pointer("/shipping").is_none());
        assert!(value.pointer("/notification_urls").is_none());
    }

    #[test]
    fn card_payload_captures_a_single_installment() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let mut request = request(PaymentMethod::Card);
        request.shipping_address = Some(address());
        let client = client();
        let payload = client.build_payload(&request, now).unwrap();
        let value = serde_json::to_value(&payload).unwrap();

        assert_eq!(
            value.pointer("/charges/0/payment_method/type").unwrap(),
            "CREDIT_CARD"
        );
        assert_eq!(
            value.pointer("/charges/0/payment_method/installments").unwrap(),
            &serde_json::json!(1)
        );
        assert_eq!(
            value.pointer("/charges/0/payment_method/capture").unwrap(),
            &serde_json::json!(true)
        );
        assert_eq!(
            value.pointer("/charges/0/payment_method/card/encrypted").unwrap(),
            "encrypted-blob"
        );
        assert_eq!(
            value.pointer("/charges/0/payment_method/card/store").unwrap(),
            &serde_json::json!(false)
        );
        assert_eq!(
            value.pointer("/charges/0/amount/currency").unwrap(),
            "BRL"
        );
        assert_eq!(
            value.pointer("/shipping/address/postal_code").unwrap(),
            "64078213"
        );
        assert_eq!(value.pointer("/shipping/address/locality").unwrap(), "Parque Ideal");
        assert!(value.pointer("/qr_codes").is_none());
    }

    #[test]
    fn card_payload_requires_encrypted_card_data() {
        let mut request = request(PaymentMethod::Card);
        request.card = None;
        let err = client()
            .build_payload(&request, Utc::now())
            .unwrap_err();
        assert!(matches!(err, PaymentError::Parse(_)));
    }

    #[test]
    fn notification_url_lands_in_the_payload() {
        let client = PagBankClient::new(
            &SecretString::from("test-token"),
            Some("https://limoda.example/webhook".to_owned()),
        )
        .unwrap();
        let request = request(PaymentMethod::Pix);
        let payload = client.build_payload(&request, Utc::now()).unwrap();
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            value.pointer("/notification_urls/0").unwrap(),
            "https://limoda.example/webhook"
        );
    }

    #[test]
    fn paid_card_response_maps_to_an_outcome() {
        let response: OrderResponse = serde_json::from_str(
            r#"{
                "id": "ORDE_ABC",
                "charges": [{"status": "PAID"}]
            }"#,
        )
        .unwrap();
        let outcome =
            outcome_from_response(response, PaymentMethod::Card, Utc::now()).unwrap();
        assert_eq!(outcome.gateway_order_id, "ORDE_ABC");
        assert!(outcome.pix_qr.is_none());
    }

    #[test]
    fn declined_card_response_surfaces_the_gateway_message() {
        let response: OrderResponse = serde_json::from_str(
            r#"{
                "id": "ORDE_ABC",
                "charges": [{
                    "status": "DECLINED",
                    "payment_response": {"message": "Transação negada pelo emissor"}
                }]
            }"#,
        )
        .unwrap();
        let err =
            outcome_from_response(response, PaymentMethod::Card, Utc::now()).unwrap_err();
        match err {
            PaymentError::Declined { reason } => {
                assert_eq!(reason, "Transação negada pelo emissor");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn pix_response_extracts_the_qr_code() {
        let response: OrderResponse = serde_json::from_str(
            r#"{
                "id": "ORDE_PIX",
                "qr_codes": [{
                    "text": "00020126face",
                    "expiration_date": "2026-03-01T13:00:00.000Z",
                    "links": [
                        {"rel": "QRCODE.PNG", "href": "https://api.pagseguro.com/qrcode/1.png"},
                        {"rel": "QRCODE.BASE64", "href": "https://api.pagseguro.com/qrcode/1.b64"}
                    ]
                }]
            }"#,
        )
        .unwrap();
        let outcome =
            outcome_from_response(response, PaymentMethod::Pix, Utc::now()).unwrap();
        let qr = outcome.pix_qr.unwrap();
        assert_eq!(qr.text, "00020126face");
        assert_eq!(
            qr.png_url.as_deref(),
            Some("https://api.pagseguro.com/qrcode/1.png")
        );
        assert_eq!(
            qr.expires_at,
            Utc.with_ymd_and_hms(2026, 3, 1, 13, 0, 0).unwrap()
        );
    }

    #[test]
    fn empty_charge_list_is_a_parse_error() {
        let response: OrderResponse = serde_json::from_str(r#"{"id": "ORDE_X"}"#).unwrap();
        let err =
            outcome_from_response(response, PaymentMethod::Card, Utc::now()).unwrap_err();
        assert!(matches!(err, PaymentError::Parse(_)));
    }
}

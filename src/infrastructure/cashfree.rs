use crate::config::CashfreeConfig;
use crate::domain::order::{Amount, GatewayKind, OrderRecord};
use crate::domain::ports::{
    PaymentDetails, PaymentGateway, PaymentSession, RedirectClaims, WebhookEvent, WebhookEventKind,
};
use crate::error::{Error, Result};
use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Deserialize;
use serde_json::json;
use sha2::Sha256;
use std::str::FromStr;
use std::time::Duration;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

const API_VERSION: &str = "2023-08-01";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Cashfree integration. Orders are created under the application's own
/// order id (so capture webhooks round-trip it directly); signatures are
/// base64-encoded HMAC-SHA256, with the webhook variant prefixing the raw
/// body with the header timestamp.
pub struct CashfreeGateway {
    config: CashfreeConfig,
    http: reqwest::Client,
    /// Where the payer lands after checkout and where webhooks are delivered.
    public_base_url: String,
}

impl CashfreeGateway {
    pub fn new(config: CashfreeConfig, public_base_url: String) -> Result<Self> {
        config.validate()?;
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| Error::Configuration(err.to_string()))?;
        Ok(Self {
            config,
            http,
            public_base_url,
        })
    }

    fn sign_base64(secret: &str, payload: &[u8]) -> Option<String> {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
        mac.update(payload);
        Some(BASE64.encode(mac.finalize().into_bytes()))
    }
}

/// JSON numbers come through their textual form so rupee amounts compare
/// exactly against the stored decimal.
fn decimal_from_number(value: &serde_json::Number) -> Result<Decimal> {
    Decimal::from_str(&value.to_string())
        .map_err(|err| Error::MalformedPayload(format!("unparseable amount: {err}")))
}

fn amount_from_number(value: &serde_json::Number) -> Result<Amount> {
    Amount::new(decimal_from_number(value)?)
}

fn transport_error(err: reqwest::Error) -> Error {
    Error::GatewayUnavailable(err.to_string())
}

#[derive(Debug, Deserialize)]
struct CreateOrderResponse {
    cf_order_id: serde_json::Value,
    payment_session_id: String,
}

#[derive(Debug, Deserialize)]
struct PaymentResponse {
    payment_status: String,
    payment_amount: serde_json::Number,
    payment_group: Option<String>,
    order_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
}

async fn rejection(response: reqwest::Response) -> Error {
    let status = response.status();
    let description = match response.json::<ApiErrorBody>().await {
        Ok(body) => body
            .message
            .unwrap_or_else(|| format!("request failed with status {status}")),
        Err(_) => format!("request failed with status {status}"),
    };
    Error::GatewayRejected { description }
}

#[derive(Debug, Deserialize)]
struct WebhookBody {
    #[serde(rename = "type")]
    event_type: String,
    data: Option<WebhookData>,
}

#[derive(Debug, Deserialize)]
struct WebhookData {
    order: Option<WebhookOrder>,
    payment: Option<WebhookPayment>,
}

#[derive(Debug, Deserialize)]
struct WebhookOrder {
    order_id: Option<String>,
    cf_order_id: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct WebhookPayment {
    cf_payment_id: Option<serde_json::Value>,
    payment_amount: Option<serde_json::Number>,
    payment_group: Option<String>,
    payment_message: Option<String>,
}

/// Cashfree serializes some ids as numbers and some as strings depending on
/// the event version.
fn id_to_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[async_trait]
impl PaymentGateway for CashfreeGateway {
    fn kind(&self) -> GatewayKind {
        GatewayKind::Cashfree
    }

    async fn create_session(&self, order: &OrderRecord) -> Result<PaymentSession> {
        let order_amount = order.amount.value().to_f64().ok_or_else(|| {
            Error::MalformedPayload("amount out of range".to_string())
        })?;
        let body = json!({
            "order_id": order.order_id,
            "order_amount": order_amount,
            "order_currency": "INR",
            "customer_details": {
                "customer_id": order.order_id,
                "customer_name": order.customer.name,
                "customer_email": order.customer.email,
                "customer_phone": order.customer.phone,
            },
            "order_meta": {
                "return_url": format!(
                    "{}/payment/return?order_id={}",
                    self.public_base_url, order.order_id
                ),
                "notify_url": format!(
                    "{}/api/registration/webhook/cashfree",
                    self.public_base_url
                ),
            },
        });

        let response = self
            .http
            .post(format!("{}/pg/orders", self.config.base_url()))
            .header("x-client-id", &self.config.app_id)
            .header("x-client-secret", &self.config.secret_key)
            .header("x-api-version", API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(rejection(response).await);
        }
        let created: CreateOrderResponse = response
            .json()
            .await
            .map_err(|err| Error::MalformedPayload(err.to_string()))?;
        let gateway_order_id = id_to_string(&created.cf_order_id).ok_or_else(|| {
            Error::MalformedPayload("order response without cf_order_id".to_string())
        })?;
        Ok(PaymentSession {
            gateway_order_id,
            payment_handle: created.payment_session_id,
        })
    }

    async fn fetch_payment(&self, gateway_payment_id: &str) -> Result<PaymentDetails> {
        let response = self
            .http
            .get(format!(
                "{}/pg/payments/{gateway_payment_id}",
                self.config.base_url()
            ))
            .header("x-client-id", &self.config.app_id)
            .header("x-client-secret", &self.config.secret_key)
            .header("x-api-version", API_VERSION)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(rejection(response).await);
        }
        let payment: PaymentResponse = response
            .json()
            .await
            .map_err(|err| Error::MalformedPayload(err.to_string()))?;
        Ok(PaymentDetails {
            captured: payment.payment_status == "SUCCESS",
            status: payment.payment_status,
            amount: amount_from_number(&payment.payment_amount)?,
            method: payment.payment_group,
            gateway_order_id: payment.order_id,
        })
    }

    /// The hosted-page return carries a signature over the identifier pair,
    /// using the same HMAC scheme as webhooks.
    fn verify_redirect_signature(&self, claims: &RedirectClaims) -> bool {
        let payload = format!("{}{}", claims.gateway_order_id, claims.gateway_payment_id);
        let Some(expected) = Self::sign_base64(&self.config.secret_key, payload.as_bytes()) else {
            return false;
        };
        bool::from(expected.as_bytes().ct_eq(claims.signature.as_bytes()))
    }

    fn webhook_secret_configured(&self) -> bool {
        self.config.webhook_secret.is_some()
    }

    /// The signed payload is `"{timestamp}{raw_body}"`; both come from the
    /// request verbatim. Parsing the body first and re-serializing would
    /// invalidate the signature.
    fn verify_webhook_signature(
        &self,
        raw_body: &[u8],
        signature: &str,
        timestamp: Option<&str>,
    ) -> bool {
        let Some(secret) = self.config.webhook_secret.as_deref() else {
            return false;
        };
        let Some(timestamp) = timestamp else {
            return false;
        };
        let mut payload = Vec::with_capacity(timestamp.len() + raw_body.len());
        payload.extend_from_slice(timestamp.as_bytes());
        payload.extend_from_slice(raw_body);
        let Some(expected) = Self::sign_base64(secret, &payload) else {
            return false;
        };
        bool::from(expected.as_bytes().ct_eq(signature.as_bytes()))
    }

    fn parse_webhook_event(&self, raw_body: &[u8]) -> Result<WebhookEvent> {
        let body: WebhookBody = serde_json::from_slice(raw_body)
            .map_err(|err| Error::MalformedPayload(err.to_string()))?;

        let kind = match body.event_type.as_str() {
            "PAYMENT_SUCCESS_WEBHOOK" => WebhookEventKind::PaymentCaptured,
            "PAYMENT_FAILED_WEBHOOK" | "PAYMENT_USER_DROPPED_WEBHOOK" => {
                WebhookEventKind::PaymentFailed
            }
            other => WebhookEventKind::Other(other.to_string()),
        };
        if matches!(kind, WebhookEventKind::Other(_)) {
            return Ok(WebhookEvent {
                kind,
                order_id: None,
                gateway_order_id: None,
                gateway_payment_id: None,
                amount: None,
                method: None,
                failure_reason: None,
            });
        }

        let data = body.data.ok_or_else(|| {
            Error::MalformedPayload("payment event without a data block".to_string())
        })?;
        let order = data.order.unwrap_or(WebhookOrder {
            order_id: None,
            cf_order_id: None,
        });
        let payment = data.payment.ok_or_else(|| {
            Error::MalformedPayload("payment event without a payment block".to_string())
        })?;

        Ok(WebhookEvent {
            kind,
            order_id: order.order_id,
            gateway_order_id: order.cf_order_id.as_ref().and_then(id_to_string),
            gateway_payment_id: payment.cf_payment_id.as_ref().and_then(id_to_string),
            amount: payment
                .payment_amount
                .as_ref()
                .map(amount_from_number)
                .transpose()?,
            method: payment.payment_group,
            failure_reason: payment.payment_message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn gateway(webhook_secret: Option<&str>) -> CashfreeGateway {
        CashfreeGateway::new(
            CashfreeConfig {
                app_id: "app_test".to_string(),
                secret_key: "cf_secret".to_string(),
                webhook_secret: webhook_secret.map(str::to_string),
                sandbox: true,
            },
            "http://localhost:8080".to_string(),
        )
        .unwrap()
    }

    #[test]
    fn webhook_signature_requires_timestamp() {
        let gw = gateway(Some("whsec"));
        let body = br#"{"type":"PAYMENT_SUCCESS_WEBHOOK"}"#;
        let mut payload = b"1700000000".to_vec();
        payload.extend_from_slice(body);
        let signature = CashfreeGateway::sign_base64("whsec", &payload).unwrap();

        assert!(gw.verify_webhook_signature(body, &signature, Some("1700000000")));
        assert!(!gw.verify_webhook_signature(body, &signature, None));
        assert!(!gw.verify_webhook_signature(body, &signature, Some("1700000001")));
    }

    #[test]
    fn webhook_signature_fails_closed_without_secret() {
        let gw = gateway(None);
        assert!(!gw.webhook_secret_configured());
        assert!(!gw.verify_webhook_signature(b"{}", "sig", Some("1700000000")));
    }

    #[test]
    fn success_event_carries_the_application_order_id() {
        let gw = gateway(None);
        let body = serde_json::to_vec(&json!({
            "type": "PAYMENT_SUCCESS_WEBHOOK",
            "data": {
                "order": {"order_id": "REG-1", "cf_order_id": 98765},
                "payment": {
                    "cf_payment_id": 12345,
                    "payment_status": "SUCCESS",
                    "payment_amount": 499.99,
                    "payment_group": "upi",
                }
            }
        }))
        .unwrap();

        let event = gw.parse_webhook_event(&body).unwrap();
        assert_eq!(event.kind, WebhookEventKind::PaymentCaptured);
        assert_eq!(event.order_id.as_deref(), Some("REG-1"));
        assert_eq!(event.gateway_order_id.as_deref(), Some("98765"));
        assert_eq!(event.gateway_payment_id.as_deref(), Some("12345"));
        assert_eq!(event.amount, Some(Amount::new(dec!(499.99)).unwrap()));
    }

    #[test]
    fn dropped_payment_maps_to_failure() {
        let gw = gateway(None);
        let body = serde_json::to_vec(&json!({
            "type": "PAYMENT_USER_DROPPED_WEBHOOK",
            "data": {
                "order": {"order_id": "REG-1"},
                "payment": {
                    "cf_payment_id": "12345",
                    "payment_message": "payer abandoned checkout",
                }
            }
        }))
        .unwrap();

        let event = gw.parse_webhook_event(&body).unwrap();
        assert_eq!(event.kind, WebhookEventKind::PaymentFailed);
        assert_eq!(
            event.failure_reason.as_deref(),
            Some("payer abandoned checkout")
        );
    }

    #[test]
    fn amounts_parse_exactly() {
        let n = serde_json::Number::from_f64(499.99).unwrap();
        assert_eq!(decimal_from_number(&n).unwrap(), dec!(499.99));
    }
}

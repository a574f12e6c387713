use crate::config::RazorpayConfig;
use crate::domain::order::{Amount, GatewayKind, OrderRecord};
use crate::domain::ports::{
    PaymentDetails, PaymentGateway, PaymentSession, RedirectClaims, WebhookEvent, WebhookEventKind,
};
use crate::error::{Error, Result};
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Deserialize;
use serde_json::json;
use sha2::Sha256;
use std::time::Duration;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

const API_BASE: &str = "https://api.razorpay.com/v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Razorpay integration. Amounts cross the wire in paise (hundredths of a
/// rupee, integral); signatures are hex-encoded HMAC-SHA256.
pub struct RazorpayGateway {
    config: RazorpayConfig,
    http: reqwest::Client,
}

impl RazorpayGateway {
    pub fn new(config: RazorpayConfig) -> Result<Self> {
        config.validate()?;
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| Error::Configuration(err.to_string()))?;
        Ok(Self { config, http })
    }

    fn sign_hex(secret: &str, payload: &[u8]) -> Option<String> {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
        mac.update(payload);
        Some(hex::encode(mac.finalize().into_bytes()))
    }
}

fn to_paise(amount: Amount) -> Result<i64> {
    (amount.value() * Decimal::from(100))
        .round()
        .to_i64()
        .ok_or_else(|| Error::MalformedPayload("amount out of range".to_string()))
}

fn from_paise(paise: i64) -> Result<Amount> {
    Amount::new(Decimal::new(paise, 2))
}

fn transport_error(err: reqwest::Error) -> Error {
    Error::GatewayUnavailable(err.to_string())
}

#[derive(Debug, Deserialize)]
struct OrderResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct PaymentResponse {
    status: String,
    amount: i64,
    method: Option<String>,
    order_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    description: Option<String>,
}

async fn rejection(response: reqwest::Response) -> Error {
    let status = response.status();
    let description = match response.json::<ApiErrorBody>().await {
        Ok(body) => body
            .error
            .and_then(|e| e.description)
            .unwrap_or_else(|| format!("request failed with status {status}")),
        Err(_) => format!("request failed with status {status}"),
    };
    Error::GatewayRejected { description }
}

#[derive(Debug, Deserialize)]
struct WebhookBody {
    event: String,
    payload: Option<WebhookPayload>,
}

#[derive(Debug, Deserialize)]
struct WebhookPayload {
    payment: Option<WebhookPayment>,
}

#[derive(Debug, Deserialize)]
struct WebhookPayment {
    entity: WebhookPaymentEntity,
}

#[derive(Debug, Deserialize)]
struct WebhookPaymentEntity {
    id: String,
    order_id: Option<String>,
    amount: Option<i64>,
    method: Option<String>,
    #[serde(default)]
    notes: serde_json::Value,
    error_description: Option<String>,
}

#[async_trait]
impl PaymentGateway for RazorpayGateway {
    fn kind(&self) -> GatewayKind {
        GatewayKind::Razorpay
    }

    async fn create_session(&self, order: &OrderRecord) -> Result<PaymentSession> {
        let body = json!({
            "amount": to_paise(order.amount)?,
            "currency": "INR",
            "receipt": order.order_id,
            "payment_capture": 1,
            "notes": {
                // The application order id rides along so the webhook can
                // correlate without relying on the gateway order id alone.
                "order_id": order.order_id,
                "customer_name": order.customer.name,
                "customer_email": order.customer.email,
            },
        });

        let response = self
            .http
            .post(format!("{API_BASE}/orders"))
            .basic_auth(&self.config.key_id, Some(&self.config.key_secret))
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(rejection(response).await);
        }
        let created: OrderResponse = response
            .json()
            .await
            .map_err(|err| Error::MalformedPayload(err.to_string()))?;
        Ok(PaymentSession {
            gateway_order_id: created.id,
            payment_handle: self.config.key_id.clone(),
        })
    }

    async fn fetch_payment(&self, gateway_payment_id: &str) -> Result<PaymentDetails> {
        let response = self
            .http
            .get(format!("{API_BASE}/payments/{gateway_payment_id}"))
            .basic_auth(&self.config.key_id, Some(&self.config.key_secret))
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
            captured: payment.status == "captured",
            status: payment.status,
            amount: from_paise(payment.amount)?,
            method: payment.method,
            gateway_order_id: payment.order_id,
        })
    }

    /// The checkout callback signs `"{order_id}|{payment_id}"` with the key
    /// secret.
    fn verify_redirect_signature(&self, claims: &RedirectClaims) -> bool {
        let payload = format!("{}|{}", claims.gateway_order_id, claims.gateway_payment_id);
        let Some(expected) = Self::sign_hex(&self.config.key_secret, payload.as_bytes()) else {
            return false;
        };
        bool::from(expected.as_bytes().ct_eq(claims.signature.as_bytes()))
    }

    fn webhook_secret_configured(&self) -> bool {
        self.config.webhook_secret.is_some()
    }

    fn verify_webhook_signature(
        &self,
        raw_body: &[u8],
        signature: &str,
        _timestamp: Option<&str>,
    ) -> bool {
        let Some(secret) = self.config.webhook_secret.as_deref() else {
            return false;
        };
        let Some(expected) = Self::sign_hex(secret, raw_body) else {
            return false;
        };
        bool::from(expected.as_bytes().ct_eq(signature.as_bytes()))
    }

    fn parse_webhook_event(&self, raw_body: &[u8]) -> Result<WebhookEvent> {
        let body: WebhookBody = serde_json::from_slice(raw_body)
            .map_err(|err| Error::MalformedPayload(err.to_string()))?;

        let kind = match body.event.as_str() {
            "payment.captured" => WebhookEventKind::PaymentCaptured,
            "payment.failed" => WebhookEventKind::PaymentFailed,
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

        let entity = body
            .payload
            .and_then(|p| p.payment)
            .map(|p| p.entity)
            .ok_or_else(|| {
                Error::MalformedPayload("payment event without a payment entity".to_string())
            })?;

        let order_id = entity
            .notes
            .get("order_id")
            .and_then(|v| v.as_str())
            .map(str::to_string);
        let amount = entity.amount.map(from_paise).transpose()?;

        Ok(WebhookEvent {
            kind,
            order_id,
            gateway_order_id: entity.order_id,
            gateway_payment_id: Some(entity.id),
            amount,
            method: entity.method,
            failure_reason: entity.error_description,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn gateway(webhook_secret: Option<&str>) -> RazorpayGateway {
        RazorpayGateway::new(RazorpayConfig {
            key_id: "rzp_test_key".to_string(),
            key_secret: "test_key_secret".to_string(),
            webhook_secret: webhook_secret.map(str::to_string),
        })
        .unwrap()
    }

    fn claims(signature: &str) -> RedirectClaims {
        RedirectClaims {
            order_id: "REG-1".to_string(),
            gateway: GatewayKind::Razorpay,
            gateway_order_id: "order_abc".to_string(),
            gateway_payment_id: "pay_xyz".to_string(),
            signature: signature.to_string(),
        }
    }

    #[test]
    fn paise_conversion_round_trips() {
        let amount = Amount::new(dec!(499.50)).unwrap();
        let paise = to_paise(amount).unwrap();
        assert_eq!(paise, 49950);
        assert_eq!(from_paise(paise).unwrap(), amount);
    }

    #[test]
    fn redirect_signature_accepts_the_vendor_scheme() {
        let gw = gateway(None);
        let expected =
            RazorpayGateway::sign_hex("test_key_secret", b"order_abc|pay_xyz").unwrap();
        assert!(gw.verify_redirect_signature(&claims(&expected)));
    }

    #[test]
    fn redirect_signature_rejects_mismatch() {
        let gw = gateway(None);
        let forged = RazorpayGateway::sign_hex("wrong_secret", b"order_abc|pay_xyz").unwrap();
        assert!(!gw.verify_redirect_signature(&claims(&forged)));
        assert!(!gw.verify_redirect_signature(&claims("not-hex-at-all")));
    }

    #[test]
    fn webhook_signature_fails_closed_without_secret() {
        let gw = gateway(None);
        assert!(!gw.webhook_secret_configured());
        assert!(!gw.verify_webhook_signature(b"{}", "anything", None));
    }

    #[test]
    fn webhook_signature_detects_tampering() {
        let gw = gateway(Some("whsec"));
        let body = br#"{"event":"payment.captured"}"#;
        let signature = RazorpayGateway::sign_hex("whsec", body).unwrap();
        assert!(gw.verify_webhook_signature(body, &signature, None));

        let tampered = br#"{"event":"payment.captured "}"#;
        assert!(!gw.verify_webhook_signature(tampered, &signature, None));
    }

    #[test]
    fn capture_event_is_normalized() {
        let gw = gateway(None);
        let body = serde_json::to_vec(&json!({
            "event": "payment.captured",
            "payload": {
                "payment": {
                    "entity": {
                        "id": "pay_xyz",
                        "order_id": "order_abc",
                        "amount": 50000,
                        "method": "upi",
                        "notes": {"order_id": "REG-1"},
                    }
                }
            }
        }))
        .unwrap();

        let event = gw.parse_webhook_event(&body).unwrap();
        assert_eq!(event.kind, WebhookEventKind::PaymentCaptured);
        assert_eq!(event.order_id.as_deref(), Some("REG-1"));
        assert_eq!(event.gateway_order_id.as_deref(), Some("order_abc"));
        assert_eq!(event.gateway_payment_id.as_deref(), Some("pay_xyz"));
        assert_eq!(event.amount, Some(Amount::new(dec!(500)).unwrap()));
    }

    #[test]
    fn notes_may_be_missing() {
        let gw = gateway(None);
        let body = serde_json::to_vec(&json!({
            "event": "payment.failed",
            "payload": {
                "payment": {
                    "entity": {
                        "id": "pay_xyz",
                        "order_id": "order_abc",
                        "error_description": "card declined",
                    }
                }
            }
        }))
        .unwrap();

        let event = gw.parse_webhook_event(&body).unwrap();
        assert_eq!(event.kind, WebhookEventKind::PaymentFailed);
        assert_eq!(event.order_id, None);
        assert_eq!(event.failure_reason.as_deref(), Some("card declined"));
    }

    #[test]
    fn unrelated_events_pass_through_as_other() {
        let gw = gateway(None);
        let body = br#"{"event":"refund.processed"}"#;
        let event = gw.parse_webhook_event(body).unwrap();
        assert!(matches!(event.kind, WebhookEventKind::Other(_)));
    }
}

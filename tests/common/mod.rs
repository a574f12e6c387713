#![allow(dead_code)]

use async_trait::async_trait;
use confpay::domain::order::{Amount, Customer, GatewayKind, OrderRecord};
use confpay::domain::ports::{
    Notifier, PaymentDetails, PaymentGateway, PaymentSession, RedirectClaims, WebhookEvent,
    WebhookEventKind,
};
use confpay::domain::sponsorship::SponsorshipApplication;
use confpay::error::{Error, Result};
use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use serde::Deserialize;
use sha2::Sha256;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

type HmacSha256 = Hmac<Sha256>;

pub fn sign_hex(secret: &str, payload: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac accepts any key");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

pub const REDIRECT_SECRET: &str = "mock_redirect_secret";
pub const WEBHOOK_SECRET: &str = "mock_webhook_secret";

/// Test double standing in for a vendor adapter. Signatures use the same
/// HMAC-SHA256 scheme as the real integrations; the webhook payload is a
/// flat JSON shape owned by the tests.
pub struct MockGateway {
    kind: GatewayKind,
    webhook_secret: Option<String>,
    payments: Mutex<HashMap<String, PaymentDetails>>,
}

impl MockGateway {
    pub fn new(kind: GatewayKind) -> Self {
        Self {
            kind,
            webhook_secret: Some(WEBHOOK_SECRET.to_string()),
            payments: Mutex::new(HashMap::new()),
        }
    }

    pub fn without_webhook_secret(kind: GatewayKind) -> Self {
        Self {
            webhook_secret: None,
            ..Self::new(kind)
        }
    }

    /// Registers the authoritative payment record `fetch_payment` will serve.
    pub fn set_payment(&self, payment_id: &str, captured: bool, amount: Decimal) {
        self.payments.lock().unwrap().insert(
            payment_id.to_string(),
            PaymentDetails {
                captured,
                status: if captured { "captured" } else { "failed" }.to_string(),
                amount: Amount::new(amount).unwrap(),
                method: Some("card".to_string()),
                gateway_order_id: None,
            },
        );
    }

    pub fn redirect_signature(gateway_order_id: &str, gateway_payment_id: &str) -> String {
        sign_hex(
            REDIRECT_SECRET,
            format!("{gateway_order_id}|{gateway_payment_id}").as_bytes(),
        )
    }

    pub fn webhook_signature(body: &[u8]) -> String {
        sign_hex(WEBHOOK_SECRET, body)
    }
}

#[derive(Deserialize)]
struct MockWebhookBody {
    event: String,
    #[serde(default)]
    order_id: Option<String>,
    #[serde(default)]
    gateway_order_id: Option<String>,
    #[serde(default)]
    payment_id: Option<String>,
    #[serde(default)]
    amount: Option<Decimal>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    reason: Option<String>,
}

#[async_trait]
impl PaymentGateway for MockGateway {
    fn kind(&self) -> GatewayKind {
        self.kind
    }

    async fn create_session(&self, order: &OrderRecord) -> Result<PaymentSession> {
        Ok(PaymentSession {
            gateway_order_id: format!("mock_{}", order.order_id),
            payment_handle: "mock_session".to_string(),
        })
    }

    async fn fetch_payment(&self, gateway_payment_id: &str) -> Result<PaymentDetails> {
        self.payments
            .lock()
            .unwrap()
            .get(gateway_payment_id)
            .cloned()
            .ok_or_else(|| Error::GatewayRejected {
                description: format!("unknown payment {gateway_payment_id}"),
            })
    }

    fn verify_redirect_signature(&self, claims: &RedirectClaims) -> bool {
        let expected =
            Self::redirect_signature(&claims.gateway_order_id, &claims.gateway_payment_id);
        expected == claims.signature
    }

    fn webhook_secret_configured(&self) -> bool {
        self.webhook_secret.is_some()
    }

    fn verify_webhook_signature(
        &self,
        raw_body: &[u8],
        signature: &str,
        _timestamp: Option<&str>,
    ) -> bool {
        match self.webhook_secret.as_deref() {
            Some(secret) => sign_hex(secret, raw_body) == signature,
            None => false,
        }
    }

    fn parse_webhook_event(&self, raw_body: &[u8]) -> Result<WebhookEvent> {
        let body: MockWebhookBody = serde_json::from_slice(raw_body)
            .map_err(|err| Error::MalformedPayload(err.to_string()))?;
        let kind = match body.event.as_str() {
            "captured" => WebhookEventKind::PaymentCaptured,
            "failed" => WebhookEventKind::PaymentFailed,
            other => WebhookEventKind::Other(other.to_string()),
        };
        Ok(WebhookEvent {
            kind,
            order_id: body.order_id,
            gateway_order_id: body.gateway_order_id,
            gateway_payment_id: body.payment_id,
            amount: body.amount.map(Amount::new).transpose()?,
            method: body.method,
            failure_reason: body.reason,
        })
    }
}

/// Counts dispatches so tests can assert the at-most-once guarantee.
#[derive(Default)]
pub struct RecordingNotifier {
    completions: AtomicUsize,
    submissions: AtomicUsize,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn completions(&self) -> usize {
        self.completions.load(Ordering::SeqCst)
    }

    pub fn submissions(&self) -> usize {
        self.submissions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn order_completed(&self, _order: &OrderRecord) -> Result<()> {
        self.completions.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn application_received(&self, _application: &SponsorshipApplication) -> Result<()> {
        self.submissions.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// A notifier that always fails, for checking containment.
pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn order_completed(&self, _order: &OrderRecord) -> Result<()> {
        Err(Error::Store("smtp relay down".to_string()))
    }

    async fn application_received(&self, _application: &SponsorshipApplication) -> Result<()> {
        Err(Error::Store("smtp relay down".to_string()))
    }
}

pub fn order(order_id: &str, gateway: GatewayKind, amount: Decimal) -> OrderRecord {
    OrderRecord::new(
        order_id.to_string(),
        gateway,
        Amount::new(amount).unwrap(),
        Customer {
            name: "Asha Patel".to_string(),
            email: "asha@example.com".to_string(),
            phone: "9876543210".to_string(),
        },
    )
}

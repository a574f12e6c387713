use super::order::{
    Amount, CompletionDetails, CompletionOutcome, GatewayKind, OrderRecord,
};
use super::sponsorship::{ListFilter, ReviewUpdate, SponsorshipApplication};
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

pub type OrderStoreRef = Arc<dyn OrderStore>;
pub type SponsorshipStoreRef = Arc<dyn SponsorshipStore>;
pub type GatewayRef = Arc<dyn PaymentGateway>;
pub type NotifierRef = Arc<dyn Notifier>;

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn insert(&self, order: OrderRecord) -> Result<()>;
    async fn get(&self, order_id: &str) -> Result<Option<OrderRecord>>;
    async fn find_by_gateway_order_id(
        &self,
        gateway_order_id: &str,
    ) -> Result<Option<OrderRecord>>;
    async fn attach_session(
        &self,
        order_id: &str,
        gateway_order_id: &str,
    ) -> Result<Option<OrderRecord>>;

    /// Atomic conditional transition to `Completed`: the status check and the
    /// write happen in one store-level critical section, so two racing
    /// delivery paths cannot both observe `Applied`.
    async fn complete_if_pending(
        &self,
        order_id: &str,
        details: CompletionDetails,
    ) -> Result<Option<CompletionOutcome>>;

    /// Records a failure with its reason. Idempotent from `Failed`; a no-op
    /// returning the unchanged record once `Completed`.
    async fn mark_failed(&self, order_id: &str, reason: &str) -> Result<Option<OrderRecord>>;
}

#[async_trait]
pub trait SponsorshipStore: Send + Sync {
    async fn insert(&self, application: SponsorshipApplication) -> Result<()>;
    async fn get(&self, id: &str) -> Result<Option<SponsorshipApplication>>;

    /// Uniqueness precondition query: a record with this (email, company)
    /// pair in a non-terminal-negative state.
    async fn find_active_duplicate(
        &self,
        email: &str,
        company_name: &str,
    ) -> Result<Option<SponsorshipApplication>>;

    /// Newest-first page of matching records plus the total match count.
    async fn list(
        &self,
        filter: &ListFilter,
        skip: usize,
        limit: usize,
    ) -> Result<(Vec<SponsorshipApplication>, usize)>;

    async fn update_review(
        &self,
        id: &str,
        update: ReviewUpdate,
    ) -> Result<Option<SponsorshipApplication>>;

    async fn delete(&self, id: &str) -> Result<bool>;
}

/// What the payer's browser needs to reach the gateway's checkout:
/// the Razorpay key id, or the Cashfree payment session id.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentSession {
    pub gateway_order_id: String,
    pub payment_handle: String,
}

/// Authoritative payment state as fetched from the gateway. Callers must
/// prefer this over any client-supplied claim.
#[derive(Debug, Clone)]
pub struct PaymentDetails {
    pub captured: bool,
    pub status: String,
    pub amount: Amount,
    pub method: Option<String>,
    pub gateway_order_id: Option<String>,
}

/// Identifiers asserted by the payer's browser after returning from the
/// gateway's hosted page. Trustworthy only once the signature is verified,
/// and even then the signature covers only the identifiers.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedirectClaims {
    pub order_id: String,
    pub gateway: GatewayKind,
    pub gateway_order_id: String,
    pub gateway_payment_id: String,
    pub signature: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WebhookEventKind {
    PaymentCaptured,
    PaymentFailed,
    Other(String),
}

/// Vendor webhook payload normalized to what reconciliation needs. The
/// application order id may be absent when the gateway configuration does not
/// round-trip custom metadata; resolution then falls back to
/// `gateway_order_id`.
#[derive(Debug, Clone)]
pub struct WebhookEvent {
    pub kind: WebhookEventKind,
    pub order_id: Option<String>,
    pub gateway_order_id: Option<String>,
    pub gateway_payment_id: Option<String>,
    pub amount: Option<Amount>,
    pub method: Option<String>,
    pub failure_reason: Option<String>,
}

/// One implementation per integrated gateway. Stateless; callers own
/// idempotency.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    fn kind(&self) -> GatewayKind;

    /// Opens a payment session for the order. Fails fast with
    /// `Error::Configuration` on absent/malformed credentials, never
    /// attempting the call.
    async fn create_session(&self, order: &OrderRecord) -> Result<PaymentSession>;

    /// Authoritative read-through of a captured or attempted payment.
    async fn fetch_payment(&self, gateway_payment_id: &str) -> Result<PaymentDetails>;

    /// Recomputes the vendor signature over the claim identifiers and
    /// compares in constant time. False on any mismatch or missing secret.
    fn verify_redirect_signature(&self, claims: &RedirectClaims) -> bool;

    /// Whether a webhook secret is configured. When false the webhook path
    /// must skip verification explicitly, never silently.
    fn webhook_secret_configured(&self) -> bool;

    /// Verifies the vendor signature over the exact bytes received. False on
    /// any mismatch or missing secret.
    fn verify_webhook_signature(
        &self,
        raw_body: &[u8],
        signature: &str,
        timestamp: Option<&str>,
    ) -> bool;

    /// Parses and normalizes the vendor event payload. Only called after the
    /// signature gate.
    fn parse_webhook_event(&self, raw_body: &[u8]) -> Result<WebhookEvent>;
}

/// Registry of configured gateway adapters, keyed by their kind.
#[derive(Clone, Default)]
pub struct Gateways {
    inner: HashMap<GatewayKind, GatewayRef>,
}

impl Gateways {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, gateway: GatewayRef) {
        self.inner.insert(gateway.kind(), gateway);
    }

    pub fn get(&self, kind: GatewayKind) -> Result<&GatewayRef> {
        self.inner.get(&kind).ok_or_else(|| {
            Error::Configuration(format!("no {kind} gateway adapter is configured"))
        })
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// Outbound confirmation messages. Failures are contained by callers: the
/// state transition that triggered a notification is already durable and is
/// never rolled back over a messaging error.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn order_completed(&self, order: &OrderRecord) -> Result<()>;
    async fn application_received(&self, application: &SponsorshipApplication) -> Result<()>;
}

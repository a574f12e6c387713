use crate::domain::order::{Amount, CompletionDetails, CompletionOutcome, GatewayKind, OrderRecord};
use crate::domain::ports::{
    Gateways, NotifierRef, OrderStoreRef, RedirectClaims, WebhookEvent, WebhookEventKind,
};
use crate::error::{Error, Result};
use tracing::{debug, error, info, warn};

/// Signature material extracted from webhook request headers. Which headers
/// carry it differs by vendor; the HTTP layer does that mapping.
#[derive(Debug, Clone, Default)]
pub struct WebhookHeaders {
    pub signature: Option<String>,
    pub timestamp: Option<String>,
}

/// How a webhook delivery was disposed of. Every variant is acknowledged with
/// a success response; a non-2xx would make the gateway retry indefinitely.
#[derive(Debug, Clone)]
pub enum WebhookOutcome {
    Completed(OrderRecord),
    AlreadyCompleted(OrderRecord),
    FailureRecorded(OrderRecord),
    /// Correctly signed but referencing no known order. Logged and treated as
    /// permanently unmatched; no record is created.
    Unmatched,
    /// An event type reconciliation does not act on.
    Ignored,
}

/// The core state machine: resolves inbound payment signals (redirect
/// verification or webhook) to exactly one order record and applies an
/// idempotent transition.
///
/// `Created -> {Completed, Failed}`; `Failed -> Completed` is the only
/// re-entrant transition, covering a retried payment that later succeeds.
pub struct ReconciliationEngine {
    orders: OrderStoreRef,
    gateways: Gateways,
    notifier: NotifierRef,
}

impl ReconciliationEngine {
    pub fn new(orders: OrderStoreRef, gateways: Gateways, notifier: NotifierRef) -> Self {
        Self {
            orders,
            gateways,
            notifier,
        }
    }

    /// Redirect-driven verification. The signature gate is the only thing
    /// standing between this path and a forged completion claim, so it runs
    /// before anything else; the payment record is then re-fetched from the
    /// gateway because the signature covers only the identifier triple.
    pub async fn reconcile_from_redirect(&self, claims: &RedirectClaims) -> Result<OrderRecord> {
        let gateway = self.gateways.get(claims.gateway)?;

        if !gateway.verify_redirect_signature(claims) {
            warn!(
                order_id = %claims.order_id,
                gateway = %claims.gateway,
                gateway_order_id = %claims.gateway_order_id,
                "redirect verification rejected: invalid signature"
            );
            return Err(Error::AuthenticationFailed);
        }

        let order = self
            .orders
            .get(&claims.order_id)
            .await?
            .ok_or_else(|| Error::OrderNotFound(claims.order_id.clone()))?;

        let payment = gateway.fetch_payment(&claims.gateway_payment_id).await?;
        if !payment.captured {
            return Err(Error::GatewayRejected {
                description: format!("payment is not captured (status: {})", payment.status),
            });
        }

        let (record, _) = self
            .apply_completion(
                &order,
                claims.gateway_payment_id.clone(),
                payment.amount,
                payment.method,
            )
            .await?;
        Ok(record)
    }

    /// Asynchronous server-to-server webhook. The signature is verified over
    /// the exact bytes received, before any parsing.
    pub async fn reconcile_from_webhook(
        &self,
        kind: GatewayKind,
        raw_body: &[u8],
        headers: &WebhookHeaders,
    ) -> Result<WebhookOutcome> {
        let gateway = self.gateways.get(kind)?;

        if gateway.webhook_secret_configured() {
            let Some(signature) = headers.signature.as_deref() else {
                warn!(gateway = %kind, "webhook rejected: missing signature header");
                return Err(Error::AuthenticationFailed);
            };
            if !gateway.verify_webhook_signature(raw_body, signature, headers.timestamp.as_deref())
            {
                warn!(gateway = %kind, "webhook rejected: invalid signature");
                return Err(Error::AuthenticationFailed);
            }
        } else {
            // Deliberate, visible skip. The adapter itself fails closed, so
            // an unconfigured secret can never look like a valid signature.
            warn!(
                gateway = %kind,
                "webhook signature verification skipped: no webhook secret configured"
            );
        }

        let event = gateway.parse_webhook_event(raw_body)?;
        match event.kind {
            WebhookEventKind::PaymentCaptured => self.handle_captured(kind, event).await,
            WebhookEventKind::PaymentFailed => self.handle_failed(kind, event).await,
            WebhookEventKind::Other(name) => {
                debug!(gateway = %kind, event = %name, "acknowledging unhandled webhook event");
                Ok(WebhookOutcome::Ignored)
            }
        }
    }

    async fn handle_captured(
        &self,
        kind: GatewayKind,
        event: WebhookEvent,
    ) -> Result<WebhookOutcome> {
        let Some(order) = self.resolve_order(&event).await? else {
            warn!(
                gateway = %kind,
                order_id = ?event.order_id,
                gateway_order_id = ?event.gateway_order_id,
                "capture webhook references no known order, acknowledging without retry"
            );
            return Ok(WebhookOutcome::Unmatched);
        };

        let gateway_payment_id = event.gateway_payment_id.ok_or_else(|| {
            Error::MalformedPayload("capture event is missing the payment id".to_string())
        })?;
        let amount = event.amount.ok_or_else(|| {
            Error::MalformedPayload("capture event is missing the amount".to_string())
        })?;

        let (record, applied) = self
            .apply_completion(&order, gateway_payment_id, amount, event.method)
            .await?;
        if applied {
            Ok(WebhookOutcome::Completed(record))
        } else {
            Ok(WebhookOutcome::AlreadyCompleted(record))
        }
    }

    async fn handle_failed(&self, kind: GatewayKind, event: WebhookEvent) -> Result<WebhookOutcome> {
        let Some(order) = self.resolve_order(&event).await? else {
            warn!(
                gateway = %kind,
                order_id = ?event.order_id,
                gateway_order_id = ?event.gateway_order_id,
                "failure webhook references no known order, acknowledging without retry"
            );
            return Ok(WebhookOutcome::Unmatched);
        };

        let reason = event
            .failure_reason
            .unwrap_or_else(|| "payment failed".to_string());
        match self.orders.mark_failed(&order.order_id, &reason).await? {
            Some(record) => {
                info!(
                    order_id = %record.order_id,
                    gateway = %kind,
                    reason = %reason,
                    "payment failure recorded"
                );
                Ok(WebhookOutcome::FailureRecorded(record))
            }
            None => Ok(WebhookOutcome::Unmatched),
        }
    }

    /// Resolution order honors the vendor quirk: the application-assigned id
    /// first (from notes/metadata), then the gateway's own order id.
    async fn resolve_order(&self, event: &WebhookEvent) -> Result<Option<OrderRecord>> {
        if let Some(order_id) = &event.order_id
            && let Some(order) = self.orders.get(order_id).await?
        {
            return Ok(Some(order));
        }
        if let Some(gateway_order_id) = &event.gateway_order_id {
            return self.orders.find_by_gateway_order_id(gateway_order_id).await;
        }
        Ok(None)
    }

    /// Cross-checks the gateway-reported amount, then performs the atomic
    /// conditional transition. Exactly one of any number of racing callers
    /// observes `Applied` and dispatches the completion notification; the
    /// notification failure is contained here and never unwinds the
    /// transition.
    async fn apply_completion(
        &self,
        order: &OrderRecord,
        gateway_payment_id: String,
        reported_amount: Amount,
        method: Option<String>,
    ) -> Result<(OrderRecord, bool)> {
        if reported_amount != order.amount {
            error!(
                order_id = %order.order_id,
                expected = %order.amount,
                reported = %reported_amount,
                "amount mismatch on completion signal, flagging for manual review"
            );
            return Err(Error::AmountMismatch {
                expected: order.amount.value(),
                reported: reported_amount.value(),
            });
        }

        let outcome = self
            .orders
            .complete_if_pending(
                &order.order_id,
                CompletionDetails {
                    gateway_payment_id,
                    payment_method: method,
                },
            )
            .await?
            .ok_or_else(|| Error::OrderNotFound(order.order_id.clone()))?;

        match outcome {
            CompletionOutcome::Applied(record) => {
                info!(
                    order_id = %record.order_id,
                    gateway = %record.gateway,
                    gateway_payment_id = ?record.gateway_payment_id,
                    "order completed"
                );
                if let Err(err) = self.notifier.order_completed(&record).await {
                    warn!(
                        order_id = %record.order_id,
                        error = %err,
                        "completion notification failed, payment state is unaffected"
                    );
                }
                Ok((record, true))
            }
            CompletionOutcome::AlreadyCompleted(record) => {
                debug!(
                    order_id = %record.order_id,
                    "duplicate completion signal, no-op"
                );
                Ok((record, false))
            }
        }
    }
}

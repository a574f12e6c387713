use crate::error::Error;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A positive monetary amount in the event currency.
///
/// Wraps `rust_decimal::Decimal` so amounts are exact and comparisons against
/// gateway-reported values never go through floating point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Serialize, Deserialize)]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self, Error> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(Error::invalid_field("amount", "amount must be positive"))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = Error;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Which payment gateway owns an order's session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayKind {
    Razorpay,
    Cashfree,
}

impl GatewayKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GatewayKind::Razorpay => "razorpay",
            GatewayKind::Cashfree => "cashfree",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "razorpay" => Some(GatewayKind::Razorpay),
            "cashfree" => Some(GatewayKind::Cashfree),
            _ => None,
        }
    }
}

impl fmt::Display for GatewayKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Created,
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub name: String,
    pub email: String,
    pub phone: String,
}

/// Durable record of one payment attempt, from session creation to terminal
/// outcome. `order_id` is the correlation key across both gateways.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRecord {
    pub order_id: String,
    pub gateway: GatewayKind,
    pub gateway_order_id: Option<String>,
    pub gateway_payment_id: Option<String>,
    pub amount: Amount,
    pub status: OrderStatus,
    pub customer: Customer,
    pub payment_method: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields applied when an order transitions to `Completed`.
#[derive(Debug, Clone)]
pub struct CompletionDetails {
    pub gateway_payment_id: String,
    pub payment_method: Option<String>,
}

/// Result of the store-level conditional completion update.
#[derive(Debug, Clone)]
pub enum CompletionOutcome {
    /// This caller performed the transition and owns the side effects.
    Applied(OrderRecord),
    /// The record was already `Completed`; duplicate signal, no-op.
    AlreadyCompleted(OrderRecord),
}

impl OrderRecord {
    pub fn new(order_id: String, gateway: GatewayKind, amount: Amount, customer: Customer) -> Self {
        Self {
            order_id,
            gateway,
            gateway_order_id: None,
            gateway_payment_id: None,
            amount,
            status: OrderStatus::Created,
            customer,
            payment_method: None,
            completed_at: None,
            failure_reason: None,
            created_at: Utc::now(),
        }
    }

    /// Applies the completion transition. Callers must have already checked
    /// the current status; stores do this inside their critical section.
    pub fn complete(&mut self, details: CompletionDetails) {
        self.status = OrderStatus::Completed;
        self.gateway_payment_id = Some(details.gateway_payment_id);
        self.payment_method = details.payment_method;
        self.completed_at = Some(Utc::now());
        self.failure_reason = None;
    }

    /// Records a failure. `Failed -> Failed` overwrites the reason; the
    /// transition is refused once the order is `Completed`.
    pub fn fail(&mut self, reason: &str) -> bool {
        if self.status == OrderStatus::Completed {
            return false;
        }
        self.status = OrderStatus::Failed;
        self.failure_reason = Some(reason.to_string());
        true
    }
}

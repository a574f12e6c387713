use crate::domain::order::{Amount, Customer, GatewayKind, OrderRecord};
use crate::domain::ports::{Gateways, OrderStoreRef, PaymentSession};
use crate::domain::sponsorship::{is_valid_email, is_valid_phone};
use crate::error::{Error, FieldErrors, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRegistration {
    pub gateway: GatewayKind,
    pub amount: Decimal,
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub customer_email: String,
    #[serde(default)]
    pub customer_phone: String,
}

impl NewRegistration {
    fn validate(&self) -> Result<Amount> {
        let mut errors = FieldErrors::new();
        let mut push = |field: &str, message: &str| {
            errors
                .entry(field.to_string())
                .or_default()
                .push(message.to_string());
        };

        if self.customer_name.trim().is_empty() {
            push("customerName", "is required");
        }
        if !is_valid_email(&self.customer_email) {
            push("customerEmail", "invalid email address");
        }
        if !is_valid_phone(&self.customer_phone) {
            push("customerPhone", "invalid phone number");
        }

        let amount = Amount::new(self.amount);
        if amount.is_err() {
            push("amount", "amount must be positive");
        }

        if errors.is_empty() {
            amount
        } else {
            Err(Error::Validation(errors))
        }
    }
}

/// Creates order records and opens gateway payment sessions. The only other
/// writer of order state is the reconciliation engine.
pub struct RegistrationService {
    orders: OrderStoreRef,
    gateways: Gateways,
}

impl RegistrationService {
    pub fn new(orders: OrderStoreRef, gateways: Gateways) -> Self {
        Self { orders, gateways }
    }

    /// Persists a `Created` order, then opens the gateway session and
    /// attaches the gateway's order id. A session failure leaves the record
    /// in `Created` so the payer can retry against the same order.
    pub async fn create_order(
        &self,
        request: NewRegistration,
    ) -> Result<(OrderRecord, PaymentSession)> {
        let amount = request.validate()?;
        let order = OrderRecord::new(
            format!("REG-{}", Uuid::new_v4().simple()),
            request.gateway,
            amount,
            Customer {
                name: request.customer_name,
                email: request.customer_email,
                phone: request.customer_phone,
            },
        );
        self.open_session(order).await
    }

    /// Manual test session with placeholder customer data, for verifying a
    /// gateway integration end to end without a real registrant.
    pub async fn create_test_order(
        &self,
        gateway: GatewayKind,
        amount: Option<Decimal>,
    ) -> Result<(OrderRecord, PaymentSession)> {
        let amount = Amount::new(amount.unwrap_or(dec!(100)))?;
        let order = OrderRecord::new(
            format!("TEST-{}", Uuid::new_v4().simple()),
            gateway,
            amount,
            Customer {
                name: "Test User".to_string(),
                email: "testuser@example.com".to_string(),
                phone: "9999999999".to_string(),
            },
        );
        self.open_session(order).await
    }

    async fn open_session(&self, order: OrderRecord) -> Result<(OrderRecord, PaymentSession)> {
        let gateway = self.gateways.get(order.gateway)?;
        self.orders.insert(order.clone()).await?;

        let session = gateway.create_session(&order).await?;
        let order = self
            .orders
            .attach_session(&order.order_id, &session.gateway_order_id)
            .await?
            .unwrap_or(order);

        info!(
            order_id = %order.order_id,
            gateway = %order.gateway,
            gateway_order_id = %session.gateway_order_id,
            amount = %order.amount,
            "payment session opened"
        );
        Ok((order, session))
    }
}

use rust_decimal::Decimal;
use std::collections::BTreeMap;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Field name -> list of messages, returned to callers on structural
/// validation failure.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

#[derive(Error, Debug)]
pub enum Error {
    /// Missing or malformed credentials. Fatal, never retried.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Missing or invalid signature on an inbound payment claim.
    #[error("payment signature verification failed")]
    AuthenticationFailed,

    /// The gateway declined the request.
    #[error("gateway rejected the request: {description}")]
    GatewayRejected { description: String },

    /// Transport-level failure reaching the gateway. Retryable.
    #[error("gateway unreachable: {0}")]
    GatewayUnavailable(String),

    #[error("order {0} not found")]
    OrderNotFound(String),

    #[error("sponsorship application {0} not found")]
    ApplicationNotFound(String),

    /// The gateway's reported amount disagrees with the stored order.
    /// Flagged for manual review, never auto-resolved.
    #[error("reported amount {reported} does not match order amount {expected}")]
    AmountMismatch {
        expected: Decimal,
        reported: Decimal,
    },

    #[error("validation failed")]
    Validation(FieldErrors),

    /// A matching application already exists in a non-terminal state.
    #[error("duplicate application, existing id {existing_id}")]
    Conflict { existing_id: String },

    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("store error: {0}")]
    Store(String),
}

impl Error {
    /// Single-field validation failure.
    pub fn invalid_field(field: &str, message: &str) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.to_string(), vec![message.to_string()]);
        Error::Validation(errors)
    }
}

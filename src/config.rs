//! Environment-driven configuration.
//!
//! Gateway credentials are validated eagerly so a misconfigured deployment
//! fails at startup instead of at the first payment attempt.

use crate::error::{Error, Result};
use std::env;

/// Razorpay publishable key ids carry this prefix in every environment.
const RAZORPAY_KEY_PREFIX: &str = "rzp_";

#[derive(Debug, Clone)]
pub struct RazorpayConfig {
    pub key_id: String,
    pub key_secret: String,
    /// Absent means webhook signature checks are skipped, explicitly and
    /// loudly, on the webhook path.
    pub webhook_secret: Option<String>,
}

impl RazorpayConfig {
    pub fn validate(&self) -> Result<()> {
        if self.key_id.is_empty() || self.key_secret.is_empty() {
            return Err(Error::Configuration(
                "razorpay credentials are not configured".to_string(),
            ));
        }
        if !self.key_id.starts_with(RAZORPAY_KEY_PREFIX) {
            return Err(Error::Configuration(format!(
                "razorpay key id must start with '{RAZORPAY_KEY_PREFIX}'"
            )));
        }
        Ok(())
    }

    fn from_env() -> Result<Option<Self>> {
        let key_id = env::var("RAZORPAY_KEY_ID").ok();
        let key_secret = env::var("RAZORPAY_KEY_SECRET").ok();
        match (key_id, key_secret) {
            (None, None) => Ok(None),
            (key_id, key_secret) => {
                let config = Self {
                    key_id: key_id.unwrap_or_default(),
                    key_secret: key_secret.unwrap_or_default(),
                    webhook_secret: env::var("RAZORPAY_WEBHOOK_SECRET").ok(),
                };
                config.validate()?;
                Ok(Some(config))
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct CashfreeConfig {
    pub app_id: String,
    pub secret_key: String,
    pub webhook_secret: Option<String>,
    pub sandbox: bool,
}

impl CashfreeConfig {
    pub fn validate(&self) -> Result<()> {
        if self.app_id.is_empty() || self.secret_key.is_empty() {
            return Err(Error::Configuration(
                "cashfree credentials are not configured".to_string(),
            ));
        }
        Ok(())
    }

    pub fn base_url(&self) -> &'static str {
        if self.sandbox {
            "https://sandbox.cashfree.com"
        } else {
            "https://api.cashfree.com"
        }
    }

    fn from_env() -> Result<Option<Self>> {
        let app_id = env::var("CASHFREE_APP_ID").ok();
        let secret_key = env::var("CASHFREE_SECRET_KEY").ok();
        match (app_id, secret_key) {
            (None, None) => Ok(None),
            (app_id, secret_key) => {
                let config = Self {
                    app_id: app_id.unwrap_or_default(),
                    secret_key: secret_key.unwrap_or_default(),
                    webhook_secret: env::var("CASHFREE_WEBHOOK_SECRET").ok(),
                    sandbox: env::var("CASHFREE_ENV")
                        .map(|v| v.eq_ignore_ascii_case("sandbox"))
                        .unwrap_or(true),
                };
                config.validate()?;
                Ok(Some(config))
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub razorpay: Option<RazorpayConfig>,
    pub cashfree: Option<CashfreeConfig>,
    /// Public base URL of this deployment, used for gateway return/notify URLs.
    pub public_base_url: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            razorpay: RazorpayConfig::from_env()?,
            cashfree: CashfreeConfig::from_env()?,
            public_base_url: env::var("APP_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
        })
    }
}

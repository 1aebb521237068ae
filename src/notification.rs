//! Authenticity checks for inbound payment notifications (IPN)

use crate::crypto::{verify_hmac_sha512_hex, verify_sha256_hex};
use crate::{CoinPaymentsError, Result};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::debug;

/// Validates signatures attached to inbound notifications
#[derive(Clone)]
pub struct NotificationValidator {
    merchant_api_key: String,
    ipn_secret: Option<String>,
}

impl std::fmt::Debug for NotificationValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationValidator")
            .field("merchant_api_key", &"<redacted>")
            .field("ipn_secret", &self.ipn_secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl NotificationValidator {
    /// Create a validator for the given merchant API key
    pub fn new(merchant_api_key: impl Into<String>) -> Self {
        Self {
            merchant_api_key: merchant_api_key.into(),
            ipn_secret: None,
        }
    }

    /// Read `COINPAYMENTS_MERCHANT_API_KEY` and optional `COINPAYMENTS_IPN_SECRET`
    pub fn from_env() -> Result<Self> {
        let merchant_api_key = std::env::var("COINPAYMENTS_MERCHANT_API_KEY").map_err(|_| {
            CoinPaymentsError::config("Environment variable COINPAYMENTS_MERCHANT_API_KEY not found")
        })?;

        let validator = Self::new(merchant_api_key);
        Ok(match std::env::var("COINPAYMENTS_IPN_SECRET") {
            Ok(secret) => validator.with_ipn_secret(secret),
            Err(_) => validator,
        })
    }

    /// Set the IPN secret used for body HMAC checks
    pub fn with_ipn_secret(mut self, ipn_secret: impl Into<String>) -> Self {
        self.ipn_secret = Some(ipn_secret.into());
        self
    }

    /// The string whose SHA-256 a notification signature covers
    ///
    /// `<merchant_api_key>_<txn_id>_<price in cents><currency>`, with the
    /// price rounded half away from zero.
    pub fn canonical_string(&self, txn_id: &str, price: Decimal, currency: &str) -> Option<String> {
        let cents = price
            .checked_mul(Decimal::ONE_HUNDRED)?
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i128()?;

        Some(format!(
            "{}_{}_{}{}",
            self.merchant_api_key, txn_id, cents, currency
        ))
    }

    /// Check a notification's SHA-256 signature
    ///
    /// Always false while no merchant API key is configured.
    pub fn validate_signature(
        &self,
        txn_id: &str,
        price: Decimal,
        currency: &str,
        provided_signature: &str,
    ) -> bool {
        if self.merchant_api_key.is_empty() {
            debug!("notification check skipped: no merchant API key configured");
            return false;
        }

        let Some(canonical) = self.canonical_string(txn_id, price, currency) else {
            debug!(txn_id, "notification price out of range");
            return false;
        };

        let valid = verify_sha256_hex(canonical.as_bytes(), provided_signature);
        if !valid {
            debug!(txn_id, "notification signature mismatch");
        }
        valid
    }

    /// Check the `HMAC` header of an IPN POST against its raw body
    ///
    /// Always false while no IPN secret is configured.
    pub fn verify_ipn_hmac(&self, raw_body: &[u8], hmac_header: &str) -> bool {
        match &self.ipn_secret {
            Some(secret) if !secret.is_empty() => {
                let valid = verify_hmac_sha512_hex(secret.as_bytes(), raw_body, hmac_header);
                if !valid {
                    debug!("IPN body HMAC mismatch");
                }
                valid
            }
            _ => {
                debug!("IPN HMAC check skipped: no IPN secret configured");
                false
            }
        }
    }
}

//! PayFast web-checkout helper.
//!
//! Gateway orders are placed `pending`/`unpaid`; the frontend posts the
//! buyer to PayFast with the fields produced here and calls the capture
//! endpoint once the gateway confirms. The request is signed with a
//! SHA-256 hash over the merchant credentials, the amount, and the order
//! reference.

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use sha2::{Digest, Sha256};

use clementine_core::Price;

/// PayFast merchant configuration.
///
/// Defaults target the public sandbox; production deployments override
/// every field from the environment. Implements `Debug` manually to redact
/// the merchant password.
#[derive(Clone)]
pub struct PayfastConfig {
    pub merchant_id: String,
    pub merchant_password: SecretString,
    pub checkout_url: String,
    pub return_url: String,
    pub cancel_url: String,
    pub currency: String,
}

impl std::fmt::Debug for PayfastConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayfastConfig")
            .field("merchant_id", &self.merchant_id)
            .field("merchant_password", &"[REDACTED]")
            .field("checkout_url", &self.checkout_url)
            .field("return_url", &self.return_url)
            .field("cancel_url", &self.cancel_url)
            .field("currency", &self.currency)
            .finish()
    }
}

impl Default for PayfastConfig {
    fn default() -> Self {
        Self {
            merchant_id: "demo".to_owned(),
            merchant_password: SecretString::from("demo"),
            checkout_url: "https://sandbox.payfast.pk/merchant/web_checkout".to_owned(),
            return_url: "http://localhost:5173/shop/payfast-return".to_owned(),
            cancel_url: "http://localhost:5173/shop/payfast-cancel".to_owned(),
            currency: "PKR".to_owned(),
        }
    }
}

/// Fields the frontend posts to the PayFast web checkout.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub merchant_id: String,
    /// Amount formatted with exactly two decimals.
    pub amount: String,
    pub order_id: String,
    pub currency: String,
    pub description: String,
    pub return_url: String,
    pub cancel_url: String,
    pub secure_hash: String,
    /// Where the checkout form must be posted.
    pub post_url: String,
}

/// Builds signed PayFast checkout requests.
#[derive(Debug, Clone)]
pub struct PayfastClient {
    config: PayfastConfig,
}

impl PayfastClient {
    #[must_use]
    pub const fn new(config: PayfastConfig) -> Self {
        Self { config }
    }

    /// Build the signed web-checkout request for an order.
    #[must_use]
    pub fn payment_request(&self, amount: Price, order_id: &str) -> PaymentRequest {
        let amount = format!("{}", amount.round_dp(2));
        let secure_hash = self.secure_hash(&amount, order_id);

        PaymentRequest {
            merchant_id: self.config.merchant_id.clone(),
            amount,
            order_id: order_id.to_owned(),
            currency: self.config.currency.clone(),
            description: format!("Order {order_id}"),
            return_url: self.config.return_url.clone(),
            cancel_url: self.config.cancel_url.clone(),
            secure_hash,
            post_url: self.config.checkout_url.clone(),
        }
    }

    /// `SHA256(merchant_id & merchant_password & amount & order_id)` as
    /// lowercase hex.
    fn secure_hash(&self, amount: &str, order_id: &str) -> String {
        let payload = format!(
            "{}&{}&{}&{}",
            self.config.merchant_id,
            self.config.merchant_password.expose_secret(),
            amount,
            order_id
        );
        let digest = Sha256::digest(payload.as_bytes());
        let mut hex = String::with_capacity(digest.len() * 2);
        for byte in digest {
            use std::fmt::Write;
            let _ = write!(hex, "{byte:02x}");
        }
        hex
    }
}

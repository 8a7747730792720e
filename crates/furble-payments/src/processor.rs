//! Payment Processor
//!
//! The external side of a charge: create an intent, look up its status.

use async_trait::async_trait;
use std::str::FromStr;
use stripe::{Client, CreatePaymentIntent, Currency, PaymentIntent as StripePaymentIntent, PaymentIntentId};

use furble_core::AppConfig;

use crate::error::{PaymentError, Result};

/// Status string the processor reports for a completed charge
pub const STATUS_SUCCEEDED: &str = "succeeded";

/// A freshly created intent
#[derive(Clone, Debug)]
pub struct PaymentIntent {
    /// Processor reference (e.g. `pi_...`)
    pub reference: String,

    /// Secret the client uses to complete the charge
    pub client_secret: String,
}

/// Payment processor trait
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    /// Create an intent for `amount_cents` in `currency`
    async fn create_intent(&self, amount_cents: i64, currency: &str) -> Result<PaymentIntent>;

    /// Current status of an intent. Fails with `UnknownIntent` when the
    /// reference does not resolve.
    async fn retrieve_intent(&self, reference: &str) -> Result<String>;

    /// Processor name, for logs
    fn name(&self) -> &str;
}

/// Stripe-backed processor (card payments)
pub struct StripeProcessor {
    client: Client,
}

impl StripeProcessor {
    /// Create a new Stripe processor
    pub fn new(secret_key: &str) -> Self {
        Self {
            client: Client::new(secret_key),
        }
    }

    /// Build from the application config, if a Stripe key is present
    pub fn from_app_config(config: &AppConfig) -> Option<Self> {
        config.payment_api_key.as_deref().map(Self::new)
    }
}

#[async_trait]
impl PaymentProcessor for StripeProcessor {
    async fn create_intent(&self, amount_cents: i64, currency: &str) -> Result<PaymentIntent> {
        let currency = Currency::from_str(currency)
            .map_err(|e| PaymentError::Config(format!("unsupported currency '{currency}': {e}")))?;

        let mut params = CreatePaymentIntent::new(amount_cents, currency);
        params.payment_method_types = Some(vec!["card".to_string()]);

        let intent = StripePaymentIntent::create(&self.client, params)
            .await
            .map_err(|e| PaymentError::Stripe(e.to_string()))?;

        let client_secret = intent
            .client_secret
            .ok_or_else(|| PaymentError::Stripe("No client secret returned".into()))?;

        Ok(PaymentIntent {
            reference: intent.id.to_string(),
            client_secret,
        })
    }

    async fn retrieve_intent(&self, reference: &str) -> Result<String> {
        let id = PaymentIntentId::from_str(reference)
            .map_err(|e| PaymentError::UnknownIntent(format!("{reference}: {e}")))?;

        let intent = StripePaymentIntent::retrieve(&self.client, &id, &[])
            .await
            .map_err(|e| PaymentError::UnknownIntent(format!("{reference}: {e}")))?;

        Ok(intent.status.as_str().to_string())
    }

    fn name(&self) -> &str {
        "stripe"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_app_config_requires_key() {
        let config = AppConfig::from_lookup(|key| match key {
            "FURBLE_SECRET_KEY" => Some("secret".into()),
            _ => None,
        })
        .unwrap();
        assert!(StripeProcessor::from_app_config(&config).is_none());
    }
}

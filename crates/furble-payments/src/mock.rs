//! Mock Payment Processor
//!
//! For tests and local runs without a Stripe account. Intents start out as
//! `requires_payment_method`; tests move them along with [`MockPaymentProcessor::set_status`].

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

use crate::processor::{PaymentIntent, PaymentProcessor};
use crate::error::{PaymentError, Result};

/// In-memory processor with scriptable intent statuses
pub struct MockPaymentProcessor {
    intents: RwLock<HashMap<String, String>>,
    counter: AtomicUsize,
    fail_create: bool,
}

impl Default for MockPaymentProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPaymentProcessor {
    pub fn new() -> Self {
        Self {
            intents: RwLock::new(HashMap::new()),
            counter: AtomicUsize::new(0),
            fail_create: false,
        }
    }

    /// A processor whose intent creation always fails
    pub fn failing() -> Self {
        Self {
            fail_create: true,
            ..Self::new()
        }
    }

    /// Force the status of a known or unknown intent
    pub async fn set_status(&self, reference: &str, status: &str) {
        self.intents
            .write()
            .await
            .insert(reference.to_string(), status.to_string());
    }

    /// Number of intents created so far
    pub fn created(&self) -> usize {
        self.counter.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentProcessor for MockPaymentProcessor {
    async fn create_intent(&self, amount_cents: i64, currency: &str) -> Result<PaymentIntent> {
        if self.fail_create {
            return Err(PaymentError::Stripe("mock processor refused the intent".into()));
        }

        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        let reference = format!("pi_mock_{n}");
        self.set_status(&reference, "requires_payment_method").await;

        tracing::debug!(reference = %reference, amount_cents, currency, "Mock intent created");

        Ok(PaymentIntent {
            client_secret: format!("{reference}_secret_mock"),
            reference,
        })
    }

    async fn retrieve_intent(&self, reference: &str) -> Result<String> {
        self.intents
            .read()
            .await
            .get(reference)
            .cloned()
            .ok_or_else(|| PaymentError::UnknownIntent(reference.to_string()))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

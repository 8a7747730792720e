//! Payment Gate
//!
//! Binds payment intents to pet-image records and flips the paid flag once
//! the processor reports a successful charge.

use std::sync::Arc;

use furble_core::{
    IdCodec, PetImageStore, find_by_token,
    error::{FurbleError, Result},
};

use crate::processor::{PaymentProcessor, STATUS_SUCCEEDED};

/// Three-way result of a confirmation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PaymentOutcome {
    /// First confirmation of a succeeded intent; the record is now paid
    Succeeded,

    /// Intent succeeded earlier; nothing changed
    AlreadyCompleted,

    /// Intent has not succeeded (yet); nothing changed
    NotSuccessful,
}

impl PaymentOutcome {
    pub fn message(self) -> &'static str {
        match self {
            PaymentOutcome::Succeeded => "Payment was successful.",
            PaymentOutcome::AlreadyCompleted => "Payment was already completed.",
            PaymentOutcome::NotSuccessful => "Payment was not successful.",
        }
    }
}

/// Intent created for an image
#[derive(Clone, Debug)]
pub struct CreatedIntent {
    /// Encoded image id, echoed back
    pub image_id: String,

    pub reference: String,

    pub client_secret: String,
}

/// Result of ConfirmPayment
#[derive(Clone, Debug)]
pub struct PaymentConfirmation {
    /// Encoded image id, echoed back as supplied
    pub image_id: String,

    /// Raw processor status (e.g. "succeeded", "processing")
    pub payment_status: String,

    pub outcome: PaymentOutcome,
}

impl PaymentConfirmation {
    pub fn message(&self) -> &'static str {
        self.outcome.message()
    }
}

pub struct PaymentGate {
    store: Arc<dyn PetImageStore>,
    codec: IdCodec,
    processor: Arc<dyn PaymentProcessor>,
    price_cents: i64,
    currency: String,
}

impl PaymentGate {
    pub fn new(
        store: Arc<dyn PetImageStore>,
        codec: IdCodec,
        processor: Arc<dyn PaymentProcessor>,
        price_cents: i64,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            store,
            codec,
            processor,
            price_cents,
            currency: currency.into(),
        }
    }

    /// Create an intent for the fixed price and bind it to the image.
    ///
    /// A second call for the same image replaces the stored reference; the
    /// earlier intent can no longer be confirmed against this record.
    pub async fn create_intent(&self, encoded_id: &str) -> Result<CreatedIntent> {
        let mut record = find_by_token(self.store.as_ref(), &self.codec, encoded_id)?;

        let intent = self
            .processor
            .create_intent(self.price_cents, &self.currency)
            .await
            .map_err(|e| {
                tracing::error!(image_id = record.id, processor = self.processor.name(), error = %e, "Intent creation failed");
                FurbleError::from(e)
            })?;

        if let Some(previous) = &record.payment_intent_ref {
            tracing::info!(image_id = record.id, previous = %previous, "Replacing payment intent");
        }
        record.attach_payment_intent(intent.reference.clone());
        self.store.update(&record)?;

        tracing::info!(
            image_id = record.id,
            reference = %intent.reference,
            amount_cents = self.price_cents,
            currency = %self.currency,
            "Payment intent created"
        );

        Ok(CreatedIntent {
            image_id: encoded_id.to_string(),
            reference: intent.reference,
            client_secret: intent.client_secret,
        })
    }

    /// Check the intent with the processor and settle the record it is bound to.
    ///
    /// `encoded_id` is only echoed back; the record is found through the
    /// intent reference.
    pub async fn confirm_payment(&self, reference: &str, encoded_id: &str) -> Result<PaymentConfirmation> {
        let status = self.processor.retrieve_intent(reference).await.map_err(|e| {
            tracing::warn!(reference = %reference, error = %e, "Intent lookup failed");
            FurbleError::InvalidReference("Invalid payment_intent_id".into())
        })?;

        let outcome = self.apply_status(reference, &status)?;

        Ok(PaymentConfirmation {
            image_id: encoded_id.to_string(),
            payment_status: status,
            outcome,
        })
    }

    /// Mark the record bound to `reference` as paid, for a charge already
    /// known to have succeeded (webhook delivery).
    pub fn settle(&self, reference: &str) -> Result<PaymentOutcome> {
        self.apply_status(reference, STATUS_SUCCEEDED)
    }

    fn apply_status(&self, reference: &str, status: &str) -> Result<PaymentOutcome> {
        let mut record = self
            .store
            .find_by_payment_ref(reference)?
            .ok_or_else(|| FurbleError::NotFound("Order not found".into()))?;

        if status != STATUS_SUCCEEDED {
            tracing::info!(image_id = record.id, reference = %reference, status = %status, "Payment not successful");
            return Ok(PaymentOutcome::NotSuccessful);
        }

        if !record.mark_paid() {
            tracing::debug!(image_id = record.id, reference = %reference, "Payment already completed");
            return Ok(PaymentOutcome::AlreadyCompleted);
        }

        self.store.update(&record)?;
        tracing::info!(image_id = record.id, reference = %reference, "Payment succeeded");

        Ok(PaymentOutcome::Succeeded)
    }
}

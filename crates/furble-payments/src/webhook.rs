//! Stripe Webhook Handling
//!
//! Settles payments pushed by Stripe, so a record can become paid without the
//! client calling confirm.

use std::sync::Arc;
use stripe::{Event, EventObject, EventType, Webhook};

use furble_core::FurbleError;

use crate::error::{PaymentError, Result};
use crate::gate::{PaymentGate, PaymentOutcome};

/// Parsed webhook event
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WebhookEvent {
    /// Intent succeeded. `outcome` is `None` when no image is bound to it.
    PaymentSucceeded {
        reference: String,
        outcome: Option<PaymentOutcome>,
    },

    /// Charge attempt failed; nothing to change
    PaymentFailed { reference: String },

    /// Unhandled event type
    Other { event_type: String },
}

/// Webhook handler
pub struct WebhookHandler {
    gate: Arc<PaymentGate>,
    secret: String,
}

impl WebhookHandler {
    pub fn new(gate: Arc<PaymentGate>, secret: impl Into<String>) -> Self {
        Self {
            gate,
            secret: secret.into(),
        }
    }

    /// Verify webhook signature and parse event
    pub fn parse_event(&self, payload: &str, signature: &str) -> Result<Event> {
        Webhook::construct_event(payload, signature, &self.secret)
            .map_err(|e| PaymentError::WebhookSignature(e.to_string()))
    }

    /// Process a verified event
    pub fn handle(&self, event: &Event) -> furble_core::Result<WebhookEvent> {
        tracing::info!(event_type = ?event.type_, "Processing Stripe webhook");

        let parsed = Self::classify(event)?;
        self.apply(parsed)
    }

    fn apply(&self, event: WebhookEvent) -> furble_core::Result<WebhookEvent> {
        match event {
            WebhookEvent::PaymentSucceeded { reference, .. } => {
                let outcome = match self.gate.settle(&reference) {
                    Ok(outcome) => Some(outcome),
                    Err(FurbleError::NotFound(_)) => {
                        tracing::warn!(reference = %reference, "Succeeded intent is not bound to any image");
                        None
                    }
                    Err(e) => return Err(e),
                };
                Ok(WebhookEvent::PaymentSucceeded { reference, outcome })
            }

            WebhookEvent::PaymentFailed { ref reference } => {
                tracing::warn!(reference = %reference, "Payment attempt failed");
                Ok(event)
            }

            WebhookEvent::Other { ref event_type } => {
                tracing::debug!(event_type = %event_type, "Unhandled webhook event");
                Ok(event)
            }
        }
    }

    /// Parse Stripe event into our event type
    fn classify(event: &Event) -> Result<WebhookEvent> {
        match event.type_ {
            EventType::PaymentIntentSucceeded => {
                if let EventObject::PaymentIntent(intent) = &event.data.object {
                    Ok(WebhookEvent::PaymentSucceeded {
                        reference: intent.id.to_string(),
                        outcome: None,
                    })
                } else {
                    Err(PaymentError::WebhookParse("Invalid payment intent data".into()))
                }
            }

            EventType::PaymentIntentPaymentFailed => {
                if let EventObject::PaymentIntent(intent) = &event.data.object {
                    Ok(WebhookEvent::PaymentFailed {
                        reference: intent.id.to_string(),
                    })
                } else {
                    Err(PaymentError::WebhookParse("Invalid payment intent data".into()))
                }
            }

            _ => Ok(WebhookEvent::Other {
                event_type: format!("{:?}", event.type_),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockPaymentProcessor;
    use furble_core::{IdCodec, MemoryPetImageStore, NewPetImage, PetImageStore};
    use hmac::{Hmac, Mac};
    use sha2::Sha256;
    use std::time::{SystemTime, UNIX_EPOCH};

    const SECRET: &str = "whsec_test";

    /// Header value Stripe would send for `payload`
    fn sign(payload: &str) -> String {
        let timestamp = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs();
        let mut mac = Hmac::<Sha256>::new_from_slice(SECRET.as_bytes()).unwrap();
        mac.update(format!("{timestamp}.{payload}").as_bytes());
        format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
    }

    fn intent_event(event_type: &str, reference: &str, status: &str) -> String {
        serde_json::json!({
            "id": "evt_1Furble",
            "object": "event",
            "api_version": "2023-10-16",
            "created": 1_700_000_000,
            "livemode": false,
            "pending_webhooks": 1,
            "request": { "id": null, "idempotency_key": null },
            "type": event_type,
            "data": {
                "object": {
                    "id": reference,
                    "object": "payment_intent",
                    "amount": 1900,
                    "amount_capturable": 0,
                    "amount_details": { "tip": {} },
                    "amount_received": 1900,
                    "application": null,
                    "application_fee_amount": null,
                    "automatic_payment_methods": null,
                    "canceled_at": null,
                    "cancellation_reason": null,
                    "capture_method": "automatic",
                    "client_secret": format!("{reference}_secret_test"),
                    "confirmation_method": "automatic",
                    "created": 1_700_000_000,
                    "currency": "usd",
                    "customer": null,
                    "description": null,
                    "invoice": null,
                    "last_payment_error": null,
                    "latest_charge": null,
                    "livemode": false,
                    "metadata": {},
                    "next_action": null,
                    "on_behalf_of": null,
                    "payment_method": null,
                    "payment_method_options": {},
                    "payment_method_types": ["card"],
                    "processing": null,
                    "receipt_email": null,
                    "review": null,
                    "setup_future_usage": null,
                    "shipping": null,
                    "source": null,
                    "statement_descriptor": null,
                    "statement_descriptor_suffix": null,
                    "status": status,
                    "transfer_data": null,
                    "transfer_group": null
                }
            }
        })
        .to_string()
    }

    fn handler() -> (WebhookHandler, Arc<PaymentGate>, Arc<MemoryPetImageStore>, String) {
        let store = Arc::new(MemoryPetImageStore::new());
        let codec = IdCodec::new("webhook-secret").unwrap();
        let record = store
            .create(NewPetImage {
                source_image_path: "uploaded_images/pet.png".into(),
            })
            .unwrap();
        let token = codec.encode(record.id).unwrap();
        let gate = Arc::new(PaymentGate::new(
            store.clone(),
            codec,
            Arc::new(MockPaymentProcessor::new()),
            1900,
            "usd",
        ));
        (WebhookHandler::new(gate.clone(), SECRET), gate, store, token)
    }

    #[test]
    fn test_bad_signature_rejected() {
        let (handler, ..) = handler();
        let err = handler.parse_event("{}", "t=1,v1=deadbeef").unwrap_err();
        assert!(matches!(err, PaymentError::WebhookSignature(_)));
    }

    #[tokio::test]
    async fn test_succeeded_event_marks_paid() {
        let (handler, gate, store, token) = handler();
        let created = gate.create_intent(&token).await.unwrap();

        let event = WebhookEvent::PaymentSucceeded {
            reference: created.reference.clone(),
            outcome: None,
        };
        let applied = handler.apply(event.clone()).unwrap();
        assert_eq!(
            applied,
            WebhookEvent::PaymentSucceeded {
                reference: created.reference.clone(),
                outcome: Some(PaymentOutcome::Succeeded),
            }
        );
        assert!(store.find_by_payment_ref(&created.reference).unwrap().unwrap().is_paid);

        // redelivery
        let again = handler.apply(event).unwrap();
        assert!(matches!(
            again,
            WebhookEvent::PaymentSucceeded {
                outcome: Some(PaymentOutcome::AlreadyCompleted),
                ..
            }
        ));
    }

    #[test]
    fn test_unbound_intent_is_acknowledged() {
        let (handler, ..) = handler();
        let applied = handler
            .apply(WebhookEvent::PaymentSucceeded {
                reference: "pi_elsewhere".into(),
                outcome: None,
            })
            .unwrap();
        assert!(matches!(applied, WebhookEvent::PaymentSucceeded { outcome: None, .. }));
    }

    #[tokio::test]
    async fn test_signed_succeeded_event_marks_paid() {
        let (handler, gate, store, token) = handler();
        let created = gate.create_intent(&token).await.unwrap();

        let payload = intent_event("payment_intent.succeeded", &created.reference, "succeeded");
        let event = handler.parse_event(&payload, &sign(&payload)).unwrap();
        let handled = handler.handle(&event).unwrap();

        assert_eq!(
            handled,
            WebhookEvent::PaymentSucceeded {
                reference: created.reference.clone(),
                outcome: Some(PaymentOutcome::Succeeded),
            }
        );
        assert!(store.find_by_payment_ref(&created.reference).unwrap().unwrap().is_paid);
    }

    #[tokio::test]
    async fn test_signed_unrelated_event_is_ignored() {
        let (handler, gate, store, token) = handler();
        let created = gate.create_intent(&token).await.unwrap();

        let payload = intent_event(
            "payment_intent.created",
            &created.reference,
            "requires_payment_method",
        );
        let event = handler.parse_event(&payload, &sign(&payload)).unwrap();

        assert!(matches!(handler.handle(&event).unwrap(), WebhookEvent::Other { .. }));
        assert!(!store.find_by_payment_ref(&created.reference).unwrap().unwrap().is_paid);
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let (handler, ..) = handler();
        let payload = intent_event("payment_intent.succeeded", "pi_mock_1", "succeeded");
        let signature = sign(&payload);
        let tampered = payload.replace("1900", "1");

        assert!(matches!(
            handler.parse_event(&tampered, &signature),
            Err(PaymentError::WebhookSignature(_))
        ));
    }
}

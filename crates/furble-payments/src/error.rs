//! Payment Error Types

use furble_core::FurbleError;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, PaymentError>;

/// Payment-related errors
#[derive(Error, Debug)]
pub enum PaymentError {
    /// Stripe API error
    #[error("Stripe error: {0}")]
    Stripe(String),

    /// Intent reference is malformed or unknown to the processor
    #[error("Unknown payment intent: {0}")]
    UnknownIntent(String),

    /// Webhook signature verification failed
    #[error("Webhook signature invalid: {0}")]
    WebhookSignature(String),

    /// Webhook payload parsing failed
    #[error("Webhook parse error: {0}")]
    WebhookParse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl PaymentError {
    /// Get user-friendly message
    pub fn user_message(&self) -> &str {
        match self {
            PaymentError::Stripe(_) => "Payment processing failed. Please try again.",
            PaymentError::UnknownIntent(_) => "Invalid payment_intent_id",
            PaymentError::WebhookSignature(_) | PaymentError::WebhookParse(_) => "Invalid webhook payload.",
            PaymentError::Config(_) => "Service configuration error.",
        }
    }
}

impl From<PaymentError> for FurbleError {
    fn from(error: PaymentError) -> Self {
        match error {
            PaymentError::Config(msg) => FurbleError::Config(msg),
            PaymentError::WebhookSignature(msg) | PaymentError::WebhookParse(msg) => {
                FurbleError::Validation(msg)
            }
            PaymentError::UnknownIntent(msg) => FurbleError::InvalidReference(msg),
            PaymentError::Stripe(msg) => FurbleError::Payment(msg),
        }
    }
}

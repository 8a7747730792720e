//! # furble-payments
//!
//! Payment gate for Fur & Furble portraits.
//!
//! ## Flow (Stripe Elements)
//!
//! ```text
//! ┌────────────┐ create-payment-intent ┌──────────────┐  PaymentIntent   ┌─────────┐
//! │   Client   │──────────────────────▶│ PaymentGate  │─────────────────▶│ Stripe  │
//! │            │◀── ref + client_secret│              │                  │         │
//! │ stripe.js  │──────────── card details (never touch this service) ──▶│         │
//! │            │ confirm-payment       │              │ retrieve status  │         │
//! │            │──────────────────────▶│              │─────────────────▶│         │
//! └────────────┘                       └──────────────┘                  └─────────┘
//!                                             ▲  payment_intent.succeeded   │
//!                                             └──── WebhookHandler ◀────────┘
//! ```
//!
//! Confirmation has three outcomes, returned verbatim to the caller:
//! `Payment was successful.`, `Payment was already completed.` and
//! `Payment was not successful.`. Only the first changes state, and the paid
//! flag is never cleared.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use furble_payments::{PaymentGate, StripeProcessor};
//!
//! let gate = PaymentGate::new(store, codec, Arc::new(StripeProcessor::new("sk_test_xxx")), 1900, "usd");
//!
//! let intent = gate.create_intent(&encoded_id).await?;
//! // hand intent.client_secret to stripe.js, then:
//! let confirmation = gate.confirm_payment(&intent.reference, &encoded_id).await?;
//! println!("{}", confirmation.message());
//! ```
#![recursion_limit = "256"]

mod error;
mod gate;
pub mod mock;
mod processor;
mod webhook;

pub use error::{PaymentError, Result};
pub use gate::{CreatedIntent, PaymentConfirmation, PaymentGate, PaymentOutcome};
pub use mock::MockPaymentProcessor;
pub use processor::{PaymentIntent, PaymentProcessor, STATUS_SUCCEEDED, StripeProcessor};
pub use webhook::{WebhookEvent, WebhookHandler};

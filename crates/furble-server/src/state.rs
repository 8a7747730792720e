//! Application State

use std::sync::Arc;

use furble_core::{AppConfig, BlobStore, IdCodec, ImageTransformer, PetImageStore};
use furble_payments::{PaymentGate, PaymentProcessor, WebhookHandler};
use furble_studio::{DownloadGate, GenerationOrchestrator, ImageIngestor, ZipArchiver};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,

    pub ingestor: Arc<ImageIngestor>,

    /// Generation (None if no transformer is configured)
    pub generator: Option<Arc<GenerationOrchestrator>>,

    pub downloads: Arc<DownloadGate>,

    /// Payment gate (None if Stripe is not configured)
    pub payments: Option<Arc<PaymentGate>>,

    /// Webhook handler (None without payments or a signing secret)
    pub webhooks: Option<Arc<WebhookHandler>>,
}

impl AppState {
    /// Wire every component from the config and its collaborators.
    pub fn build(
        config: Arc<AppConfig>,
        store: Arc<dyn PetImageStore>,
        blobs: Arc<dyn BlobStore>,
        transformer: Option<Arc<dyn ImageTransformer>>,
        processor: Option<Arc<dyn PaymentProcessor>>,
    ) -> furble_core::Result<Self> {
        let codec = IdCodec::new(&config.secret_key)?;

        let generator = transformer.map(|transformer| {
            Arc::new(GenerationOrchestrator::new(
                store.clone(),
                blobs.clone(),
                codec.clone(),
                transformer,
                config.template_path.clone(),
            ))
        });

        let payments = processor.map(|processor| {
            Arc::new(PaymentGate::new(
                store.clone(),
                codec.clone(),
                processor,
                config.price_cents,
                config.currency.clone(),
            ))
        });

        let webhooks = match (&payments, &config.payment_webhook_secret) {
            (Some(gate), Some(secret)) => Some(Arc::new(WebhookHandler::new(gate.clone(), secret.clone()))),
            _ => None,
        };

        Ok(Self {
            ingestor: Arc::new(ImageIngestor::new(store.clone(), blobs.clone(), codec.clone())),
            downloads: Arc::new(DownloadGate::new(store, codec, Arc::new(ZipArchiver::new(blobs)))),
            generator,
            payments,
            webhooks,
            config,
        })
    }
}

//! Fur & Furble HTTP Server
//!
//! Axum-based server exposing the pet-image lifecycle: upload, generate,
//! pay and download.

mod handlers;
mod routes;
mod state;

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use furble_core::{AppConfig, BlobStore, ImageTransformer, LocalBlobStore, PetImageStore};
use furble_payments::{PaymentProcessor, StripeProcessor};
use furble_runtime::{OpenAiConfig, OpenAiTransformer, SqlitePetImageStore};

use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    dotenvy::dotenv().ok();

    let config = Arc::new(AppConfig::from_env()?);
    tracing::debug!(?config, "Configuration loaded");

    // Record store
    let sqlite = SqlitePetImageStore::new(&config.database_path);
    sqlite.initialize()?;
    let store: Arc<dyn PetImageStore> = Arc::new(sqlite);
    tracing::info!("✓ Record store at {}", config.database_path.display());

    let blobs: Arc<dyn BlobStore> = Arc::new(LocalBlobStore::new(&config.storage_root));

    // Image transformer
    let transformer = OpenAiConfig::from_app_config(&config)
        .map(|c| Arc::new(OpenAiTransformer::new(c)) as Arc<dyn ImageTransformer>);

    if transformer.is_some() {
        tracing::info!("✓ OpenAI configured ({})", config.transformer_model);
        if !config.template_path.is_file() {
            tracing::warn!("⚠ Portrait template missing: {}", config.template_path.display());
        }
    } else {
        tracing::warn!("⚠ OpenAI not configured - generation disabled");
        tracing::warn!("  Set OPENAI_API_KEY in .env");
    }

    // Payments
    let processor = StripeProcessor::from_app_config(&config)
        .map(|p| Arc::new(p) as Arc<dyn PaymentProcessor>);

    if processor.is_some() {
        tracing::info!("✓ Stripe configured ({} {})", config.price_cents, config.currency);
        if config.payment_webhook_secret.is_none() {
            tracing::warn!("  STRIPE_WEBHOOK_SECRET not set - webhook disabled");
        }
    } else {
        tracing::warn!("⚠ Stripe not configured - payments disabled");
        tracing::warn!("  Set STRIPE_SECRET_KEY (and STRIPE_WEBHOOK_SECRET) in .env");
    }

    let state = AppState::build(config.clone(), store, blobs, transformer, processor)?;
    let app = routes::router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🐾 Fur & Furble server running on http://{}", config.bind_addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health                                   - Health check");
    tracing::info!("  POST /api/v1/models/upload-pet-image/          - Upload a pet photo");
    tracing::info!("  POST /api/v1/models/generate-image             - Generate portrait");
    tracing::info!("  GET  /api/v1/models/download-image/{{image_id}}  - Download (paid)");
    tracing::info!("  POST /api/v1/payments/create-payment-intent/   - Create Stripe intent");
    tracing::info!("  POST /api/v1/payments/confirm-payment/         - Confirm payment");
    tracing::info!("  POST /webhook/stripe                           - Stripe webhook");
    tracing::info!("");

    axum::serve(listener, app).await?;

    Ok(())
}

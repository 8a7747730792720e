//! Router

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use furble_studio::MAX_IMAGE_SIZE;

use crate::handlers::{
    confirm_payment, create_payment_intent, download_image, generate_image, health_check, root,
    stripe_webhook, upload_pet_image,
};
use crate::state::AppState;

/// Request body ceiling for uploads: the image plus multipart overhead.
/// Images between `MAX_IMAGE_SIZE` and this limit reach ingestion and get
/// the descriptive 413.
pub const UPLOAD_BODY_LIMIT: usize = MAX_IMAGE_SIZE + 2 * 1024 * 1024;

pub fn router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let models = Router::new()
        .route(
            "/upload-pet-image/",
            post(upload_pet_image).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/generate-image", post(generate_image))
        .route("/download-image/{image_id}", get(download_image));

    let payments = Router::new()
        .route("/create-payment-intent/", post(create_payment_intent))
        .route("/confirm-payment/", post(confirm_payment));

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .nest("/api/v1/models", models)
        .nest("/api/v1/payments", payments)
        .route("/webhook/stripe", post(stripe_webhook))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(cors))
        .with_state(state)
}

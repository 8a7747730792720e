//! HTTP Handlers

use axum::{
    Json,
    extract::{Multipart, Path, State, multipart::MultipartError},
    http::{HeaderMap, StatusCode},
};
use serde::{Deserialize, Serialize};

use furble_core::{ErrorKind, FurbleError};
use furble_studio::MAX_IMAGE_SIZE;

use crate::state::AppState;

/// Multipart field carrying the upload
pub const IMAGE_FIELD: &str = "Image";

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Serialize)]
pub struct WelcomeResponse {
    pub message: &'static str,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub transformer_configured: bool,
    pub payments_configured: bool,
    pub webhooks_configured: bool,
    pub price_cents: i64,
    pub currency: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub image_url: String,
    pub encoded_image_id: String,
}

/// Body of generate-image and create-payment-intent
#[derive(Debug, Deserialize)]
pub struct ImageIdRequest {
    pub image_id: String,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub message: &'static str,
    pub generated_image_path: String,
    pub image_url: String,
    pub encoded_image_id: String,
}

#[derive(Debug, Serialize)]
pub struct DownloadResponse {
    pub message: &'static str,
    pub download_link: String,
}

#[derive(Debug, Serialize)]
pub struct PaymentIntentResponse {
    pub image_id: String,
    pub stripe_payment_id: String,
    pub client_secret: String,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmPaymentRequest {
    pub image_id: String,
    pub stripe_payment_id: String,
}

#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    pub image_id: String,
    pub payment_status: String,
    pub message: &'static str,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

/// Map a lifecycle error onto a status code and a caller-safe body.
///
/// Internal failures are logged here and answered with the generic message.
pub fn api_error(error: FurbleError) -> ApiError {
    let (status, code) = match (&error, error.kind()) {
        (FurbleError::UnsupportedMediaType(_), _) => (StatusCode::UNSUPPORTED_MEDIA_TYPE, "UNSUPPORTED_MEDIA_TYPE"),
        (FurbleError::PayloadTooLarge { .. }, _) => (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE"),
        (_, ErrorKind::Validation) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
        (_, ErrorKind::NotFound) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        (_, ErrorKind::Forbidden) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
        (_, ErrorKind::InvalidReference) => (StatusCode::BAD_REQUEST, "INVALID_REFERENCE"),
        (_, ErrorKind::ExternalService) => (StatusCode::BAD_GATEWAY, "EXTERNAL_SERVICE_ERROR"),
        (_, ErrorKind::Unavailable) => (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE"),
        (_, ErrorKind::Internal) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
    };

    match error.kind() {
        ErrorKind::Internal => tracing::error!(error = %error, "Request failed"),
        ErrorKind::ExternalService => tracing::warn!(error = %error, "Upstream call failed"),
        _ => tracing::debug!(error = %error, "Request rejected"),
    }

    (
        status,
        Json(ErrorResponse {
            error: error.user_message(),
            code: code.into(),
        }),
    )
}

fn multipart_error(error: &MultipartError) -> FurbleError {
    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        FurbleError::PayloadTooLarge {
            size: crate::routes::UPLOAD_BODY_LIMIT,
            max: MAX_IMAGE_SIZE,
        }
    } else {
        FurbleError::Validation(error.body_text())
    }
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn root() -> Json<WelcomeResponse> {
    Json(WelcomeResponse {
        message: "Welcome to the Fur and Furble API",
    })
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        transformer_configured: state.generator.is_some(),
        payments_configured: state.payments.is_some(),
        webhooks_configured: state.webhooks.is_some(),
        price_cents: state.config.price_cents,
        currency: state.config.currency.clone(),
    })
}

/// Upload a pet photo (multipart field `Image`)
pub async fn upload_pet_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| api_error(multipart_error(&e)))?
    {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(|e| api_error(multipart_error(&e)))?;

        let ingested = state
            .ingestor
            .ingest(bytes.to_vec(), content_type.as_deref())
            .await
            .map_err(api_error)?;

        return Ok((
            StatusCode::CREATED,
            Json(UploadResponse {
                image_url: ingested.image_url,
                encoded_image_id: ingested.encoded_id,
            }),
        ));
    }

    Err(api_error(FurbleError::Validation(format!(
        "multipart field '{IMAGE_FIELD}' is required"
    ))))
}

/// Run the portrait transformation for an uploaded image
pub async fn generate_image(
    State(state): State<AppState>,
    Json(payload): Json<ImageIdRequest>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let generator = state
        .generator
        .as_ref()
        .ok_or_else(|| api_error(FurbleError::Unavailable("Image generation".into())))?;

    let generated = generator.generate(&payload.image_id).await.map_err(api_error)?;

    Ok(Json(GenerateResponse {
        message: "Image generated successfully",
        generated_image_path: generated.generated_image_path,
        image_url: generated.image_url,
        encoded_image_id: payload.image_id,
    }))
}

/// Package the generated images of a paid upload
pub async fn download_image(
    State(state): State<AppState>,
    Path(image_id): Path<String>,
) -> Result<Json<DownloadResponse>, ApiError> {
    let artifact = state.downloads.download(&image_id).await.map_err(api_error)?;

    Ok(Json(DownloadResponse {
        message: "Image downloaded successfully",
        download_link: artifact.download_link,
    }))
}

/// Create a Stripe payment intent for an image
pub async fn create_payment_intent(
    State(state): State<AppState>,
    Json(payload): Json<ImageIdRequest>,
) -> Result<Json<PaymentIntentResponse>, ApiError> {
    let payments = state
        .payments
        .as_ref()
        .ok_or_else(|| api_error(FurbleError::Unavailable("Payments".into())))?;

    let intent = payments.create_intent(&payload.image_id).await.map_err(api_error)?;

    Ok(Json(PaymentIntentResponse {
        image_id: intent.image_id,
        stripe_payment_id: intent.reference,
        client_secret: intent.client_secret,
    }))
}

/// Confirm a payment intent
pub async fn confirm_payment(
    State(state): State<AppState>,
    Json(payload): Json<ConfirmPaymentRequest>,
) -> Result<Json<PaymentResponse>, ApiError> {
    let payments = state
        .payments
        .as_ref()
        .ok_or_else(|| api_error(FurbleError::Unavailable("Payments".into())))?;

    let confirmation = payments
        .confirm_payment(&payload.stripe_payment_id, &payload.image_id)
        .await
        .map_err(api_error)?;

    Ok(Json(PaymentResponse {
        message: confirmation.message(),
        image_id: confirmation.image_id,
        payment_status: confirmation.payment_status,
    }))
}

/// Stripe webhook handler
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<StatusCode, ApiError> {
    let handler = state
        .webhooks
        .as_ref()
        .ok_or_else(|| api_error(FurbleError::Unavailable("Stripe webhooks".into())))?;

    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: "Missing Stripe signature".into(),
                    code: "MISSING_SIGNATURE".into(),
                }),
            )
        })?;

    let event = handler.parse_event(&body, signature).map_err(|e| {
        tracing::warn!(error = %e, "Webhook signature failed");
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: e.user_message().into(),
                code: "INVALID_SIGNATURE".into(),
            }),
        )
    })?;

    handler.handle(&event).map_err(api_error)?;

    Ok(StatusCode::OK)
}

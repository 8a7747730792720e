//! Image Ingestion
//!
//! Validates an upload, stores it as a canonical PNG and creates its record.

use std::sync::Arc;

use furble_core::{
    BlobStore, IdCodec, NewPetImage, PetImageStore, UPLOAD_DIR,
    error::{FurbleError, Result},
};

use crate::imaging;

/// Largest accepted upload (10 MiB)
pub const MAX_IMAGE_SIZE: usize = 10 * 1024 * 1024;

/// Outcome of a successful upload
#[derive(Clone, Debug)]
pub struct IngestedImage {
    /// Raw record id, for logging only
    pub record_id: i64,

    /// External token for all later calls
    pub encoded_id: String,

    /// Locator of the stored PNG
    pub image_url: String,
}

/// Cheap checks that run before the image is decoded.
///
/// Order matters: declared type, then size, then sniffed bytes.
pub fn validate_upload(bytes: &[u8], content_type: Option<&str>) -> Result<image::ImageFormat> {
    let declared_image = content_type
        .map(|ct| ct.trim().to_ascii_lowercase())
        .is_some_and(|ct| ct.starts_with("image/"));
    if !declared_image {
        return Err(FurbleError::UnsupportedMediaType(format!(
            "declared content type {content_type:?} is not an image"
        )));
    }

    if bytes.len() > MAX_IMAGE_SIZE {
        return Err(FurbleError::PayloadTooLarge {
            size: bytes.len(),
            max: MAX_IMAGE_SIZE,
        });
    }

    imaging::sniff_format(bytes)
}

pub struct ImageIngestor {
    store: Arc<dyn PetImageStore>,
    blobs: Arc<dyn BlobStore>,
    codec: IdCodec,
}

impl ImageIngestor {
    pub fn new(store: Arc<dyn PetImageStore>, blobs: Arc<dyn BlobStore>, codec: IdCodec) -> Self {
        Self { store, blobs, codec }
    }

    /// Ingest one upload.
    ///
    /// If anything fails after the PNG is written, the file is removed again
    /// before the error is returned.
    pub async fn ingest(&self, bytes: Vec<u8>, content_type: Option<&str>) -> Result<IngestedImage> {
        let format = validate_upload(&bytes, content_type)?;

        let png = tokio::task::spawn_blocking(move || {
            let normalized = imaging::normalize(&bytes, format)?;
            tracing::debug!(?format, has_alpha = normalized.has_alpha, "Normalized upload");
            imaging::encode_png(&normalized.pixels)
        })
        .await
        .map_err(|e| FurbleError::Image(format!("normalization task failed: {e}")))??;

        let locator = format!("{UPLOAD_DIR}/{}.png", uuid::Uuid::new_v4());

        let record = match self.persist(&locator, &png).await {
            Ok(record) => record,
            Err(e) => {
                self.discard(&locator).await;
                return Err(e);
            }
        };

        let encoded_id = self.codec.encode(record.id)?;

        tracing::info!(
            image_id = record.id,
            image_url = %locator,
            bytes = png.len(),
            "Pet image ingested"
        );

        Ok(IngestedImage {
            record_id: record.id,
            encoded_id,
            image_url: locator,
        })
    }

    async fn persist(&self, locator: &str, png: &[u8]) -> Result<furble_core::PetImageRecord> {
        self.blobs.write(locator, png).await?;
        self.store.create(NewPetImage {
            source_image_path: locator.to_string(),
        })
    }

    async fn discard(&self, locator: &str) {
        if let Err(e) = self.blobs.delete(locator).await {
            tracing::warn!(image_url = %locator, error = %e, "Failed to remove orphaned upload");
        }
    }
}

//! Download Gate
//!
//! Hands out a fresh archive of the generated folder once the image is paid for.

use std::sync::Arc;

use furble_core::{
    IdCodec, PetImageStore, find_by_token,
    error::{FurbleError, Result},
};

use crate::archive::Archiver;

/// A packaged download
#[derive(Clone, Debug)]
pub struct DownloadArtifact {
    pub record_id: i64,

    /// Locator of the zip archive
    pub download_link: String,
}

pub struct DownloadGate {
    store: Arc<dyn PetImageStore>,
    codec: IdCodec,
    archiver: Arc<dyn Archiver>,
}

impl DownloadGate {
    pub fn new(store: Arc<dyn PetImageStore>, codec: IdCodec, archiver: Arc<dyn Archiver>) -> Self {
        Self {
            store,
            codec,
            archiver,
        }
    }

    /// Package the generated folder for a paid image.
    ///
    /// Payment is checked before generation state, so an unpaid image is
    /// `Forbidden` whether or not it was generated. Every call builds a new
    /// archive.
    pub async fn download(&self, encoded_id: &str) -> Result<DownloadArtifact> {
        let record = find_by_token(self.store.as_ref(), &self.codec, encoded_id)?;

        if !record.is_paid {
            return Err(FurbleError::Forbidden("Image not paid for".into()));
        }

        let folder = record
            .generated_folder_path
            .ok_or_else(|| FurbleError::NotFound("Generated images folder not found".into()))?;

        let archiver = Arc::clone(&self.archiver);
        let download_link = tokio::task::spawn_blocking(move || archiver.package_folder(&folder))
            .await
            .map_err(|e| FurbleError::Archive(format!("archive task failed: {e}")))??;

        tracing::info!(image_id = record.id, archive = %download_link, "Download packaged");

        Ok(DownloadArtifact {
            record_id: record.id,
            download_link,
        })
    }
}

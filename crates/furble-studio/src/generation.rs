//! Generation Orchestration
//!
//! Sends the stored upload and the portrait template to the transformer and
//! keeps the result in a fresh folder referenced from the record.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use std::path::PathBuf;
use std::sync::Arc;

use furble_core::{
    BlobStore, DEFAULT_SUBJECT, GENERATED_DIR, IdCodec, ImageAsset, ImageTransformer,
    PetImageStore, PromptBook, find_by_token,
    error::{FurbleError, Result},
};

/// File name of the transformer output inside its folder
pub const GENERATED_FILE_NAME: &str = "generated_image.png";

/// Outcome of one generation run
#[derive(Clone, Debug)]
pub struct GeneratedImage {
    /// Decoded record id
    pub record_id: i64,

    pub generated_folder_path: String,

    pub generated_image_path: String,

    /// Locator of the source upload
    pub image_url: String,
}

pub struct GenerationOrchestrator {
    store: Arc<dyn PetImageStore>,
    blobs: Arc<dyn BlobStore>,
    codec: IdCodec,
    transformer: Arc<dyn ImageTransformer>,
    prompts: PromptBook,
    template_path: PathBuf,
}

impl GenerationOrchestrator {
    pub fn new(
        store: Arc<dyn PetImageStore>,
        blobs: Arc<dyn BlobStore>,
        codec: IdCodec,
        transformer: Arc<dyn ImageTransformer>,
        template_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            blobs,
            codec,
            transformer,
            prompts: PromptBook::default(),
            template_path: template_path.into(),
        }
    }

    /// Replace the default prompt book
    pub fn with_prompts(mut self, prompts: PromptBook) -> Self {
        self.prompts = prompts;
        self
    }

    /// Generate with the default subject ("cat").
    pub async fn generate(&self, encoded_id: &str) -> Result<GeneratedImage> {
        self.generate_for(encoded_id, DEFAULT_SUBJECT).await
    }

    /// Run one transformation for the record behind `encoded_id`.
    ///
    /// Calling this again for the same image repeats the external call and
    /// points the record at the newer folder; older folders are left on disk.
    pub async fn generate_for(&self, encoded_id: &str, subject: &str) -> Result<GeneratedImage> {
        let record = find_by_token(self.store.as_ref(), &self.codec, encoded_id)?;
        let prompt = self.prompts.get(subject)?;

        let template_bytes = tokio::fs::read(&self.template_path).await.map_err(|e| {
            tracing::error!(path = %self.template_path.display(), error = %e, "Portrait template unreadable");
            FurbleError::Io(e)
        })?;
        let template_name = self
            .template_path
            .file_name()
            .map_or_else(|| "template.png".to_string(), |n| n.to_string_lossy().into_owned());
        let template = ImageAsset::png(template_name, template_bytes);

        let source_bytes = self.blobs.read(&record.source_image_path).await?;
        let source = ImageAsset::png("pet.png", source_bytes);

        tracing::info!(
            image_id = record.id,
            subject = %subject,
            transformer = self.transformer.name(),
            "Requesting portrait generation"
        );

        let payload = self.transformer.edit(&template, &source, prompt).await?;
        let image_bytes = STANDARD
            .decode(payload.trim())
            .map_err(|e| FurbleError::Image(format!("transformer returned invalid base64: {e}")))?;

        let folder = format!("{GENERATED_DIR}/{}", uuid::Uuid::new_v4());
        let image_path = format!("{folder}/{GENERATED_FILE_NAME}");

        if let Err(e) = self.publish(record.id, &folder, &image_path, &image_bytes).await {
            if let Err(cleanup) = self.blobs.delete(&folder).await {
                tracing::warn!(folder = %folder, error = %cleanup, "Failed to remove unreferenced output");
            }
            return Err(e);
        }

        tracing::info!(image_id = record.id, folder = %folder, "Portrait generated");

        Ok(GeneratedImage {
            record_id: record.id,
            generated_folder_path: folder,
            generated_image_path: image_path,
            image_url: record.source_image_path,
        })
    }

    /// Write the output and point the record at it.
    ///
    /// The record is re-read right before the write so a payment intent
    /// attached during the (slow) transformer call is not overwritten. This
    /// narrows the window but does not lock: a concurrent generation for the
    /// same image still ends with whichever write lands last.
    async fn publish(&self, id: i64, folder: &str, image_path: &str, bytes: &[u8]) -> Result<()> {
        self.blobs.write(image_path, bytes).await?;

        let mut latest = self
            .store
            .find_by_id(id)?
            .ok_or_else(FurbleError::record_not_found)?;
        latest.set_generated_folder(folder);
        self.store.update(&latest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::fixtures::opaque_png;
    use furble_core::{LocalBlobStore, MemoryPetImageStore, NewPetImage};
    use furble_runtime::MockTransformer;
    use furble_runtime::mock::ONE_PIXEL_PNG_B64;

    struct Fixture {
        dir: tempfile::TempDir,
        store: Arc<MemoryPetImageStore>,
        codec: IdCodec,
        token: String,
        record_id: i64,
    }

    async fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let blobs = LocalBlobStore::new(dir.path());
        blobs.write("uploaded_images/pet.png", &opaque_png()).await.unwrap();
        std::fs::write(dir.path().join("template.png"), opaque_png()).unwrap();

        let store = Arc::new(MemoryPetImageStore::new());
        let record = store
            .create(NewPetImage {
                source_image_path: "uploaded_images/pet.png".into(),
            })
            .unwrap();
        let codec = IdCodec::new("generation-secret").unwrap();
        let token = codec.encode(record.id).unwrap();

        Fixture {
            dir,
            store,
            codec,
            token,
            record_id: record.id,
        }
    }

    fn orchestrator(fx: &Fixture, transformer: Arc<dyn ImageTransformer>) -> GenerationOrchestrator {
        GenerationOrchestrator::new(
            fx.store.clone(),
            Arc::new(LocalBlobStore::new(fx.dir.path())),
            fx.codec.clone(),
            transformer,
            fx.dir.path().join("template.png"),
        )
    }

    #[tokio::test]
    async fn test_generate_persists_folder() {
        let fx = fixture().await;
        let mock = Arc::new(MockTransformer::new());
        let orchestrator = orchestrator(&fx, mock.clone());

        let generated = orchestrator.generate(&fx.token).await.unwrap();

        assert_eq!(generated.record_id, fx.record_id);
        assert_eq!(generated.image_url, "uploaded_images/pet.png");
        assert!(generated.generated_image_path.ends_with(GENERATED_FILE_NAME));
        assert_eq!(mock.calls(), 1);
        assert_eq!(mock.last_prompt().as_deref(), Some(furble_core::prompt::MAGISTRATE_PROMPT_CAT));

        let written = std::fs::read(fx.dir.path().join(&generated.generated_image_path)).unwrap();
        assert_eq!(written, STANDARD.decode(ONE_PIXEL_PNG_B64).unwrap());

        let record = fx.store.find_by_id(fx.record_id).unwrap().unwrap();
        assert_eq!(record.generated_folder_path.as_deref(), Some(generated.generated_folder_path.as_str()));
    }

    #[tokio::test]
    async fn test_regeneration_overwrites_folder() {
        let fx = fixture().await;
        let orchestrator = orchestrator(&fx, Arc::new(MockTransformer::new()));

        let first = orchestrator.generate(&fx.token).await.unwrap();
        let second = orchestrator.generate(&fx.token).await.unwrap();
        assert_ne!(first.generated_folder_path, second.generated_folder_path);

        let record = fx.store.find_by_id(fx.record_id).unwrap().unwrap();
        assert_eq!(record.generated_folder_path, Some(second.generated_folder_path));
    }

    #[tokio::test]
    async fn test_payment_intent_survives_generation() {
        let fx = fixture().await;
        let orchestrator = orchestrator(&fx, Arc::new(MockTransformer::new()));

        let mut record = fx.store.find_by_id(fx.record_id).unwrap().unwrap();
        record.attach_payment_intent("pi_during_generation");
        fx.store.update(&record).unwrap();

        orchestrator.generate(&fx.token).await.unwrap();
        let record = fx.store.find_by_id(fx.record_id).unwrap().unwrap();
        assert_eq!(record.payment_intent_ref.as_deref(), Some("pi_during_generation"));
    }

    #[tokio::test]
    async fn test_unknown_token_is_not_found() {
        let fx = fixture().await;
        let mock = Arc::new(MockTransformer::new());
        let orchestrator = orchestrator(&fx, mock.clone());

        let unknown = fx.codec.encode(fx.record_id + 50).unwrap();
        assert!(matches!(orchestrator.generate(&unknown).await, Err(FurbleError::NotFound(_))));
        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test]
    async fn test_transformer_failure_leaves_record_untouched() {
        let fx = fixture().await;
        let orchestrator = orchestrator(&fx, Arc::new(MockTransformer::failing()));

        let err = orchestrator.generate(&fx.token).await.unwrap_err();
        assert!(matches!(err, FurbleError::Transformer(_)));

        let record = fx.store.find_by_id(fx.record_id).unwrap().unwrap();
        assert!(record.generated_folder_path.is_none());
    }

    #[tokio::test]
    async fn test_invalid_payload_is_internal() {
        let fx = fixture().await;
        let orchestrator = orchestrator(&fx, Arc::new(MockTransformer::with_payload("%%% not base64")));

        let err = orchestrator.generate(&fx.token).await.unwrap_err();
        assert_eq!(err.kind(), furble_core::ErrorKind::Internal);
        assert!(!fx.dir.path().join(GENERATED_DIR).exists());
    }

    #[tokio::test]
    async fn test_unknown_subject_rejected() {
        let fx = fixture().await;
        let orchestrator = orchestrator(&fx, Arc::new(MockTransformer::new()));

        let err = orchestrator.generate_for(&fx.token, "ferret").await.unwrap_err();
        assert!(matches!(err, FurbleError::Validation(_)));
    }
}

//! Image Transformer Strategy
//!
//! Common interface for AI image-editing backends. Generation orchestration
//! only talks to this trait, so OpenAI can be swapped for a mock in tests or
//! another provider later.

use async_trait::async_trait;

use crate::error::Result;

/// An image handed to the transformer
#[derive(Clone, Debug)]
pub struct ImageAsset {
    /// File name reported to the backend (drives its format detection)
    pub file_name: String,

    /// MIME type of `bytes`
    pub mime_type: String,

    pub bytes: Vec<u8>,
}

impl ImageAsset {
    pub fn png(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: "image/png".into(),
            bytes,
        }
    }
}

/// Strategy trait for image transformers
#[async_trait]
pub trait ImageTransformer: Send + Sync {
    /// Edit `source` following `prompt`, using `template` as the style/composition reference.
    ///
    /// Returns the resulting image as a base64 payload.
    async fn edit(
        &self,
        template: &ImageAsset,
        source: &ImageAsset,
        prompt: &str,
    ) -> Result<String>;

    /// Backend name, for logs
    fn name(&self) -> &str;
}

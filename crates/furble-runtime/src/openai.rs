//! OpenAI Image Transformer
//!
//! Implementation of `ImageTransformer` on top of the `/v1/images/edits` endpoint.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use furble_core::{
    AppConfig,
    error::{FurbleError, Result},
    transformer::{ImageAsset, ImageTransformer},
};

/// OpenAI transformer configuration
#[derive(Clone)]
pub struct OpenAiConfig {
    pub api_key: String,

    /// Image model (e.g. "gpt-image-1")
    pub model: String,

    /// API base URL, without trailing slash
    pub base_url: String,
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: "gpt-image-1".into(),
            base_url: "https://api.openai.com/v1".into(),
        }
    }

    /// Build from the application config; None when no API key is configured.
    pub fn from_app_config(config: &AppConfig) -> Option<Self> {
        config.transformer_api_key.as_ref().map(|key| Self {
            model: config.transformer_model.clone(),
            ..Self::new(key.clone())
        })
    }
}

#[derive(Deserialize, Debug)]
struct ImagesResponse {
    #[serde(default)]
    data: Vec<ImageData>,
}

#[derive(Deserialize, Debug)]
struct ImageData {
    #[serde(default)]
    b64_json: Option<String>,
}

/// OpenAI image-edit transformer
pub struct OpenAiTransformer {
    client: reqwest::Client,
    config: OpenAiConfig,
}

impl OpenAiTransformer {
    pub fn new(config: OpenAiConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn image_part(asset: &ImageAsset) -> Result<Part> {
        Part::bytes(asset.bytes.clone())
            .file_name(asset.file_name.clone())
            .mime_str(&asset.mime_type)
            .map_err(|e| FurbleError::Transformer(format!("invalid image part: {e}")))
    }

    /// Pull the first base64 image out of an images API response body.
    fn extract_b64(body: &[u8]) -> Result<String> {
        let parsed: ImagesResponse = serde_json::from_slice(body)
            .map_err(|e| FurbleError::Transformer(format!("unreadable images response: {e}")))?;

        parsed
            .data
            .into_iter()
            .next()
            .and_then(|d| d.b64_json)
            .ok_or_else(|| FurbleError::Transformer("images response carried no b64_json".into()))
    }
}

#[async_trait]
impl ImageTransformer for OpenAiTransformer {
    async fn edit(&self, template: &ImageAsset, source: &ImageAsset, prompt: &str) -> Result<String> {
        let form = Form::new()
            .text("model", self.config.model.clone())
            .text("prompt", prompt.to_string())
            .part("image[]", Self::image_part(template)?)
            .part("image[]", Self::image_part(source)?);

        let response = self
            .client
            .post(format!("{}/images/edits", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| FurbleError::Transformer(e.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| FurbleError::Transformer(e.to_string()))?;

        if !status.is_success() {
            tracing::warn!(%status, model = %self.config.model, "OpenAI image edit rejected");
            return Err(FurbleError::Transformer(format!(
                "images API error {status}: {}",
                String::from_utf8_lossy(&body)
            )));
        }

        Self::extract_b64(&body)
    }

    fn name(&self) -> &str {
        "OpenAI"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = OpenAiConfig::new("sk-test");
        assert_eq!(config.model, "gpt-image-1");
        assert_eq!(config.base_url, "https://api.openai.com/v1");
    }

    #[test]
    fn test_config_from_app_config() {
        let app = AppConfig::from_lookup(|key| match key {
            "FURBLE_SECRET_KEY" => Some("s".into()),
            "OPENAI_API_KEY" => Some("sk-live".into()),
            "OPENAI_IMAGE_MODEL" => Some("gpt-image-1.5".into()),
            _ => None,
        })
        .unwrap();

        let config = OpenAiConfig::from_app_config(&app).unwrap();
        assert_eq!(config.api_key, "sk-live");
        assert_eq!(config.model, "gpt-image-1.5");
    }

    #[test]
    fn test_extract_b64() {
        let body = br#"{"created": 1, "data": [{"b64_json": "aGVsbG8="}]}"#;
        assert_eq!(OpenAiTransformer::extract_b64(body).unwrap(), "aGVsbG8=");
    }

    #[test]
    fn test_extract_b64_missing() {
        assert!(OpenAiTransformer::extract_b64(br#"{"data": []}"#).is_err());
        assert!(OpenAiTransformer::extract_b64(br#"{"data": [{"url": "https://x"}]}"#).is_err());
        assert!(OpenAiTransformer::extract_b64(b"<html>").is_err());
    }
}

//! Mock Transformer
//!
//! For testing and local demos. Returns a fixed 1x1 PNG without touching the network.

use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use furble_core::{
    error::{FurbleError, Result},
    transformer::{ImageAsset, ImageTransformer},
};

/// Transparent 1x1 PNG, base64
pub const ONE_PIXEL_PNG_B64: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

/// Mock transformer with a canned response
pub struct MockTransformer {
    payload: String,
    fail: bool,
    calls: AtomicUsize,
    last_prompt: Mutex<Option<String>>,
}

impl Default for MockTransformer {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransformer {
    pub fn new() -> Self {
        Self::with_payload(ONE_PIXEL_PNG_B64)
    }

    /// Respond with an arbitrary payload (need not be valid base64)
    pub fn with_payload(payload: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
            fail: false,
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        }
    }

    /// Every call fails like an unreachable backend
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().ok().and_then(|p| p.clone())
    }
}

#[async_trait]
impl ImageTransformer for MockTransformer {
    async fn edit(&self, _template: &ImageAsset, _source: &ImageAsset, prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_prompt.lock() {
            *last = Some(prompt.to_string());
        }

        if self.fail {
            return Err(FurbleError::Transformer("mock transformer offline".into()));
        }
        Ok(self.payload.clone())
    }

    fn name(&self) -> &str {
        "MockTransformer"
    }
}

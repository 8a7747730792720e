//! Blob Storage
//!
//! Uploaded images, generated folders and archives are addressed by relative
//! locators such as `uploaded_images/<uuid>.png`. The store resolves them
//! against its root.

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};

use crate::error::{FurbleError, Result};

/// Directory for canonical uploads
pub const UPLOAD_DIR: &str = "uploaded_images";

/// Directory for generation output folders and archives
pub const GENERATED_DIR: &str = "generated_images";

/// Blob storage trait (Strategy pattern)
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Write bytes, creating parent folders as needed
    async fn write(&self, locator: &str, bytes: &[u8]) -> Result<()>;

    async fn read(&self, locator: &str) -> Result<Vec<u8>>;

    /// Remove a file or a whole folder
    async fn delete(&self, locator: &str) -> Result<()>;

    /// Filesystem path for collaborators that need one (archiver)
    fn resolve(&self, locator: &str) -> Result<PathBuf>;
}

/// Blob store backed by a local directory
#[derive(Clone, Debug)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn write(&self, locator: &str, bytes: &[u8]) -> Result<()> {
        let path = self.resolve(locator)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        Ok(())
    }

    async fn read(&self, locator: &str) -> Result<Vec<u8>> {
        let path = self.resolve(locator)?;
        Ok(tokio::fs::read(&path).await?)
    }

    async fn delete(&self, locator: &str) -> Result<()> {
        let path = self.resolve(locator)?;
        let meta = tokio::fs::metadata(&path).await?;
        if meta.is_dir() {
            tokio::fs::remove_dir_all(&path).await?;
        } else {
            tokio::fs::remove_file(&path).await?;
        }
        Ok(())
    }

    fn resolve(&self, locator: &str) -> Result<PathBuf> {
        let relative = Path::new(locator);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if locator.is_empty() || escapes {
            return Err(FurbleError::Storage(format!("invalid blob locator '{locator}'")));
        }
        Ok(self.root.join(relative))
    }
}

//! Folder Archiver
//!
//! Packs a generated folder into a deflated zip next to it in blob storage.

use std::fs::File;
use std::io;
use std::path::Path;
use std::sync::Arc;

use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use furble_core::{
    BlobStore, GENERATED_DIR,
    error::{FurbleError, Result},
};

/// Archiver trait
pub trait Archiver: Send + Sync {
    /// Package every file under `folder` and return the archive locator
    fn package_folder(&self, folder: &str) -> Result<String>;
}

/// Zip archiver over the local blob root
pub struct ZipArchiver {
    blobs: Arc<dyn BlobStore>,
}

impl ZipArchiver {
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self { blobs }
    }
}

fn archive_error(error: impl std::fmt::Display) -> FurbleError {
    FurbleError::Archive(error.to_string())
}

fn zip_folder(source: &Path, target: &Path) -> Result<()> {
    let file = File::create(target)?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for entry in WalkDir::new(source).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(archive_error)?;
        let relative = entry.path().strip_prefix(source).map_err(archive_error)?;
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        if entry.file_type().is_dir() {
            zip.add_directory(format!("{name}/"), options).map_err(archive_error)?;
        } else {
            zip.start_file(name, options).map_err(archive_error)?;
            let mut f = File::open(entry.path())?;
            io::copy(&mut f, &mut zip)?;
        }
    }

    zip.finish().map_err(archive_error)?;
    Ok(())
}

impl Archiver for ZipArchiver {
    fn package_folder(&self, folder: &str) -> Result<String> {
        let source = self.blobs.resolve(folder)?;
        if !source.is_dir() {
            return Err(FurbleError::Archive(format!("'{folder}' is not a folder")));
        }

        let locator = format!("{GENERATED_DIR}/{}.zip", uuid::Uuid::new_v4());
        let target = self.blobs.resolve(&locator)?;
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }

        if let Err(e) = zip_folder(&source, &target) {
            if let Err(cleanup) = std::fs::remove_file(&target) {
                tracing::warn!(archive = %locator, error = %cleanup, "Failed to remove partial archive");
            }
            return Err(e);
        }

        Ok(locator)
    }
}

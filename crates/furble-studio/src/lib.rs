//! # furble-studio
//!
//! The image side of the pet-portrait lifecycle.
//!
//! ```text
//! bytes + content-type
//!   │
//!   ▼
//! ImageIngestor ── type? size? sniff ──▶ RGB/RGBA ──▶ PNG ──▶ uploaded_images/<uuid>.png
//!   │                                                          + record (unpaid, ungenerated)
//!   ▼
//! GenerationOrchestrator ── template + upload + prompt ──▶ transformer
//!   │                                       generated_images/<uuid>/generated_image.png
//!   ▼
//! DownloadGate ── paid? generated? ──▶ generated_images/<uuid>.zip
//! ```
//!
//! Payment state is owned by `furble-payments`; this crate only reads it.

pub mod archive;
pub mod download;
pub mod generation;
pub mod imaging;
pub mod ingest;

pub use archive::{Archiver, ZipArchiver};
pub use download::{DownloadArtifact, DownloadGate};
pub use generation::{GENERATED_FILE_NAME, GeneratedImage, GenerationOrchestrator};
pub use ingest::{ImageIngestor, IngestedImage, MAX_IMAGE_SIZE};

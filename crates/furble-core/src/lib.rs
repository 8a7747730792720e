//! # furble-core
//!
//! Shared building blocks for the Fur & Furble pet-portrait backend.
//!
//! ## Lifecycle
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌─────────────┐   ┌─────────┐   ┌──────────┐
//! │  upload  │──▶│ generate │──▶│ create      │──▶│ confirm │──▶│ download │
//! │ (record) │   │ (folder) │   │ intent (ref)│   │ (paid)  │   │ (zip)    │
//! └──────────┘   └──────────┘   └─────────────┘   └─────────┘   └──────────┘
//! ```
//!
//! Every step after upload addresses the image by its encoded id (see
//! [`codec::IdCodec`]); the raw integer never leaves the process.
//!
//! This crate holds the record model, the identifier codec and the traits for
//! the external collaborators (record store, blob storage, image transformer).

pub mod codec;
pub mod config;
pub mod error;
pub mod prompt;
pub mod record;
pub mod storage;
pub mod transformer;

pub use codec::IdCodec;
pub use config::AppConfig;
pub use error::{ErrorKind, FurbleError, Result};
pub use prompt::{DEFAULT_SUBJECT, PromptBook};
pub use record::{
    MemoryPetImageStore, NewPetImage, PetImageRecord, PetImageStore, find_by_token,
};
pub use storage::{BlobStore, GENERATED_DIR, LocalBlobStore, UPLOAD_DIR};
pub use transformer::{ImageAsset, ImageTransformer};

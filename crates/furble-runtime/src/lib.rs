//! # furble-runtime
//!
//! Concrete integrations behind the `furble-core` traits.
//!
//! ## Integrations
//!
//! - **OpenAI** (default): image edits via `/v1/images/edits`
//! - **SQLite** (default): persistent `PetImageStore`
//! - **Mock**: canned transformer for tests and offline demos
//!
//! ## Usage
//!
//! ```rust,ignore
//! use furble_runtime::{OpenAiConfig, OpenAiTransformer, SqlitePetImageStore};
//!
//! let store = SqlitePetImageStore::new("furble.db");
//! store.initialize()?;
//!
//! let transformer = OpenAiTransformer::new(OpenAiConfig::new("sk-..."));
//! ```

pub mod mock;

#[cfg(feature = "openai")]
pub mod openai;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use mock::MockTransformer;

#[cfg(feature = "openai")]
pub use openai::{OpenAiConfig, OpenAiTransformer};

#[cfg(feature = "sqlite")]
pub use sqlite::SqlitePetImageStore;

// Re-export core types for convenience
pub use furble_core::{FurbleError, ImageAsset, ImageTransformer, PetImageStore, Result};

//! Pet-Image Records
//!
//! One row per uploaded image, tracking its generated output and payment state.
//!
//! Updates are whole-record writes with no concurrency token: two writers that
//! read the same record and write it back race, and the later write wins. The
//! only field protected against that is `is_paid`, which a store never turns
//! back to `false`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

use crate::codec::IdCodec;
use crate::error::{FurbleError, Result};

/// A persisted pet image
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PetImageRecord {
    /// Store-assigned primary key. Never exposed without encoding.
    pub id: i64,

    /// Locator of the canonical PNG produced at ingestion
    pub source_image_path: String,

    /// Folder holding the latest generation output
    pub generated_folder_path: Option<String>,

    /// Set once a payment is confirmed as succeeded
    pub is_paid: bool,

    /// Latest payment intent created for this image
    pub payment_intent_ref: Option<String>,
}

impl PetImageRecord {
    /// Record the output folder of a generation run, replacing any earlier one.
    pub fn set_generated_folder(&mut self, folder: impl Into<String>) {
        self.generated_folder_path = Some(folder.into());
    }

    /// Bind a payment intent, replacing any earlier one.
    pub fn attach_payment_intent(&mut self, reference: impl Into<String>) {
        self.payment_intent_ref = Some(reference.into());
    }

    /// Flip the paid flag. Returns `false` when it was already set.
    pub fn mark_paid(&mut self) -> bool {
        if self.is_paid {
            return false;
        }
        self.is_paid = true;
        true
    }
}

/// Fields supplied when a record is created
#[derive(Clone, Debug)]
pub struct NewPetImage {
    pub source_image_path: String,
}

/// Record store trait
pub trait PetImageStore: Send + Sync {
    /// Insert a new unpaid, ungenerated record and return it with its id
    fn create(&self, image: NewPetImage) -> Result<PetImageRecord>;

    /// Get record by id
    fn find_by_id(&self, id: i64) -> Result<Option<PetImageRecord>>;

    /// Get the record currently bound to a payment intent
    fn find_by_payment_ref(&self, reference: &str) -> Result<Option<PetImageRecord>>;

    /// Persist every mutable field of an existing record.
    ///
    /// Fails if the record does not exist or if its payment reference is
    /// already bound to a different record.
    fn update(&self, record: &PetImageRecord) -> Result<()>;
}

/// Decode an external token and load its record.
///
/// Malformed tokens and unknown ids are both reported as "not found", so a
/// caller cannot tell a forged token from a deleted or never-issued one.
pub fn find_by_token(
    store: &dyn PetImageStore,
    codec: &IdCodec,
    token: &str,
) -> Result<PetImageRecord> {
    let id = codec.decode(token).map_err(|e| {
        tracing::debug!(error = %e, "Undecodable image token");
        FurbleError::record_not_found()
    })?;

    store.find_by_id(id)?.ok_or_else(FurbleError::record_not_found)
}

/// In-memory record store (for development and tests)
///
/// Records, the payment-ref index and the id counter share one lock.
pub struct MemoryPetImageStore {
    inner: RwLock<MemoryInner>,
}

struct MemoryInner {
    records: HashMap<i64, PetImageRecord>,
    by_payment_ref: HashMap<String, i64>,
    next_id: i64,
}

impl Default for MemoryPetImageStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryPetImageStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryInner {
                records: HashMap::new(),
                by_payment_ref: HashMap::new(),
                next_id: 1,
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|inner| inner.records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<T>(_: T) -> FurbleError {
    FurbleError::Storage("record store lock poisoned".into())
}

impl PetImageStore for MemoryPetImageStore {
    fn create(&self, image: NewPetImage) -> Result<PetImageRecord> {
        let mut inner = self.inner.write().map_err(poisoned)?;

        let record = PetImageRecord {
            id: inner.next_id,
            source_image_path: image.source_image_path,
            generated_folder_path: None,
            is_paid: false,
            payment_intent_ref: None,
        };
        inner.next_id += 1;
        inner.records.insert(record.id, record.clone());

        Ok(record)
    }

    fn find_by_id(&self, id: i64) -> Result<Option<PetImageRecord>> {
        let inner = self.inner.read().map_err(poisoned)?;
        Ok(inner.records.get(&id).cloned())
    }

    fn find_by_payment_ref(&self, reference: &str) -> Result<Option<PetImageRecord>> {
        let inner = self.inner.read().map_err(poisoned)?;
        Ok(inner
            .by_payment_ref
            .get(reference)
            .and_then(|id| inner.records.get(id))
            .cloned())
    }

    fn update(&self, record: &PetImageRecord) -> Result<()> {
        let mut guard = self.inner.write().map_err(poisoned)?;
        let MemoryInner {
            records,
            by_payment_ref,
            ..
        } = &mut *guard;

        let existing = records
            .get_mut(&record.id)
            .ok_or_else(|| FurbleError::Storage(format!("record {} does not exist", record.id)))?;

        if let Some(reference) = &record.payment_intent_ref {
            if by_payment_ref.get(reference).is_some_and(|owner| *owner != record.id) {
                return Err(FurbleError::Storage(
                    "payment intent is already bound to another image".into(),
                ));
            }
        }

        if existing.payment_intent_ref != record.payment_intent_ref {
            if let Some(old) = &existing.payment_intent_ref {
                by_payment_ref.remove(old);
            }
            if let Some(new) = &record.payment_intent_ref {
                by_payment_ref.insert(new.clone(), record.id);
            }
        }

        let was_paid = existing.is_paid;
        *existing = record.clone();
        existing.is_paid |= was_paid;

        Ok(())
    }
}

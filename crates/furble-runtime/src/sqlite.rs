//! SQLite Record Store
//!
//! `PetImageStore` backed by a single `pet_images` table. A connection is
//! opened per call, so the store is cheap to share across request handlers.
//! Calls made from a multi-threaded tokio runtime hand their worker over to
//! the blocking pool while SQLite runs.

use std::fs;
use std::path::PathBuf;

use rusqlite::{Connection, OptionalExtension, Row, params};
use tokio::runtime::{Handle, RuntimeFlavor};

use furble_core::{
    error::{FurbleError, Result},
    record::{NewPetImage, PetImageRecord, PetImageStore},
};

const MIGRATIONS: &[&str] = &["CREATE TABLE IF NOT EXISTS pet_images (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        image_url TEXT NOT NULL,
        generated_images_folder_path TEXT NULL,
        is_payed INTEGER NOT NULL DEFAULT 0,
        stripe_payment_id TEXT NULL UNIQUE
    );"];

const SELECT_COLUMNS: &str =
    "SELECT id, image_url, generated_images_folder_path, is_payed, stripe_payment_id FROM pet_images";

fn persistence(error: rusqlite::Error) -> FurbleError {
    FurbleError::Storage(error.to_string())
}

/// Run `f` so that a tokio worker is not stalled by file I/O.
///
/// `block_in_place` is only legal on the multi-threaded runtime; anywhere
/// else the call runs inline.
fn blocking<T>(f: impl FnOnce() -> T) -> T {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(f)
        }
        _ => f(),
    }
}

fn map_record(row: &Row<'_>) -> rusqlite::Result<PetImageRecord> {
    Ok(PetImageRecord {
        id: row.get(0)?,
        source_image_path: row.get(1)?,
        generated_folder_path: row.get(2)?,
        is_paid: row.get(3)?,
        payment_intent_ref: row.get(4)?,
    })
}

#[derive(Debug, Clone)]
pub struct SqlitePetImageStore {
    path: PathBuf,
}

impl SqlitePetImageStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Create the database file and schema if missing
    pub fn initialize(&self) -> Result<()> {
        if self.path.as_os_str().is_empty() {
            return Err(FurbleError::Config("database path must not be empty".into()));
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let conn = self.open_connection()?;
        conn.execute_batch("PRAGMA journal_mode=WAL;").map_err(persistence)?;
        for migration in MIGRATIONS {
            conn.execute_batch(migration).map_err(persistence)?;
        }

        Ok(())
    }

    fn open_connection(&self) -> Result<Connection> {
        Connection::open(&self.path).map_err(persistence)
    }
}

impl SqlitePetImageStore {
    fn insert(&self, image: NewPetImage) -> Result<PetImageRecord> {
        let conn = self.open_connection()?;
        conn.execute(
            "INSERT INTO pet_images (image_url, generated_images_folder_path, is_payed)
             VALUES (?1, NULL, 0)",
            params![image.source_image_path],
        )
        .map_err(persistence)?;

        Ok(PetImageRecord {
            id: conn.last_insert_rowid(),
            source_image_path: image.source_image_path,
            generated_folder_path: None,
            is_paid: false,
            payment_intent_ref: None,
        })
    }

    fn select_one(&self, filter: &str, value: impl rusqlite::ToSql) -> Result<Option<PetImageRecord>> {
        let conn = self.open_connection()?;
        conn.query_row(&format!("{SELECT_COLUMNS} WHERE {filter} = ?1"), params![value], map_record)
            .optional()
            .map_err(persistence)
    }

    fn write(&self, record: &PetImageRecord) -> Result<()> {
        let conn = self.open_connection()?;
        // is_payed only ever moves from 0 to 1
        let changed = conn
            .execute(
                "UPDATE pet_images
                 SET generated_images_folder_path = ?2,
                     is_payed = MAX(is_payed, ?3),
                     stripe_payment_id = ?4
                 WHERE id = ?1",
                params![
                    record.id,
                    record.generated_folder_path,
                    record.is_paid,
                    record.payment_intent_ref,
                ],
            )
            .map_err(persistence)?;

        if changed == 0 {
            return Err(FurbleError::Storage(format!("record {} does not exist", record.id)));
        }
        Ok(())
    }
}

impl PetImageStore for SqlitePetImageStore {
    fn create(&self, image: NewPetImage) -> Result<PetImageRecord> {
        blocking(|| self.insert(image))
    }

    fn find_by_id(&self, id: i64) -> Result<Option<PetImageRecord>> {
        blocking(|| self.select_one("id", id))
    }

    fn find_by_payment_ref(&self, reference: &str) -> Result<Option<PetImageRecord>> {
        blocking(|| self.select_one("stripe_payment_id", reference))
    }

    fn update(&self, record: &PetImageRecord) -> Result<()> {
        blocking(|| self.write(record))
    }
}

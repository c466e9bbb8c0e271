//! Persistent flashcard storage.
//!
//! [`RecordStore`] is the capability the ingestion pipeline and the HTTP
//! handlers rely on; [`vector::VectorStore`] is the on-disk implementation.

pub mod vector;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::models::StoredFlashcard;

pub use vector::VectorStore;

/// A record ready to be written: the flashcard, the text that was embedded
/// and its embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreEntry {
    pub record: StoredFlashcard,
    pub content: String,
    pub embedding: Vec<f32>,
}

impl StoreEntry {
    pub fn id(&self) -> &str {
        &self.record.id
    }
}

/// Keyed access to stored flashcards.
pub trait RecordStore: Send + Sync {
    /// Whether a record with this id is stored. Absent ids and empty stores
    /// report `false`.
    fn exists(&self, id: &str) -> Result<bool>;

    /// Insert every entry whose id is not yet stored, in one write.
    /// Returns the ids that were already present and were left untouched.
    fn add(&self, entries: Vec<StoreEntry>) -> Result<Vec<String>>;

    fn get(&self, id: &str) -> Result<Option<StoredFlashcard>>;

    /// Every stored record, in no particular order.
    fn get_all(&self) -> Result<Vec<StoredFlashcard>>;

    /// Remove a record. Returns `false` when nothing was stored under `id`.
    fn delete(&self, id: &str) -> Result<bool>;

    fn count(&self) -> Result<usize>;
}

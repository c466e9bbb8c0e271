use anyhow::{Context, Result};
use parking_lot::RwLock;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use super::{RecordStore, StoreEntry};
use crate::models::{FlashcardHit, StoredFlashcard};

/// In-memory flashcard collection with disk persistence and cosine
/// similarity search.
pub struct VectorStore {
    entries: RwLock<Vec<StoreEntry>>,
    persist_path: PathBuf,
}

impl VectorStore {
    /// Open the collection stored in `collection_dir`, creating it if needed.
    /// A missing file opens as an empty collection. An unreadable one is moved
    /// aside to `vectors.json.corrupt` first, so later writes cannot clobber it.
    pub fn open_or_create(collection_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(collection_dir).with_context(|| {
            format!("Failed to create collection dir {}", collection_dir.display())
        })?;
        let persist_path = collection_dir.join("vectors.json");

        let entries: Vec<StoreEntry> = if persist_path.exists() {
            let data = std::fs::read_to_string(&persist_path)
                .context("Failed to read vector store")?;
            match serde_json::from_str(&data) {
                Ok(entries) => entries,
                Err(e) => {
                    let aside = persist_path.with_extension("json.corrupt");
                    std::fs::rename(&persist_path, &aside).with_context(|| {
                        format!("Failed to move aside unreadable {}", persist_path.display())
                    })?;
                    tracing::warn!(
                        "Unreadable vector store {} moved to {}: {e}",
                        persist_path.display(),
                        aside.display()
                    );
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        tracing::debug!(
            "Opened collection {} with {} flashcards",
            collection_dir.display(),
            entries.len()
        );

        Ok(Self {
            entries: RwLock::new(entries),
            persist_path,
        })
    }

    /// Search by cosine similarity against a query embedding.
    pub fn search(&self, query_embedding: &[f32], limit: usize) -> Vec<FlashcardHit> {
        let entries = self.entries.read();

        let mut scored: Vec<(f32, &StoreEntry)> = entries
            .iter()
            .map(|e| (cosine_similarity(query_embedding, &e.embedding), e))
            .collect();

        // Sort descending by score
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);

        scored
            .into_iter()
            .map(|(score, e)| FlashcardHit {
                flashcard: e.record.clone(),
                score,
            })
            .collect()
    }

    /// Write all entries to disk (atomic write via temp file + rename).
    fn persist(&self, entries: &[StoreEntry]) -> Result<()> {
        let data = serde_json::to_string(entries)?;
        let tmp_path = self.persist_path.with_extension("json.tmp");
        std::fs::write(&tmp_path, data).context("Failed to write vector store")?;
        std::fs::rename(&tmp_path, &self.persist_path)
            .context("Failed to replace vector store")?;
        Ok(())
    }
}

impl RecordStore for VectorStore {
    fn exists(&self, id: &str) -> Result<bool> {
        Ok(self.entries.read().iter().any(|e| e.id() == id))
    }

    fn add(&self, new_entries: Vec<StoreEntry>) -> Result<Vec<String>> {
        if new_entries.is_empty() {
            return Ok(Vec::new());
        }

        let mut entries = self.entries.write();
        let mut present: HashSet<String> = entries.iter().map(|e| e.id().to_string()).collect();
        let mut already_present = Vec::new();
        let before = entries.len();

        for entry in new_entries {
            if present.insert(entry.id().to_string()) {
                entries.push(entry);
            } else {
                already_present.push(entry.record.id);
            }
        }

        if entries.len() != before {
            if let Err(e) = self.persist(&entries) {
                // Keep memory and disk in agreement
                entries.truncate(before);
                return Err(e);
            }
        }

        Ok(already_present)
    }

    fn get(&self, id: &str) -> Result<Option<StoredFlashcard>> {
        Ok(self
            .entries
            .read()
            .iter()
            .find(|e| e.id() == id)
            .map(|e| e.record.clone()))
    }

    fn get_all(&self) -> Result<Vec<StoredFlashcard>> {
        Ok(self.entries.read().iter().map(|e| e.record.clone()).collect())
    }

    fn delete(&self, id: &str) -> Result<bool> {
        let mut entries = self.entries.write();
        let Some(pos) = entries.iter().position(|e| e.id() == id) else {
            return Ok(false);
        };

        let removed = entries.remove(pos);
        if let Err(e) = self.persist(&entries) {
            entries.insert(pos, removed);
            return Err(e);
        }
        Ok(true)
    }

    fn count(&self) -> Result<usize> {
        Ok(self.entries.read().len())
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for i in 0..a.len() {
        dot += a[i] * b[i];
        norm_a += a[i] * a[i];
        norm_b += b[i] * b[i];
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        0.0
    } else {
        dot / denom
    }
}

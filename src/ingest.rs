//! Deduplicating flashcard ingestion.
//!
//! Every term is normalized and mapped to a deterministic id, so the id is
//! both the store's primary key and its deduplication key. A batch is checked
//! candidate by candidate, and whatever is new is embedded and written in a
//! single store call.

use std::collections::HashSet;

use anyhow::{Context, Result};
use chrono::Utc;
use uuid::Uuid;

use crate::llm::embeddings::Embedder;
use crate::models::{CandidateBatch, IngestReport, StoredFlashcard};
use crate::store::{RecordStore, StoreEntry};

/// Canonical key for a term: trimmed and lowercased.
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Stable id for a normalized key (UUIDv5 in the DNS namespace).
pub fn derive_id(key: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_DNS, key.as_bytes()).to_string()
}

/// Id of the record a user-typed term refers to.
pub fn id_for_term(term: &str) -> String {
    derive_id(&normalize(term))
}

/// Persist the candidates of `batch` whose normalized term is not stored yet.
///
/// A failing existence check counts as "not stored". Embedding and insert
/// failures are returned and nothing from the batch is written.
pub async fn ingest<S, E>(
    store: &S,
    embedder: &E,
    batch: &CandidateBatch,
) -> Result<IngestReport>
where
    S: RecordStore + ?Sized,
    E: Embedder,
{
    let mut report = IngestReport::default();
    let mut staged: Vec<(StoredFlashcard, String)> = Vec::new();
    let mut staged_ids: HashSet<String> = HashSet::new();

    for candidate in &batch.flashcards {
        let key = normalize(&candidate.term);
        if key.is_empty() {
            report.rejected_terms.push(candidate.term.clone());
            continue;
        }
        let trans_key = normalize(&candidate.translation);
        let id = derive_id(&key);

        if staged_ids.contains(&id) {
            report.skipped_terms.push(candidate.term.clone());
            continue;
        }

        let exists = store.exists(&id).unwrap_or_else(|e| {
            tracing::warn!("Existence check for {id} failed, treating as new: {e:#}");
            false
        });
        if exists {
            report.skipped_terms.push(candidate.term.clone());
            continue;
        }

        staged_ids.insert(id.clone());
        staged.push((
            StoredFlashcard {
                id,
                term: candidate.term.clone(),
                translation: candidate.translation.clone(),
                example: candidate.example.clone(),
                created_at: Utc::now(),
            },
            format!("{key}\n{trans_key}"),
        ));
    }

    if !staged.is_empty() {
        let contents: Vec<String> = staged.iter().map(|(_, content)| content.clone()).collect();
        let embeddings = embedder
            .embed(&contents)
            .await
            .context("Failed to embed new flashcards")?;
        if embeddings.len() != staged.len() {
            anyhow::bail!(
                "Embedder returned {} vectors for {} flashcards",
                embeddings.len(),
                staged.len()
            );
        }

        let staged_count = staged.len();
        let mut terms_by_id = Vec::with_capacity(staged_count);
        let entries: Vec<StoreEntry> = staged
            .into_iter()
            .zip(embeddings)
            .map(|((record, content), embedding)| {
                terms_by_id.push((record.id.clone(), record.term.clone()));
                StoreEntry {
                    record,
                    content,
                    embedding,
                }
            })
            .collect();

        let already_present = store.add(entries).context("Failed to save flashcards")?;

        // Another ingestion stored these between our check and our write
        for id in &already_present {
            if let Some((_, term)) = terms_by_id.iter().find(|(staged_id, _)| staged_id == id) {
                report.skipped_terms.push(term.clone());
            }
        }
        report.added = staged_count - already_present.len();
    }

    report.total_after = store.count().context("Failed to count flashcards")?;

    if report.added > 0 {
        tracing::info!("Added {} new flashcards", report.added);
    }
    if !report.skipped_terms.is_empty() {
        tracing::info!(
            "Skipped {} duplicate flashcards: {:?}",
            report.skipped_terms.len(),
            report.skipped_terms
        );
    }
    if !report.rejected_terms.is_empty() {
        tracing::warn!("Rejected {} flashcards with an empty term", report.rejected_terms.len());
    }

    Ok(report)
}

/// All stored flashcards, newest first.
pub fn list_all<S: RecordStore + ?Sized>(store: &S) -> Result<Vec<StoredFlashcard>> {
    let mut cards = store.get_all()?;
    cards.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(cards)
}

/// Delete the flashcard for `term`. Returns whether anything was removed.
pub fn delete<S: RecordStore + ?Sized>(store: &S, term: &str) -> Result<bool> {
    let removed = store.delete(&id_for_term(term))?;
    if removed {
        tracing::info!("Deleted flashcard: {term}");
    } else {
        tracing::debug!("No flashcard stored for {term}");
    }
    Ok(removed)
}

//! Integration tests for the flashcard pipeline.
//!
//! These tests exercise ingestion, listing, deletion and search against the
//! on-disk vector store without requiring a running LLM (embeddings come from
//! a deterministic stand-in).

use std::future::Future;

use flashcards::ingest::{self, derive_id, normalize};
use flashcards::llm::embeddings::Embedder;
use flashcards::llm::extract::parse_flashcards;
use flashcards::models::{CandidateBatch, Flashcard};
use flashcards::store::{RecordStore, VectorStore};

/// Embeds text as letter frequencies, so similar words land close together.
struct LetterEmbedder;

impl Embedder for LetterEmbedder {
    fn embed(
        &self,
        texts: &[String],
    ) -> impl Future<Output = anyhow::Result<Vec<Vec<f32>>>> + Send {
        let vectors: Vec<Vec<f32>> = texts.iter().map(|t| letter_vector(t)).collect();
        async move { Ok(vectors) }
    }
}

fn letter_vector(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; 26];
    for c in text.chars().filter(|c| c.is_ascii_lowercase()) {
        v[(c as u8 - b'a') as usize] += 1.0;
    }
    v
}

fn card(term: &str, translation: &str, example: &str) -> Flashcard {
    Flashcard::new(term, translation, example)
}

#[tokio::test]
async fn test_end_to_end_ingest_list_delete() {
    let dir = tempfile::tempdir().unwrap();
    let store = VectorStore::open_or_create(dir.path()).unwrap();

    let batch = CandidateBatch::new(vec![card("bonjour", "hola", "Bonjour!")]);
    let report = ingest::ingest(&store, &LetterEmbedder, &batch).await.unwrap();
    assert_eq!(report.added, 1);
    assert_eq!(report.total_after, 1);

    let cards = ingest::list_all(&store).unwrap();
    assert_eq!(cards.len(), 1);
    assert_eq!(cards[0].term, "bonjour");
    assert_eq!(cards[0].translation, "hola");
    assert_eq!(cards[0].example, "Bonjour!");
    assert_eq!(cards[0].id, derive_id("bonjour"));

    assert!(ingest::delete(&store, "bonjour").unwrap());
    assert!(ingest::list_all(&store).unwrap().is_empty());
}

#[tokio::test]
async fn test_reingest_same_term_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let store = VectorStore::open_or_create(dir.path()).unwrap();
    let batch = CandidateBatch::new(vec![card("Maison", "casa", "La maison est belle.")]);

    let first = ingest::ingest(&store, &LetterEmbedder, &batch).await.unwrap();
    assert_eq!(first.added, 1);
    assert!(first.skipped_terms.is_empty());

    let second = ingest::ingest(&store, &LetterEmbedder, &batch).await.unwrap();
    assert_eq!(second.added, 0);
    assert_eq!(second.skipped_terms, vec!["Maison".to_string()]);
    assert_eq!(second.total_after, 1);
}

#[tokio::test]
async fn test_case_variants_in_one_batch_store_one_record() {
    let dir = tempfile::tempdir().unwrap();
    let store = VectorStore::open_or_create(dir.path()).unwrap();
    let batch = CandidateBatch::new(vec![
        card("chat", "gato", "Le chat dort."),
        card("Chat", "Gato", "Le Chat Noir."),
    ]);

    let report = ingest::ingest(&store, &LetterEmbedder, &batch).await.unwrap();
    assert_eq!(report.added, 1);
    assert_eq!(report.skipped_terms, vec!["Chat".to_string()]);
    assert_eq!(store.count().unwrap(), 1);
    assert_eq!(store.get(&derive_id("chat")).unwrap().unwrap().translation, "gato");
}

#[test]
fn test_delete_missing_term_is_noop() {
    let dir = tempfile::tempdir().unwrap();
    let store = VectorStore::open_or_create(dir.path()).unwrap();
    assert!(!ingest::delete(&store, "inexistant").unwrap());
}

#[tokio::test]
async fn test_collection_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    {
        let store = VectorStore::open_or_create(dir.path()).unwrap();
        let batch = CandidateBatch::new(vec![
            card("pomme", "manzana", ""),
            card("poire", "pera", ""),
        ]);
        ingest::ingest(&store, &LetterEmbedder, &batch).await.unwrap();
    }

    let store = VectorStore::open_or_create(dir.path()).unwrap();
    assert_eq!(store.count().unwrap(), 2);

    // Identity is stable across processes
    let again = CandidateBatch::new(vec![card(" POMME ", "manzana", "")]);
    let report = ingest::ingest(&store, &LetterEmbedder, &again).await.unwrap();
    assert_eq!(report.added, 0);
    assert_eq!(report.skipped_terms, vec![" POMME ".to_string()]);
}

#[tokio::test]
async fn test_model_reply_to_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = VectorStore::open_or_create(dir.path()).unwrap();

    let reply = r#"{"flashcards": [
        {"palabra": "souligner", "traduccion": "subrayar", "ejemplo_fr": "Il faut souligner ce mot."},
        {"term": "surligneur", "translation": "rotulador", "example": "J'ai un surligneur jaune."}
    ]}"#;
    let batch = parse_flashcards(reply).unwrap();
    let report = ingest::ingest(&store, &LetterEmbedder, &batch).await.unwrap();
    assert_eq!(report.added, 2);

    let terms: Vec<String> = ingest::list_all(&store)
        .unwrap()
        .into_iter()
        .map(|c| c.term)
        .collect();
    assert!(terms.contains(&"souligner".to_string()));
    assert!(terms.contains(&"surligneur".to_string()));
}

#[test]
fn test_malformed_model_reply_is_reported_not_raised() {
    let err = parse_flashcards("not json").unwrap_err();
    assert_eq!(err.raw(), Some("not json"));
}

#[tokio::test]
async fn test_search_finds_closest_card() {
    let dir = tempfile::tempdir().unwrap();
    let store = VectorStore::open_or_create(dir.path()).unwrap();
    let batch = CandidateBatch::new(vec![
        card("zzz", "sueño", ""),
        card("abc", "alfabeto", ""),
        card("xyz", "fin", ""),
    ]);
    ingest::ingest(&store, &LetterEmbedder, &batch).await.unwrap();

    let hits = store.search(&letter_vector(&normalize("ZZZ")), 1);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].flashcard.term, "zzz");
}

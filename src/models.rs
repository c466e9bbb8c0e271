use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A vocabulary item as produced by the model, before it is stored.
///
/// The Spanish aliases accept responses written against the original
/// prompt format (`palabra`, `traduccion`, `ejemplo_fr`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flashcard {
    #[serde(alias = "palabra")]
    pub term: String,
    #[serde(alias = "traduccion")]
    pub translation: String,
    #[serde(default, alias = "ejemplo_fr", alias = "ejemplo")]
    pub example: String,
}

impl Flashcard {
    pub fn new(term: &str, translation: &str, example: &str) -> Self {
        Self {
            term: term.to_string(),
            translation: translation.to_string(),
            example: example.to_string(),
        }
    }
}

/// Flashcards produced by one extraction or generation call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateBatch {
    pub flashcards: Vec<Flashcard>,
}

impl CandidateBatch {
    pub fn new(flashcards: Vec<Flashcard>) -> Self {
        Self { flashcards }
    }

    pub fn len(&self) -> usize {
        self.flashcards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flashcards.is_empty()
    }
}

/// A persisted flashcard. `id` is derived from the normalized term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredFlashcard {
    pub id: String,
    pub term: String,
    pub translation: String,
    pub example: String,
    pub created_at: DateTime<Utc>,
}

impl StoredFlashcard {
    pub fn to_flashcard(&self) -> Flashcard {
        Flashcard {
            term: self.term.clone(),
            translation: self.translation.clone(),
            example: self.example.clone(),
        }
    }
}

/// Outcome of one ingestion call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestReport {
    pub added: usize,
    /// Terms already present in the store, or repeated within the batch
    pub skipped_terms: Vec<String>,
    /// Terms that normalize to an empty key
    pub rejected_terms: Vec<String>,
    pub total_after: usize,
}

/// A similarity search result
#[derive(Debug, Clone, Serialize)]
pub struct FlashcardHit {
    pub flashcard: StoredFlashcard,
    pub score: f32,
}

/// Generate request
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateRequest {
    pub term: String,
}

/// Search request
#[derive(Debug, Clone, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    10
}

/// LLM config update request
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfigUpdate {
    pub provider: Option<String>,
    // base_url intentionally omitted: immutable at runtime to prevent SSRF
    pub chat_model: Option<String>,
    pub embedding_model: Option<String>,
    pub api_key: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flashcard_accepts_english_keys() {
        let card: Flashcard = serde_json::from_str(
            r#"{"term": "maison", "translation": "casa", "example": "La maison est grande."}"#,
        )
        .unwrap();
        assert_eq!(card, Flashcard::new("maison", "casa", "La maison est grande."));
    }

    #[test]
    fn test_flashcard_accepts_legacy_spanish_keys() {
        let card: Flashcard = serde_json::from_str(
            r#"{"palabra": "chat", "traduccion": "gato", "ejemplo_fr": "Le chat dort."}"#,
        )
        .unwrap();
        assert_eq!(card.term, "chat");
        assert_eq!(card.translation, "gato");
        assert_eq!(card.example, "Le chat dort.");
    }

    #[test]
    fn test_flashcard_example_is_optional() {
        let card: Flashcard =
            serde_json::from_str(r#"{"term": "pain", "translation": "pan"}"#).unwrap();
        assert!(card.example.is_empty());
    }

    #[test]
    fn test_search_request_default_limit() {
        let req: SearchRequest = serde_json::from_str(r#"{"query": "house"}"#).unwrap();
        assert_eq!(req.limit, 10);
    }
}

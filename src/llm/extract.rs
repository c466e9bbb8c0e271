//! Flashcard extraction from page photos and generation for typed terms.
//!
//! Both calls ask the model for `{"flashcards": [{term, translation, example}]}`
//! and validate the reply into a [`CandidateBatch`]. A reply that does not
//! match comes back as [`ModelError::Contract`] with the raw text attached, so
//! callers can show it instead of failing.

use crate::config::{LanguageConfig, LlmConfig};
use crate::llm::chat::{complete_json, InlineImage};
use crate::models::CandidateBatch;

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("the model did not return valid flashcard JSON: {reason}")]
    Contract { reason: String, raw: String },

    #[error("invalid input: {0}")]
    Input(String),

    #[error("model request failed: {0:#}")]
    Transport(#[from] anyhow::Error),
}

impl ModelError {
    /// The raw model reply, when the failure was a contract violation.
    pub fn raw(&self) -> Option<&str> {
        match self {
            Self::Contract { raw, .. } => Some(raw),
            _ => None,
        }
    }
}

const RESPONSE_SHAPE: &str =
    r#"{"flashcards": [{"term": "...", "translation": "...", "example": "..."}]}"#;

fn extraction_instructions(languages: &LanguageConfig) -> String {
    format!(
        "You are an expert {source} language tutor. Analyse the image and extract ONLY the \
         words or phrases that are highlighted (marked with a highlighter). For each one, give \
         its {target} translation and an example sentence in {source} that uses it. \
         Respond exclusively with a JSON object of this shape: {RESPONSE_SHAPE}. \
         If nothing is highlighted, respond with {{\"flashcards\": []}}.",
        source = languages.source,
        target = languages.target,
    )
}

fn generation_instructions(languages: &LanguageConfig) -> String {
    format!(
        "You are an expert {source} language tutor. Create a flashcard for the term you are \
         given: its {target} translation and an example sentence in {source} that uses it. \
         Respond exclusively with a JSON object of this shape: {RESPONSE_SHAPE}.",
        source = languages.source,
        target = languages.target,
    )
}

/// Extract flashcards for the highlighted words in a photographed page.
pub async fn extract_from_image(
    client: &reqwest::Client,
    config: &LlmConfig,
    languages: &LanguageConfig,
    image_bytes: &[u8],
) -> Result<CandidateBatch, ModelError> {
    let image = sniff_image(image_bytes)?;
    let system = extraction_instructions(languages);

    let raw = complete_json(
        client,
        config,
        &system,
        "Analyse this image and extract the highlighted words in the requested JSON format.",
        Some(&image),
    )
    .await?;

    let batch = parse_flashcards(&raw)?;
    tracing::info!("Model extracted {} flashcards from image", batch.len());
    Ok(batch)
}

/// Generate a flashcard for a single typed term.
pub async fn generate_for_term(
    client: &reqwest::Client,
    config: &LlmConfig,
    languages: &LanguageConfig,
    term: &str,
) -> Result<CandidateBatch, ModelError> {
    let term = term.trim();
    if term.is_empty() {
        return Err(ModelError::Input("term is required".to_string()));
    }

    let system = generation_instructions(languages);
    let user = format!("Create a flashcard for the term: {term}");
    let raw = complete_json(client, config, &system, &user, None).await?;

    parse_flashcards(&raw)
}

/// Check that the upload is an image and detect its MIME type.
fn sniff_image(bytes: &[u8]) -> Result<InlineImage, ModelError> {
    if bytes.is_empty() {
        return Err(ModelError::Input("image is empty".to_string()));
    }
    match infer::get(bytes) {
        Some(kind) if kind.matcher_type() == infer::MatcherType::Image => Ok(InlineImage {
            mime_type: kind.mime_type().to_string(),
            data: bytes.to_vec(),
        }),
        Some(kind) => Err(ModelError::Input(format!(
            "expected an image, got {}",
            kind.mime_type()
        ))),
        None => Err(ModelError::Input("unrecognised file type".to_string())),
    }
}

/// Validate a model reply into a batch. Cards with a blank term are dropped.
pub fn parse_flashcards(content: &str) -> Result<CandidateBatch, ModelError> {
    let parsed = serde_json::from_str::<CandidateBatch>(content).or_else(|first_err| {
        // Tolerate prose or code fences around the object
        match (content.find('{'), content.rfind('}')) {
            (Some(start), Some(end)) if start < end => {
                serde_json::from_str::<CandidateBatch>(&content[start..=end])
            }
            _ => Err(first_err),
        }
    });

    match parsed {
        Ok(mut batch) => {
            batch.flashcards.retain(|c| !c.term.trim().is_empty());
            Ok(batch)
        }
        Err(e) => {
            tracing::warn!("Model reply is not flashcard JSON: {e}. Raw: {content}");
            Err(ModelError::Contract {
                reason: e.to_string(),
                raw: content.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Flashcard;

    const PNG_HEADER: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

    #[test]
    fn test_parse_clean_object() {
        let input = r#"{"flashcards": [{"term": "maison", "translation": "casa", "example": "Ma maison."}]}"#;
        let batch = parse_flashcards(input).unwrap();
        assert_eq!(batch.flashcards, vec![Flashcard::new("maison", "casa", "Ma maison.")]);
    }

    #[test]
    fn test_parse_legacy_keys() {
        let input = r#"{"flashcards": [{"palabra": "chat", "traduccion": "gato", "ejemplo_fr": "Le chat."}]}"#;
        let batch = parse_flashcards(input).unwrap();
        assert_eq!(batch.flashcards[0].term, "chat");
        assert_eq!(batch.flashcards[0].translation, "gato");
    }

    #[test]
    fn test_parse_object_in_markdown_code_block() {
        let input = "```json\n{\"flashcards\": [{\"term\": \"pain\", \"translation\": \"pan\", \"example\": \"\"}]}\n```";
        let batch = parse_flashcards(input).unwrap();
        assert_eq!(batch.len(), 1);
    }

    #[test]
    fn test_parse_empty_list() {
        let batch = parse_flashcards(r#"{"flashcards": []}"#).unwrap();
        assert!(batch.is_empty());
    }

    #[test]
    fn test_parse_drops_blank_terms() {
        let input = r#"{"flashcards": [{"term": "  ", "translation": "x"}, {"term": "eau", "translation": "agua"}]}"#;
        let batch = parse_flashcards(input).unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch.flashcards[0].term, "eau");
    }

    #[test]
    fn test_parse_not_json_keeps_raw_text() {
        let err = parse_flashcards("not json").unwrap_err();
        assert_eq!(err.raw(), Some("not json"));
        assert!(matches!(err, ModelError::Contract { .. }));
    }

    #[test]
    fn test_parse_wrong_shape_is_contract_error() {
        let err = parse_flashcards(r#"{"cards": ["maison"]}"#).unwrap_err();
        assert_eq!(err.raw(), Some(r#"{"cards": ["maison"]}"#));
    }

    #[test]
    fn test_parse_missing_translation_is_contract_error() {
        let err = parse_flashcards(r#"{"flashcards": [{"term": "maison"}]}"#).unwrap_err();
        assert!(matches!(err, ModelError::Contract { .. }));
    }

    #[test]
    fn test_sniff_png() {
        let image = sniff_image(PNG_HEADER).unwrap();
        assert_eq!(image.mime_type, "image/png");
    }

    #[test]
    fn test_sniff_rejects_non_image() {
        let err = sniff_image(b"%PDF-1.7\n").unwrap_err();
        assert!(matches!(err, ModelError::Input(_)));
        let err = sniff_image(&[]).unwrap_err();
        assert!(matches!(err, ModelError::Input(_)));
    }

    #[test]
    fn test_prompts_name_configured_languages() {
        let languages = LanguageConfig {
            source: "German".to_string(),
            target: "English".to_string(),
        };
        let prompt = extraction_instructions(&languages);
        assert!(prompt.contains("German language tutor"));
        assert!(prompt.contains("English translation"));
        assert!(generation_instructions(&languages).contains(RESPONSE_SHAPE));
    }

    #[tokio::test]
    async fn test_generate_rejects_blank_term_without_calling_model() {
        let client = reqwest::Client::new();
        let config = LlmConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            ..LlmConfig::default()
        };
        let err = generate_for_term(&client, &config, &LanguageConfig::default(), "   ")
            .await
            .unwrap_err();
        assert!(matches!(err, ModelError::Input(_)));
    }

    #[tokio::test]
    async fn test_extract_rejects_text_upload_without_calling_model() {
        let client = reqwest::Client::new();
        let config = LlmConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            ..LlmConfig::default()
        };
        let err = extract_from_image(&client, &config, &LanguageConfig::default(), b"hello")
            .await
            .unwrap_err();
        assert!(matches!(err, ModelError::Input(_)));
    }
}

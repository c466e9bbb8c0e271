use axum::extract::State;
use axum::Json;

use crate::models::LlmConfigUpdate;
use crate::state::AppState;

/// Config response with API key redacted
#[derive(serde::Serialize)]
pub struct LlmConfigResponse {
    pub provider: String,
    pub base_url: String,
    pub chat_model: String,
    pub embedding_model: String,
    pub has_api_key: bool,
    pub source_language: String,
    pub target_language: String,
}

/// GET /api/config - Current LLM config
pub async fn get_config(State(state): State<AppState>) -> Json<LlmConfigResponse> {
    Json(redacted(&state))
}

/// PUT /api/config - Update LLM config
pub async fn update_config(
    State(state): State<AppState>,
    Json(update): Json<LlmConfigUpdate>,
) -> Json<LlmConfigResponse> {
    {
        let mut config = state.llm_config.write();

        if let Some(provider) = update.provider {
            config.provider = provider;
        }
        // base_url is immutable at runtime (set via LLM_BASE_URL env var only)
        // to prevent SSRF: an attacker changing it could exfiltrate the API key
        if let Some(chat_model) = update.chat_model {
            config.chat_model = chat_model;
        }
        if let Some(embedding_model) = update.embedding_model {
            config.embedding_model = embedding_model;
        }
        if let Some(api_key) = update.api_key {
            config.api_key = Some(api_key);
        }
    }

    Json(redacted(&state))
}

fn redacted(state: &AppState) -> LlmConfigResponse {
    let config = state.llm_config.read();
    LlmConfigResponse {
        provider: config.provider.clone(),
        base_url: config.base_url.clone(),
        chat_model: config.chat_model.clone(),
        embedding_model: config.embedding_model.clone(),
        has_api_key: config.api_key.is_some(),
        source_language: state.config.languages.source.clone(),
        target_language: state.config.languages.target.clone(),
    }
}

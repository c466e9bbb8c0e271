use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::llm::extract::{extract_from_image, generate_for_term, ModelError};
use crate::models::{CandidateBatch, GenerateRequest};
use crate::state::AppState;

/// Error body for extraction and generation failures. `raw` carries the
/// model's reply when it did not follow the JSON contract.
#[derive(Debug, Serialize)]
pub struct ModelErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

type ModelResult = Result<Json<CandidateBatch>, (StatusCode, Json<ModelErrorBody>)>;

/// POST /api/extract - Raw image body in, candidate flashcards out (not saved)
pub async fn extract(State(state): State<AppState>, body: Bytes) -> ModelResult {
    if body.len() > state.config.max_image_bytes() {
        return Err(error_response(ModelError::Input(format!(
            "image exceeds {} MB",
            state.config.max_image_mb
        ))));
    }

    let _permit = acquire(&state).await?;
    let llm_config = state.llm_config.read().clone();
    extract_from_image(
        &state.http_client,
        &llm_config,
        &state.config.languages,
        &body,
    )
    .await
    .map(Json)
    .map_err(error_response)
}

/// POST /api/generate - Candidate flashcards for a typed term (not saved)
pub async fn generate(
    State(state): State<AppState>,
    Json(req): Json<GenerateRequest>,
) -> ModelResult {
    let _permit = acquire(&state).await?;
    let llm_config = state.llm_config.read().clone();
    generate_for_term(
        &state.http_client,
        &llm_config,
        &state.config.languages,
        &req.term,
    )
    .await
    .map(Json)
    .map_err(error_response)
}

async fn acquire(
    state: &AppState,
) -> Result<tokio::sync::OwnedSemaphorePermit, (StatusCode, Json<ModelErrorBody>)> {
    state
        .model_semaphore
        .clone()
        .acquire_owned()
        .await
        .map_err(|_| {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ModelErrorBody {
                    error: "Model service at capacity".to_string(),
                    raw: None,
                }),
            )
        })
}

pub fn error_response(err: ModelError) -> (StatusCode, Json<ModelErrorBody>) {
    let status = match &err {
        ModelError::Contract { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        ModelError::Input(_) => StatusCode::BAD_REQUEST,
        ModelError::Transport(e) => {
            tracing::error!("Model call failed: {e:#}");
            StatusCode::BAD_GATEWAY
        }
    };
    let raw = err.raw().map(str::to_string);
    (
        status,
        Json(ModelErrorBody {
            error: err.to_string(),
            raw,
        }),
    )
}

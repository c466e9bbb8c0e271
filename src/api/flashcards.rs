use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::ingest;
use crate::llm::embeddings::embed_single;
use crate::models::{CandidateBatch, FlashcardHit, IngestReport, SearchRequest, StoredFlashcard};
use crate::state::AppState;

/// GET /api/flashcards - All stored flashcards, newest first
pub async fn list_flashcards(
    State(state): State<AppState>,
) -> Result<Json<Vec<StoredFlashcard>>, (StatusCode, String)> {
    ingest::list_all(state.store.as_ref())
        .map(Json)
        .map_err(internal)
}

/// POST /api/flashcards - Save a candidate batch, skipping known terms
pub async fn save_flashcards(
    State(state): State<AppState>,
    Json(batch): Json<CandidateBatch>,
) -> Result<(StatusCode, Json<IngestReport>), (StatusCode, String)> {
    let report = ingest::ingest(state.store.as_ref(), &state.embedder(), &batch)
        .await
        .map_err(internal)?;
    Ok((StatusCode::CREATED, Json(report)))
}

/// DELETE /api/flashcards/{term} - Remove the flashcard for a term
pub async fn delete_flashcard(
    State(state): State<AppState>,
    Path(term): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    ingest::delete(state.store.as_ref(), &term).map_err(internal)?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/flashcards/search - Stored flashcards closest in meaning to a query
pub async fn search_flashcards(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<Vec<FlashcardHit>>, (StatusCode, String)> {
    let query = ingest::normalize(&req.query);
    if query.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Query is required".to_string()));
    }

    let llm_config = state.llm_config.read().clone();
    let embedding = embed_single(&state.http_client, &llm_config, &query)
        .await
        .map_err(|e| {
            tracing::error!("Query embedding failed: {e:#}");
            (StatusCode::BAD_GATEWAY, format!("{e:#}"))
        })?;

    Ok(Json(state.store.search(&embedding, req.limit.clamp(1, 100))))
}

pub(crate) fn internal(e: anyhow::Error) -> (StatusCode, String) {
    tracing::error!("{e:#}");
    (StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}"))
}

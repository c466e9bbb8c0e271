use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use crate::api::flashcards::internal;
use crate::ingest;
use crate::models::IngestReport;
use crate::session::{Action, Session, SessionView, View};
use crate::state::AppState;

/// POST /api/sessions - Start a new UI session
pub async fn create_session(State(state): State<AppState>) -> (StatusCode, Json<SessionView>) {
    let view = state.sessions.lock().create();
    (StatusCode::CREATED, Json(view))
}

/// GET /api/sessions/{id} - Render a session
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, (StatusCode, String)> {
    let sessions = state.sessions.lock();
    sessions
        .get(&id)
        .map(|s| Json(s.render()))
        .ok_or_else(not_found)
}

/// POST /api/sessions/{id}/actions - Apply a user action and render
pub async fn apply_action(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(action): Json<Action>,
) -> Result<Json<SessionView>, (StatusCode, String)> {
    // Entering Study always draws a fresh, shuffled deck from the store
    let deck = match action {
        Action::Navigate { view: View::Study } => {
            let records = ingest::list_all(state.store.as_ref()).map_err(internal)?;
            Some(Session::shuffled_deck(&records))
        }
        _ => None,
    };

    let mut sessions = state.sessions.lock();
    let session = sessions.get_mut(&id).ok_or_else(not_found)?;
    match deck {
        Some(deck) => session.start_study(deck),
        None => session.apply(action),
    }
    Ok(Json(session.render()))
}

#[derive(Debug, Serialize)]
pub struct SaveResponse {
    pub report: IngestReport,
    pub session: SessionView,
}

/// POST /api/sessions/{id}/save - Save the session's pending batch and clear it
///
/// A batch set while the save was in flight stays pending.
pub async fn save_pending(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SaveResponse>, (StatusCode, String)> {
    let pending = {
        let sessions = state.sessions.lock();
        let session = sessions.get(&id).ok_or_else(not_found)?;
        session.render().pending
    };
    let Some(batch) = pending else {
        return Err((StatusCode::BAD_REQUEST, "Nothing to save".to_string()));
    };

    let report = ingest::ingest(state.store.as_ref(), &state.embedder(), &batch)
        .await
        .map_err(internal)?;

    let mut sessions = state.sessions.lock();
    let session = sessions.get_mut(&id).ok_or_else(not_found)?;
    if !session.clear_pending_if(&batch) {
        tracing::info!("Session {id}: pending batch changed during save, keeping it");
    }
    Ok(Json(SaveResponse {
        report,
        session: session.render(),
    }))
}

fn not_found() -> (StatusCode, String) {
    (StatusCode::NOT_FOUND, "Session not found".to_string())
}

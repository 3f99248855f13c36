//! Note endpoints. A date may carry any number of notes, each with its own id.

use axum::{
    Extension, Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    routing::{get, put},
};
use calnotes_core::{Note, NoteId, parse_date};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::routes::events::DateQuery;
use crate::routes::{AppError, SuccessResponse};
use crate::session::CurrentUser;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/notes",
            get(list_notes).post(add_note).delete(delete_notes_on_date),
        )
        .route("/api/notes/{id}", put(update_note).delete(delete_note))
}

#[derive(Serialize)]
pub struct NotesResponse {
    pub notes: Vec<Note>,
}

/// Reply carrying the note that was written
#[derive(Serialize)]
pub struct NoteResponse {
    pub success: bool,
    pub note: Note,
}

/// GET /api/notes - All of the caller's notes, ordered by date
async fn list_notes(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<NotesResponse>, AppError> {
    let notes = state
        .run(move |store, _| store.list_notes(user.user_id))
        .await?;
    Ok(Json(NotesResponse { notes }))
}

/// Request body for adding a note
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddNoteRequest {
    pub date: String,
    pub content: String,
}

/// POST /api/notes - Add a note on a date
async fn add_note(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    payload: Result<Json<AddNoteRequest>, JsonRejection>,
) -> Result<Json<NoteResponse>, AppError> {
    let Json(req) = payload.map_err(|e| AppError::validation(e.body_text()))?;
    let date = parse_date(&req.date)?;

    let note = state
        .run(move |store, _| store.add_note(user.user_id, date, &req.content, Utc::now()))
        .await?;

    Ok(Json(NoteResponse {
        success: true,
        note,
    }))
}

/// Request body for editing a note
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateNoteRequest {
    pub content: String,
}

/// PUT /api/notes/:id - Replace a note's content
async fn update_note(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UpdateNoteRequest>, JsonRejection>,
) -> Result<Json<NoteResponse>, AppError> {
    let Path(id) = id.map_err(|e| AppError::validation(e.body_text()))?;
    let Json(req) = payload.map_err(|e| AppError::validation(e.body_text()))?;

    let note = state
        .run(move |store, _| store.update_note(user.user_id, NoteId(id), &req.content, Utc::now()))
        .await?;

    Ok(Json(NoteResponse {
        success: true,
        note,
    }))
}

/// DELETE /api/notes/:id - Delete one note
async fn delete_note(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<SuccessResponse>, AppError> {
    let Path(id) = id.map_err(|e| AppError::validation(e.body_text()))?;
    state
        .run(move |store, _| store.delete_note(user.user_id, NoteId(id)))
        .await?;
    Ok(SuccessResponse::ok())
}

/// DELETE /api/notes?date=YYYY-MM-DD - Delete every note on a date
async fn delete_notes_on_date(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    query: Result<Query<DateQuery>, QueryRejection>,
) -> Result<Json<SuccessResponse>, AppError> {
    let Query(query) = query.map_err(|e| AppError::validation(e.body_text()))?;
    let date = parse_date(&query.date)?;
    state
        .run(move |store, _| store.delete_notes_on(user.user_id, date))
        .await?;
    Ok(SuccessResponse::ok())
}

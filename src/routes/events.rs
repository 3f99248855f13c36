//! User event endpoints. Each user has at most one event per date.

use std::collections::BTreeMap;

use axum::{
    Extension, Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    routing::{delete, get},
};
use calnotes_core::{format_date, parse_date};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::routes::{AppError, SuccessResponse};
use crate::session::CurrentUser;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/events",
            get(list_events).post(upsert_event).delete(delete_event_by_query),
        )
        .route("/api/events/{date}", delete(delete_event_by_path))
}

#[derive(Serialize)]
pub struct EventsResponse {
    pub events: BTreeMap<String, String>,
}

/// GET /api/events - All of the caller's events, keyed by date
async fn list_events(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<EventsResponse>, AppError> {
    let events = state
        .run(move |store, _| store.list_events(user.user_id))
        .await?;

    Ok(Json(EventsResponse {
        events: events
            .into_iter()
            .map(|(date, description)| (format_date(date), description))
            .collect(),
    }))
}

/// Request body for creating or replacing an event
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpsertEventRequest {
    pub date: String,
    pub description: String,
}

/// POST /api/events - Create or replace the event on a date
async fn upsert_event(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    payload: Result<Json<UpsertEventRequest>, JsonRejection>,
) -> Result<Json<SuccessResponse>, AppError> {
    let Json(req) = payload.map_err(|e| AppError::validation(e.body_text()))?;
    let date = parse_date(&req.date)?;

    state
        .run(move |store, _| store.upsert_event(user.user_id, date, &req.description, Utc::now()))
        .await?;

    Ok(SuccessResponse::ok())
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DateQuery {
    pub date: String,
}

/// DELETE /api/events?date=YYYY-MM-DD
async fn delete_event_by_query(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    query: Result<Query<DateQuery>, QueryRejection>,
) -> Result<Json<SuccessResponse>, AppError> {
    let Query(query) = query.map_err(|e| AppError::validation(e.body_text()))?;
    delete_event(state, user, &query.date).await
}

/// DELETE /api/events/:date
async fn delete_event_by_path(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    date: Result<Path<String>, PathRejection>,
) -> Result<Json<SuccessResponse>, AppError> {
    let Path(date) = date.map_err(|e| AppError::validation(e.body_text()))?;
    delete_event(state, user, &date).await
}

async fn delete_event(
    state: AppState,
    user: CurrentUser,
    date: &str,
) -> Result<Json<SuccessResponse>, AppError> {
    let date = parse_date(date)?;
    state
        .run(move |store, _| store.delete_event(user.user_id, date))
        .await?;
    Ok(SuccessResponse::ok())
}

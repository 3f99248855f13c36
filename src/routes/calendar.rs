//! Calendar grid endpoint

use axum::{
    Extension, Json, Router,
    extract::{Query, State, rejection::QueryRejection},
    routing::get,
};
use calnotes_core::{MonthGrid, YearMonth, build_month_grid};
use chrono::Datelike;
use serde::Deserialize;

use crate::routes::AppError;
use crate::session::CurrentUser;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/calendar", get(calendar))
}

/// Month to render; either part defaults to the current one
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CalendarQuery {
    pub year: Option<i32>,
    pub month: Option<u32>,
}

/// GET /api/calendar - Month grid with merged events and notes
async fn calendar(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    query: Result<Query<CalendarQuery>, QueryRejection>,
) -> Result<Json<MonthGrid>, AppError> {
    let Query(query) = query.map_err(|e| AppError::validation(e.body_text()))?;

    let today = state.today();
    let month = YearMonth::new(
        query.year.unwrap_or_else(|| today.year()),
        query.month.unwrap_or_else(|| today.month()),
    )?;
    let (Some(first), Some(last)) = (month.first_day(), month.last_day()) else {
        return Err(AppError::validation(format!("Month {} is out of range", month)));
    };

    let user_id = user.user_id;
    let (events, notes) = state
        .run(move |store, _| {
            Ok((
                store.events_in_range(user_id, first, last)?,
                store.notes_in_range(user_id, first, last)?,
            ))
        })
        .await?;

    Ok(Json(build_month_grid(
        month,
        today,
        &state.defaults,
        &events,
        &notes,
    )))
}

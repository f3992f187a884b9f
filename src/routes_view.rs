use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::logic::{DayView, ViewFilter};
use crate::error::TaskError;
use crate::models::{parse_date, parse_priority};
use crate::routes_tasks::error_response;
use crate::state::SharedState;

#[derive(Debug, Deserialize)]
pub struct ViewQuery {
    pub date: Option<String>, // "YYYY-MM-DD", defaults to today
    pub priority: Option<String>, // high | medium | low, empty = any
    pub tag: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ViewResponse {
    pub today: String,
    pub total: usize,
    pub completed_count: usize,
    #[serde(flatten)]
    pub view: DayView,
}

// -----------------------------
// GET /api/view
// Tasks visible on one calendar day, split into active and completed
// -----------------------------
pub async fn get_day_view(
    State(state): State<SharedState>,
    Query(q): Query<ViewQuery>,
) -> Response {
    let priority = match q.priority.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => match parse_priority(raw) {
            Some(p) => Some(p),
            None => return error_response(TaskError::InvalidPriority(raw.into())),
        },
    };
    let filter = ViewFilter {
        priority,
        tag: q.tag.filter(|t| !t.trim().is_empty()),
    };

    let ws = state.lock().await;
    let today = ws.now().date();
    let selected = match q.date.as_deref().map(str::trim) {
        None | Some("") => today,
        Some(raw) => match parse_date(raw) {
            Some(d) => d,
            None => return (StatusCode::BAD_REQUEST, "invalid date").into_response(),
        },
    };
    let view = ws.view(selected, today, &filter);

    Json(ViewResponse {
        today: today.to_string(),
        total: view.active.len() + view.completed.len(),
        completed_count: view.completed.len(),
        view,
    })
    .into_response()
}

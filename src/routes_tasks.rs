// --------------------------------------------------
// Handles API endpoints related to task CRUD operations,
// status and timer controls, settings and the tag registry.
//
// Responsibilities:
// - Create / read / update / delete tasks
// - Toggle task status (not done <-> done) or set it directly
// - Start / stop / reset a task's timer
// - Get / update widget settings, list / add tags
// --------------------------------------------------

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::info;

use crate::error::TaskError;
use crate::models::{local_now, parse_date, Priority, RepeatType, TaskStatus};
use crate::state::{SharedState, TaskDraft};

// Maps domain failures onto HTTP statuses.
pub(crate) fn error_response(e: TaskError) -> Response {
    let status = match e {
        TaskError::NotFound(_) => StatusCode::NOT_FOUND,
        TaskError::EmptyTitle
        | TaskError::EmptyTag
        | TaskError::InvalidDate(_)
        | TaskError::InvalidPriority(_) => StatusCode::BAD_REQUEST,
        TaskError::IdsExhausted(_) | TaskError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, e.to_string()).into_response()
}

// -----------------------------
// GET /api/tasks
// Returns the whole collection
// -----------------------------
pub async fn get_tasks(State(state): State<SharedState>) -> impl IntoResponse {
    let ws = state.lock().await;
    Json(ws.tasks().to_vec())
}

#[derive(Debug, Deserialize)]
pub struct TaskInput {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub due_date: Option<String>, // "YYYY-MM-DD", empty = inbox
    #[serde(default)]
    pub repeat_type: Option<RepeatType>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl TaskInput {
    fn into_draft(self) -> Result<TaskDraft, TaskError> {
        let due_date = match self.due_date.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(parse_date(raw).ok_or_else(|| TaskError::InvalidDate(raw.into()))?),
        };
        Ok(TaskDraft {
            title: self.title,
            description: self.description,
            priority: self.priority.unwrap_or(Priority::Medium),
            due_date,
            repeat_type: self.repeat_type,
            tags: self.tags,
        })
    }
}

// -----------------------------
// POST /api/tasks
// Creates a new task and saves the collection
// -----------------------------
pub async fn create_task(
    State(state): State<SharedState>,
    Json(input): Json<TaskInput>,
) -> Response {
    let draft = match input.into_draft() {
        Ok(d) => d,
        Err(e) => return error_response(e),
    };

    let mut ws = state.lock().await;
    match ws.create_task(draft, local_now()) {
        Ok(task) => {
            info!(id = task.id, "task created");
            (StatusCode::CREATED, Json(task)).into_response()
        }
        Err(e) => error_response(e),
    }
}

// -----------------------------
// PUT /api/tasks/:id
// Replaces the editable fields of an existing task
// -----------------------------
pub async fn update_task(
    State(state): State<SharedState>,
    Path(id): Path<u64>,
    Json(input): Json<TaskInput>,
) -> Response {
    let draft = match input.into_draft() {
        Ok(d) => d,
        Err(e) => return error_response(e),
    };

    let mut ws = state.lock().await;
    match ws.update_task(id, draft) {
        Ok(task) => Json(task).into_response(),
        Err(e) => error_response(e),
    }
}

// -----------------------------
// DELETE /api/tasks/:id
// Removes a task permanently
// -----------------------------
pub async fn delete_task(State(state): State<SharedState>, Path(id): Path<u64>) -> Response {
    let mut ws = state.lock().await;
    match ws.delete_task(id) {
        Ok(()) => {
            info!(id, "task deleted");
            Json(serde_json::json!({ "ok": true })).into_response()
        }
        Err(e) => error_response(e),
    }
}

// -----------------------------
// POST /api/tasks/:id/toggle
// Toggles task status between not done and done
// -----------------------------
pub async fn toggle_task(State(state): State<SharedState>, Path(id): Path<u64>) -> Response {
    let mut ws = state.lock().await;
    match ws.toggle_status(id, local_now()) {
        Ok(task) => Json(task).into_response(),
        Err(e) => error_response(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusInput {
    pub status: TaskStatus,
}

// -----------------------------
// PUT /api/tasks/:id/status
// Sets the status directly (drag and drop between sections)
// -----------------------------
pub async fn set_task_status(
    State(state): State<SharedState>,
    Path(id): Path<u64>,
    Json(input): Json<StatusInput>,
) -> Response {
    let mut ws = state.lock().await;
    match ws.set_status(id, input.status, local_now()) {
        Ok(task) => Json(task).into_response(),
        Err(e) => error_response(e),
    }
}

// -----------------------------
// POST /api/tasks/:id/timer
// Starts the task's timer (stopping any other) or stops it
// -----------------------------
pub async fn toggle_timer(State(state): State<SharedState>, Path(id): Path<u64>) -> Response {
    let mut ws = state.lock().await;
    match ws.toggle_timer(id) {
        Ok(task) => Json(task).into_response(),
        Err(e) => error_response(e),
    }
}

// -----------------------------
// POST /api/tasks/:id/timer/reset
// Zeroes time_spent, keeps the per-day log
// -----------------------------
pub async fn reset_timer(State(state): State<SharedState>, Path(id): Path<u64>) -> Response {
    let mut ws = state.lock().await;
    match ws.reset_timer(id) {
        Ok(task) => Json(task).into_response(),
        Err(e) => error_response(e),
    }
}

// -----------------------------
// GET /api/settings
// Returns the settings document with defaults filled in
// -----------------------------
pub async fn get_settings(State(state): State<SharedState>) -> impl IntoResponse {
    let ws = state.lock().await;
    Json(ws.settings().to_json())
}

// -----------------------------
// PUT /api/settings
// Merges the given keys into the settings document
// -----------------------------
pub async fn put_settings(
    State(state): State<SharedState>,
    Json(updates): Json<Map<String, Value>>,
) -> Response {
    let mut ws = state.lock().await;
    match ws.update_settings(updates) {
        Ok(settings) => Json(settings).into_response(),
        Err(e) => error_response(e.into()),
    }
}

// -----------------------------
// GET /api/tags
// Every tag ever created
// -----------------------------
pub async fn get_tags(State(state): State<SharedState>) -> impl IntoResponse {
    let ws = state.lock().await;
    Json(ws.settings().all_tags())
}

#[derive(Debug, Deserialize)]
pub struct TagInput {
    pub tag: String,
}

// -----------------------------
// POST /api/tags
// Registers a tag without attaching it to a task
// -----------------------------
pub async fn add_tag(State(state): State<SharedState>, Json(input): Json<TagInput>) -> Response {
    let mut ws = state.lock().await;
    match ws.register_tag(&input.tag) {
        Ok(tags) => Json(tags).into_response(),
        Err(e) => error_response(e),
    }
}

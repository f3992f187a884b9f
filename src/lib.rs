// Define data modules
pub mod config;   // Environment-driven runtime configuration
pub mod error;    // Store / migration / task error types
pub mod models;   // Data structures (Task, Priority, status, repeat)
pub mod migrate;  // Schema migration of raw task records
pub mod store;    // Persistent storage (load/save tasks.json)
pub mod settings; // Widget settings document (settings.json)
pub mod logic;    // Day view projection
pub mod recurrence; // Recurring task generation
pub mod timer;    // Per-task time tracking
pub mod state;    // Shared in-memory workspace and ticker
pub mod routes_tasks; // HTTP handlers for task, timer, settings & tag APIs
pub mod routes_view;  // HTTP handler for the day view API

use std::path::Path;

// Import axum routing utilities and Router
use axum::{
    routing::{get, post, put}, // HTTP method helpers
    Router, // Main router type
};
use tower_http::services::ServeDir; // Used to serve the widget front end (HTML/CSS/JS)

use crate::state::SharedState;

pub fn app(state: SharedState, static_dir: impl AsRef<Path>) -> Router {
    let api = Router::new()
        // day view
        .route("/view", get(routes_view::get_day_view))
        // tasks
        .route("/tasks", get(routes_tasks::get_tasks).post(routes_tasks::create_task))
        .route("/tasks/:id", put(routes_tasks::update_task).delete(routes_tasks::delete_task))
        .route("/tasks/:id/toggle", post(routes_tasks::toggle_task))
        .route("/tasks/:id/status", put(routes_tasks::set_task_status))
        .route("/tasks/:id/timer", post(routes_tasks::toggle_timer))
        .route("/tasks/:id/timer/reset", post(routes_tasks::reset_timer))
        // settings
        .route("/settings", get(routes_tasks::get_settings).put(routes_tasks::put_settings))
        .route("/tags", get(routes_tasks::get_tags).post(routes_tasks::add_tag))
        .with_state(state);

    Router::new()
        .nest("/api", api)
        .fallback_service(ServeDir::new(static_dir.as_ref()))
}

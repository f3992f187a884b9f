use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use task_widget::config::AppConfig;
use task_widget::models::local_now;
use task_widget::state::{run_ticker, SharedState, Workspace};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env();
    let now = local_now();

    let mut workspace = Workspace::open(&config.data_dir, now);
    // recurrence runs once per session, before anything is shown
    if let Err(e) = workspace.start_session(now.date(), now) {
        error!(error = %e, "recurring occurrences were not saved");
    }
    let state: SharedState = Arc::new(Mutex::new(workspace));

    tokio::spawn(run_ticker(state.clone(), config.autosave_secs));

    let app = task_widget::app(state.clone(), &config.static_dir);

    // Print the link to the server
    info!("Server running at http://{}", config.addr);
    info!("Static files: {}", config.static_dir.display());
    info!("Data dir:     {}", config.data_dir.display());

    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .expect("bind failed");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    // flush ticks accrued since the last save
    if state.lock().await.persist().is_ok() {
        info!("tasks saved, bye");
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}

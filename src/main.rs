// Service tests live in /src/tests so they can reach the crate through its
// library target (`agora::...`) while sharing the binary's test harness.
#[cfg(test)]
mod tests;

use agora::service::task_service::start_jobs;
use agora::util::common::load_dotenv;
use agora::{create_app, AppState};
use tokio::net::TcpListener;
use tracing::debug;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() {
    load_dotenv();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or(format!("{}=debug", env!("CARGO_CRATE_NAME")).into()),
        )
        .with(fmt::layer())
        .init();

    let app_state = AppState::new().await;

    let config = &app_state.config;
    config.validate_config();
    debug!("Config:\n {:#?}", config);

    // Migrations are embedded in the binary and applied on startup.
    let db = &app_state.db;
    if config.db.auto_migrate {
        debug!("Migrating database...");
        db.migrate().await.expect("Cannot migrate database");
    }

    let state_clone = app_state.clone();
    tokio::spawn(async move {
        if let Err(e) = start_jobs(state_clone).await {
            tracing::error!("Failed to start background jobs: {}", e);
        }
    });

    let addr = format!("{}:{}", &config.http.ip, &config.http.port);
    let app = create_app(app_state).await;
    let listener = TcpListener::bind(&addr).await.expect("Cannot bind address");
    tracing::info!("Listening on {}", addr);
    axum::serve(listener, app).await.expect("Server error")
}

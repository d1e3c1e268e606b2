use crate::config::db::DB;
use crate::config::AppConfig;
use crate::errors::ApiError;
use crate::route::{comment_api, post_api};
use axum::extract::DefaultBodyLimit;
use axum::http::Uri;
use axum::response::{IntoResponse, Response};
use axum::Router;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

pub mod config;
pub mod errors;
pub mod model;
pub mod route;
pub mod service;
pub mod util;

// Application state shared across handlers
// Cloning AppState is cheap because it uses Arc internally.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: Arc<DB>,
}

// Application router creation
pub async fn create_app(state: AppState) -> Router {
    let config = &state.config;

    let api = Router::new()
        .merge(post_api::create_routes())
        .merge(comment_api::create_routes());

    // The order of the layers is important.
    // https://docs.rs/axum/latest/axum/middleware/index.html#ordering
    let mut app = Router::new()
        .nest("/api", api)
        .fallback(handle_404)
        .method_not_allowed_fallback(handle_405)
        .layer(
            ServiceBuilder::new()
                .layer(CatchPanicLayer::custom(handle_panic))
                .layer(DefaultBodyLimit::max(config.http.max_body_size as usize))
                .layer(config.http.cors.clone().into_layer()),
        );

    if config.log.log_requests {
        app = app.layer(TraceLayer::new_for_http());
    }
    app.with_state(state)
}

impl AppState {
    pub async fn new() -> Self {
        let config = AppConfig::from_env();

        let db = DB::new(&config.db.url, config.db.pool_size)
            .await
            .expect("Cannot connect to database");

        AppState::from_parts(config, db)
    }

    pub fn from_parts(config: AppConfig, db: DB) -> Self {
        AppState {
            config: Arc::new(config),
            db: Arc::new(db),
        }
    }
}

pub async fn handle_404(_uri: Uri) -> ApiError {
    ApiError::PathError(404, "Not Found".to_string())
}

async fn handle_405() -> ApiError {
    ApiError::PathError(405, "Method Not Allowed".to_string())
}

// Custom panic handler, logs the panic and returns a 500 response
fn handle_panic(panic: Box<dyn std::any::Any + Send>) -> Response {
    let panic_message = if let Some(s) = panic.downcast_ref::<&str>() {
        *s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "Unknown panic"
    };

    error!("App panicked: {}", panic_message);
    ApiError::PathError(500, "Internal Server Error".to_string()).into_response()
}

mod decompose;
mod handlers;
pub mod middleware;

use std::sync::Arc;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::{DecomposerConfig, ServerConfig};
use crate::db::Database;

pub use decompose::{ChatDecomposer, Decomposer, SplitDecomposer};
pub use middleware::SecurityConfig;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub decomposer: Arc<dyn Decomposer>,
}

impl AppState {
    pub fn new(db: Database, decomposer: Arc<dyn Decomposer>) -> Self {
        Self { db, decomposer }
    }
}

/// Router with the default decomposer and no authentication.
pub fn create_router(db: Database) -> Router {
    build_router(
        AppState::new(db, Arc::new(SplitDecomposer)),
        SecurityConfig::disabled(),
    )
}

/// Router configured from a [`ServerConfig`].
pub fn create_router_with_config(db: Database, config: &ServerConfig) -> Router {
    let decomposer: Arc<dyn Decomposer> = match &config.decomposer {
        DecomposerConfig::Split => Arc::new(SplitDecomposer),
        DecomposerConfig::Chat { url, model } => {
            Arc::new(ChatDecomposer::new(url.clone(), model.clone()))
        }
    };
    let security = match &config.api_key {
        Some(key) => SecurityConfig::with_api_key(key.clone()),
        None => SecurityConfig::disabled(),
    };
    build_router(AppState::new(db, decomposer), security)
}

pub fn build_router(state: AppState, security: SecurityConfig) -> Router {
    let protected = Router::new()
        // Tasks
        .route("/tasks", post(handlers::create_task))
        .route("/tasks/inbox", get(handlers::list_inbox_tasks))
        .route(
            "/tasks/{key}",
            get(handlers::list_tasks_for_date)
                .put(handlers::update_task)
                .delete(handlers::delete_task),
        )
        .route("/tasks/{key}/toggle", put(handlers::toggle_task))
        // Projects
        .route("/projects", get(handlers::list_projects))
        .route("/projects", post(handlers::create_project))
        // Brain dump
        .route("/ai/process-braindump", post(handlers::process_brain_dump))
        .route_layer(from_fn_with_state(security, middleware::auth_middleware));

    let api = Router::new()
        .merge(protected)
        .route("/health", get(handlers::health));

    Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

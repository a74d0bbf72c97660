pub mod assistants;
pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::sessions::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/assistants", get(assistants::list_assistants))
        // Sessions and runs
        .route("/api/v1/sessions", post(handlers::handle_create_session))
        .route(
            "/api/v1/sessions/:id",
            get(handlers::handle_get_session).delete(handlers::handle_delete_session),
        )
        .route("/api/v1/sessions/:id/runs", post(handlers::handle_create_run))
        .route(
            "/api/v1/sessions/:id/runs/upload",
            post(handlers::handle_upload_run),
        )
        .route(
            "/api/v1/sessions/:id/runs/:run_id",
            get(handlers::handle_get_run),
        )
        .route(
            "/api/v1/sessions/:id/runs/:run_id/cancel",
            post(handlers::handle_cancel_run),
        )
        .with_state(state)
}

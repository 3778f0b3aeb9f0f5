//! API routes.

pub mod games;
pub mod health;
pub mod monitoring;
pub mod reddit;

use crate::AppState;
use axum::Router;

/// Build the main API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/api/reddit", reddit::router())
        .nest("/api/v1", api_router())
        .merge(health::router())
        .with_state(state)
}

fn api_router() -> Router<AppState> {
    Router::new()
        .nest("/games", games::router())
        .nest("/monitoring", monitoring::router())
}

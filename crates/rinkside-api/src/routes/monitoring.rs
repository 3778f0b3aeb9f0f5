//! Scheduler and database monitoring endpoints.

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use rinkside_db::{GameRepo, StatusCounts, VideoRepo};
use rinkside_scheduler::{SchedulerStatus, TickReport};
use serde::Serialize;
use tracing::info;

use crate::AppState;
use crate::error::ApiError;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/scheduler", get(scheduler_status))
        .route("/scheduler/tick", post(trigger_tick))
        .route("/database", get(database_stats))
}

async fn scheduler_status(State(state): State<AppState>) -> Json<SchedulerStatus> {
    Json(state.scheduler.status().await)
}

/// Run one tick now. Answers 409 while another tick is running.
async fn trigger_tick(State(state): State<AppState>) -> Result<Json<TickReport>, ApiError> {
    info!("Manual scheduler tick requested");
    let report = state.scheduler.tick(Utc::now()).await?;
    Ok(Json(report))
}

#[derive(Debug, Serialize)]
struct DatabaseStats {
    games: StatusCounts,
    total_games: i64,
    videos: i64,
}

async fn database_stats(State(state): State<AppState>) -> Result<Json<DatabaseStats>, ApiError> {
    let games = state.stores.games.status_counts().await?;
    let videos = state.stores.videos.count().await?;
    Ok(Json(DatabaseStats {
        total_games: games.total(),
        games,
        videos,
    }))
}

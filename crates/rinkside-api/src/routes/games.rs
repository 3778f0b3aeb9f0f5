//! Game read endpoints.

use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use rinkside_core::discussion::{DiscussionComment, DiscussionSource, ThreadQuery};
use rinkside_core::media::Video;
use rinkside_core::quote::Quote;
use rinkside_core::{GameId, GameRecord, GameStatus, Stage, StagePlanEntry};
use rinkside_db::{GameRepo, QuoteRepo, VideoRepo};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::ApiError;

const DEFAULT_LIMIT: i64 = 10;
const MAX_LIMIT: i64 = 100;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_games))
        .route("/{game_id}", get(get_game))
        .route("/{game_id}/stages", get(get_stages))
        .route("/{game_id}/reddit", get(get_discussion))
}

fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

#[derive(Debug, Deserialize)]
struct ListGamesQuery {
    limit: Option<i64>,
    team: Option<String>,
}

#[derive(Debug, Serialize)]
struct GameSummary {
    game_id: GameId,
    game_date_utc: DateTime<Utc>,
    away_team: String,
    home_team: String,
    away_score: Option<i32>,
    home_score: Option<i32>,
    status: GameStatus,
    summary_line: Option<String>,
    completed_at: Option<DateTime<Utc>>,
}

impl From<GameRecord> for GameSummary {
    fn from(game: GameRecord) -> Self {
        Self {
            game_id: game.game_id,
            game_date_utc: game.game_date_utc,
            away_team: game.away_team,
            home_team: game.home_team,
            away_score: game.away_score,
            home_score: game.home_score,
            status: game.status,
            summary_line: game.summary_line,
            completed_at: game.completed_at,
        }
    }
}

async fn list_games(
    State(state): State<AppState>,
    Query(query): Query<ListGamesQuery>,
) -> Result<Json<Vec<GameSummary>>, ApiError> {
    let team = query.team.as_deref().filter(|t| !t.is_empty());
    let games = state
        .stores
        .games
        .list_recent(clamp_limit(query.limit), team)
        .await?;
    Ok(Json(games.into_iter().map(GameSummary::from).collect()))
}

#[derive(Debug, Serialize)]
struct GameDetail {
    #[serde(flatten)]
    game: GameRecord,
    videos: Vec<Video>,
    quotes: Vec<Quote>,
}

async fn get_game(
    State(state): State<AppState>,
    Path(game_id): Path<i64>,
) -> Result<Json<GameDetail>, ApiError> {
    let id = GameId::new(game_id);
    let game = state.stores.games.get(id).await?;
    let videos = state.stores.videos.list_for_game(id).await?;
    let quotes = state.stores.quotes.list_for_game(id).await?;
    Ok(Json(GameDetail {
        game,
        videos,
        quotes,
    }))
}

#[derive(Debug, Serialize)]
struct StagesResponse {
    game_id: GameId,
    status: GameStatus,
    final_at: Option<DateTime<Utc>>,
    /// The stage that would run if a tick happened now.
    due_stage: Option<Stage>,
    failed_attempts: i32,
    last_error: Option<String>,
    stages: Vec<StagePlanEntry>,
}

async fn get_stages(
    State(state): State<AppState>,
    Path(game_id): Path<i64>,
) -> Result<Json<StagesResponse>, ApiError> {
    let game = state.stores.games.get(GameId::new(game_id)).await?;
    let schedule = &state.pipeline().schedule;
    Ok(Json(StagesResponse {
        game_id: game.game_id,
        status: game.status,
        final_at: game.final_at,
        due_stage: schedule.due_stage(&game, Utc::now()),
        failed_attempts: game.failed_attempts,
        last_error: game.last_error.clone(),
        stages: schedule.plan(&game),
    }))
}

#[derive(Debug, Deserialize)]
struct DiscussionQuery {
    limit: Option<i64>,
}

#[derive(Debug, Serialize)]
struct DiscussionResponse {
    game_id: GameId,
    thread_id: String,
    url: String,
    title: String,
    comment_count: i32,
    comments: Vec<DiscussionComment>,
}

/// Live lookup of the game thread, independent of the stored stage result.
async fn get_discussion(
    State(state): State<AppState>,
    Path(game_id): Path<i64>,
    Query(query): Query<DiscussionQuery>,
) -> Result<Json<DiscussionResponse>, ApiError> {
    let game = state.stores.games.get(GameId::new(game_id)).await?;
    let thread_query = ThreadQuery {
        away_team: game.away_team.clone(),
        home_team: game.home_team.clone(),
        game_date: game.game_date_utc.date_naive(),
        subreddit: state.pipeline().subreddit.clone(),
        comment_limit: u32::try_from(clamp_limit(query.limit)).unwrap_or(DEFAULT_LIMIT as u32),
    };

    let thread = state
        .reddit
        .find_thread(&thread_query)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("no game thread for game {}", game.game_id)))?;

    Ok(Json(DiscussionResponse {
        game_id: game.game_id,
        comment_count: thread.comment_count(),
        thread_id: thread.thread_id,
        url: thread.url,
        title: thread.title,
        comments: thread.comments,
    }))
}

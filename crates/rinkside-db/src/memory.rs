//! In-memory store implementing every repository trait.
//!
//! Used by tests and by local runs without a database. It enforces the same
//! lifecycle rules as the PostgreSQL repositories.

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use rinkside_core::discussion::DiscussionThread;
use rinkside_core::feed::BoxscoreSummary;
use rinkside_core::media::{Video, VideoCandidate};
use rinkside_core::quote::{NewQuote, Quote};
use rinkside_core::recap::Recap;
use rinkside_core::{GameId, GameRecord, GameStatus, GoalDetail, ResourceId, Stage};
use std::collections::BTreeMap;
use tokio::sync::Mutex;

use crate::repo::game::archive_refusal;
use crate::{DbError, DbResult, GameRepo, QuoteRepo, StatusCounts, VideoRepo};

#[derive(Default)]
struct Tables {
    games: BTreeMap<GameId, GameRecord>,
    videos: Vec<Video>,
    quotes: Vec<Quote>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn not_found(id: GameId) -> DbError {
    DbError::NotFound(format!("game {}", id))
}

impl Tables {
    fn game_mut(&mut self, id: GameId) -> DbResult<&mut GameRecord> {
        self.games.get_mut(&id).ok_or_else(|| not_found(id))
    }
}

#[async_trait]
impl GameRepo for MemoryStore {
    async fn insert_if_absent(&self, game: &GameRecord) -> DbResult<bool> {
        let mut tables = self.tables.lock().await;
        if tables.games.contains_key(&game.game_id) {
            return Ok(false);
        }
        tables.games.insert(game.game_id, game.clone());
        Ok(true)
    }

    async fn get(&self, id: GameId) -> DbResult<GameRecord> {
        let tables = self.tables.lock().await;
        tables.games.get(&id).cloned().ok_or_else(|| not_found(id))
    }

    async fn list_recent(&self, limit: i64, team: Option<&str>) -> DbResult<Vec<GameRecord>> {
        let tables = self.tables.lock().await;
        let mut games: Vec<_> = tables
            .games
            .values()
            .filter(|g| matches!(g.status, GameStatus::Final | GameStatus::Archived))
            .filter(|g| team.is_none_or(|t| g.involves(t)))
            .cloned()
            .collect();
        games.sort_by(|a, b| b.game_date_utc.cmp(&a.game_date_utc));
        games.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(games)
    }

    async fn list_in_flight(&self) -> DbResult<Vec<GameRecord>> {
        let tables = self.tables.lock().await;
        let mut games: Vec<_> = tables
            .games
            .values()
            .filter(|g| g.is_in_flight())
            .cloned()
            .collect();
        games.sort_by_key(|g| g.game_date_utc);
        Ok(games)
    }

    async fn advance_status(
        &self,
        id: GameId,
        status: GameStatus,
        final_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> DbResult<bool> {
        if status == GameStatus::Archived {
            return Err(DbError::Invariant(
                "games are archived through archive()".to_string(),
            ));
        }
        let mut tables = self.tables.lock().await;
        let game = tables.game_mut(id)?;
        if !game.status.can_advance_to(status) {
            return Ok(false);
        }
        game.status = status;
        game.final_at = game.final_at.or(final_at);
        game.status_updated_at = Some(now);
        Ok(true)
    }

    async fn save_basic_stats(
        &self,
        id: GameId,
        summary: &BoxscoreSummary,
        raw_boxscore: &serde_json::Value,
    ) -> DbResult<()> {
        let mut tables = self.tables.lock().await;
        let game = tables.game_mut(id)?;
        game.away_score = Some(summary.away_score);
        game.home_score = Some(summary.home_score);
        game.scorers = summary.scorers.clone();
        game.raw_boxscore = Some(raw_boxscore.clone());
        Ok(())
    }

    async fn save_goals(&self, id: GameId, goals: &[GoalDetail]) -> DbResult<()> {
        let mut tables = self.tables.lock().await;
        tables.game_mut(id)?.goals = goals.to_vec();
        Ok(())
    }

    async fn save_discussion(
        &self,
        id: GameId,
        thread: Option<&DiscussionThread>,
    ) -> DbResult<()> {
        let mut tables = self.tables.lock().await;
        let game = tables.game_mut(id)?;
        game.discussion_thread_id = thread.map(|t| t.thread_id.clone());
        game.discussion_url = thread.map(|t| t.url.clone());
        game.discussion_comment_count = thread.map(|t| t.comment_count());
        Ok(())
    }

    async fn save_recap(&self, id: GameId, recap: &Recap, now: DateTime<Utc>) -> DbResult<()> {
        let mut tables = self.tables.lock().await;
        let game = tables.game_mut(id)?;
        game.summary_line = Some(recap.summary_line.clone());
        game.recap_text = Some(recap.recap_text.clone());
        game.next_game_storyline = recap.next_game_storyline.clone();
        game.completed_at = game.completed_at.or(Some(now));
        Ok(())
    }

    async fn set_marker(&self, id: GameId, stage: Stage, at: DateTime<Utc>) -> DbResult<bool> {
        if !stage.has_marker() {
            return Err(DbError::Invariant(format!(
                "stage '{}' has no marker",
                stage
            )));
        }
        let mut tables = self.tables.lock().await;
        let game = tables.game_mut(id)?;
        let changed = game.markers.set(stage, at);
        if changed {
            game.failed_attempts = 0;
            game.last_error = None;
        }
        Ok(changed)
    }

    async fn record_failure(&self, id: GameId, error: &str) -> DbResult<i32> {
        let mut tables = self.tables.lock().await;
        let game = tables.game_mut(id)?;
        game.failed_attempts += 1;
        game.last_error = Some(error.to_string());
        Ok(game.failed_attempts)
    }

    async fn try_claim(
        &self,
        id: GameId,
        worker: &str,
        lease: TimeDelta,
        now: DateTime<Utc>,
    ) -> DbResult<bool> {
        let mut tables = self.tables.lock().await;
        let game = tables.game_mut(id)?;
        if game.is_claimed_by_other(worker, lease, now) {
            return Ok(false);
        }
        game.claimed_by = Some(worker.to_string());
        game.claimed_at = Some(now);
        Ok(true)
    }

    async fn release_claim(&self, id: GameId, worker: &str) -> DbResult<()> {
        let mut tables = self.tables.lock().await;
        let game = tables.game_mut(id)?;
        if game.claimed_by.as_deref() == Some(worker) {
            game.claimed_by = None;
            game.claimed_at = None;
        }
        Ok(())
    }

    async fn archive(&self, id: GameId, now: DateTime<Utc>) -> DbResult<()> {
        let mut tables = self.tables.lock().await;
        let game = tables.game_mut(id)?;
        if game.status != GameStatus::Final || !game.can_archive() {
            return archive_refusal(game);
        }
        game.status = GameStatus::Archived;
        game.archived_at = Some(now);
        game.status_updated_at = Some(now);
        Ok(())
    }

    async fn status_counts(&self) -> DbResult<StatusCounts> {
        let tables = self.tables.lock().await;
        let mut counts = StatusCounts::default();
        for game in tables.games.values() {
            counts.add(game.status, 1);
        }
        Ok(counts)
    }

    async fn ping(&self) -> DbResult<()> {
        Ok(())
    }
}

#[async_trait]
impl VideoRepo for MemoryStore {
    async fn insert(
        &self,
        game_id: GameId,
        video: &VideoCandidate,
        now: DateTime<Utc>,
    ) -> DbResult<bool> {
        let mut tables = self.tables.lock().await;
        if !tables.games.contains_key(&game_id) {
            return Err(not_found(game_id));
        }
        let exists = tables
            .videos
            .iter()
            .any(|v| v.game_id == game_id && v.youtube_id == video.youtube_id);
        if exists {
            return Ok(false);
        }
        tables.videos.push(Video {
            id: ResourceId::new(),
            game_id,
            youtube_id: video.youtube_id.clone(),
            title: video.title.clone(),
            channel_name: video.channel_name.clone(),
            thumbnail_url: video.thumbnail_url.clone(),
            kind: video.kind,
            published_at: video.published_at,
            created_at: now,
        });
        Ok(true)
    }

    async fn list_for_game(&self, game_id: GameId) -> DbResult<Vec<Video>> {
        let tables = self.tables.lock().await;
        let mut videos: Vec<_> = tables
            .videos
            .iter()
            .filter(|v| v.game_id == game_id)
            .cloned()
            .collect();
        videos.sort_by_key(|v| (v.kind, v.created_at));
        Ok(videos)
    }

    async fn count(&self) -> DbResult<i64> {
        let tables = self.tables.lock().await;
        Ok(i64::try_from(tables.videos.len()).unwrap_or(i64::MAX))
    }
}

#[async_trait]
impl QuoteRepo for MemoryStore {
    async fn insert(
        &self,
        game_id: GameId,
        quote: NewQuote,
        now: DateTime<Utc>,
    ) -> DbResult<Quote> {
        let mut tables = self.tables.lock().await;
        if !tables.games.contains_key(&game_id) {
            return Err(not_found(game_id));
        }
        let quote = Quote::from_new(game_id, quote, now);
        tables.quotes.push(quote.clone());
        Ok(quote)
    }

    async fn list_for_game(&self, game_id: GameId) -> DbResult<Vec<Quote>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .quotes
            .iter()
            .filter(|q| q.game_id == game_id)
            .cloned()
            .collect())
    }
}

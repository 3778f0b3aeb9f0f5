//! Game repository.

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use rinkside_core::discussion::DiscussionThread;
use rinkside_core::feed::BoxscoreSummary;
use rinkside_core::recap::Recap;
use rinkside_core::{
    GameId, GameRecord, GameStatus, GoalDetail, Stage, StageMarker, StageMarkers,
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use sqlx::types::Json;

use crate::{DbError, DbResult};

/// Number of games in each status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub scheduled: i64,
    pub live: i64,
    #[serde(rename = "final")]
    pub final_: i64,
    pub archived: i64,
}

impl StatusCounts {
    pub fn add(&mut self, status: GameStatus, count: i64) {
        match status {
            GameStatus::Scheduled => self.scheduled += count,
            GameStatus::Live => self.live += count,
            GameStatus::Final => self.final_ += count,
            GameStatus::Archived => self.archived += count,
        }
    }

    pub fn total(&self) -> i64 {
        self.scheduled + self.live + self.final_ + self.archived
    }
}

#[async_trait]
pub trait GameRepo: Send + Sync {
    /// Insert a newly discovered game. An existing row is left untouched.
    /// Returns whether a row was inserted.
    async fn insert_if_absent(&self, game: &GameRecord) -> DbResult<bool>;
    async fn get(&self, id: GameId) -> DbResult<GameRecord>;
    /// `FINAL` and `ARCHIVED` games, newest first.
    async fn list_recent(&self, limit: i64, team: Option<&str>) -> DbResult<Vec<GameRecord>>;
    /// `FINAL` games still moving through the pipeline, oldest first.
    async fn list_in_flight(&self) -> DbResult<Vec<GameRecord>>;
    /// Move a game forward to `status`. Backward moves are ignored and
    /// return `false`. `final_at` is only written when not already set.
    async fn advance_status(
        &self,
        id: GameId,
        status: GameStatus,
        final_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> DbResult<bool>;

    async fn save_basic_stats(
        &self,
        id: GameId,
        summary: &BoxscoreSummary,
        raw_boxscore: &serde_json::Value,
    ) -> DbResult<()>;
    async fn save_goals(&self, id: GameId, goals: &[GoalDetail]) -> DbResult<()>;
    async fn save_discussion(&self, id: GameId, thread: Option<&DiscussionThread>)
    -> DbResult<()>;
    /// Store the recap and stamp `completed_at` (first write wins).
    async fn save_recap(&self, id: GameId, recap: &Recap, now: DateTime<Utc>) -> DbResult<()>;

    /// Mark `stage` done. Markers only move from false to true and keep their
    /// first timestamp. Setting a marker clears the failure count.
    /// Returns whether the marker changed.
    async fn set_marker(&self, id: GameId, stage: Stage, at: DateTime<Utc>) -> DbResult<bool>;
    /// Count a failed attempt at the current stage. Returns the new count.
    async fn record_failure(&self, id: GameId, error: &str) -> DbResult<i32>;

    /// Take the claim on a game for `worker`. Fails (returns `false`) while
    /// another worker holds an unexpired claim.
    async fn try_claim(
        &self,
        id: GameId,
        worker: &str,
        lease: TimeDelta,
        now: DateTime<Utc>,
    ) -> DbResult<bool>;
    async fn release_claim(&self, id: GameId, worker: &str) -> DbResult<()>;

    /// Move a `FINAL` game with every marker set to `ARCHIVED`.
    /// Archiving an archived game is a no-op.
    async fn archive(&self, id: GameId, now: DateTime<Utc>) -> DbResult<()>;

    async fn status_counts(&self) -> DbResult<StatusCounts>;
    async fn ping(&self) -> DbResult<()>;
}

/// A row of the `games` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct GameRow {
    pub game_id: i64,
    pub season: String,
    pub game_type: i32,
    pub game_date_utc: DateTime<Utc>,
    pub away_team: String,
    pub home_team: String,
    pub away_score: Option<i32>,
    pub home_score: Option<i32>,
    pub status: String,
    pub final_at: Option<DateTime<Utc>>,
    pub basic_stats_fetched: bool,
    pub basic_stats_fetched_at: Option<DateTime<Utc>>,
    pub detailed_stats_fetched: bool,
    pub detailed_stats_fetched_at: Option<DateTime<Utc>>,
    pub discussion_fetched: bool,
    pub discussion_fetched_at: Option<DateTime<Utc>>,
    pub media_fetched: bool,
    pub media_fetched_at: Option<DateTime<Utc>>,
    pub quotes_fetched: bool,
    pub quotes_fetched_at: Option<DateTime<Utc>>,
    pub scorers: Json<Vec<String>>,
    pub goals: Json<Vec<GoalDetail>>,
    pub raw_boxscore: Option<serde_json::Value>,
    pub discussion_thread_id: Option<String>,
    pub discussion_url: Option<String>,
    pub discussion_comment_count: Option<i32>,
    pub summary_line: Option<String>,
    pub recap_text: Option<String>,
    pub next_game_storyline: Option<String>,
    pub failed_attempts: i32,
    pub last_error: Option<String>,
    pub claimed_by: Option<String>,
    pub claimed_at: Option<DateTime<Utc>>,
    pub status_updated_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub archived_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<GameRow> for GameRecord {
    type Error = DbError;

    fn try_from(row: GameRow) -> DbResult<Self> {
        let status = row
            .status
            .parse::<GameStatus>()
            .map_err(|e| DbError::InvalidRow(format!("game {}: {}", row.game_id, e)))?;
        let marker = |fetched, fetched_at| StageMarker {
            fetched,
            fetched_at,
        };
        Ok(GameRecord {
            game_id: GameId::new(row.game_id),
            season: row.season,
            game_type: row.game_type,
            game_date_utc: row.game_date_utc,
            away_team: row.away_team,
            home_team: row.home_team,
            away_score: row.away_score,
            home_score: row.home_score,
            status,
            final_at: row.final_at,
            markers: StageMarkers {
                basic_stats: marker(row.basic_stats_fetched, row.basic_stats_fetched_at),
                detailed_stats: marker(row.detailed_stats_fetched, row.detailed_stats_fetched_at),
                discussion: marker(row.discussion_fetched, row.discussion_fetched_at),
                media: marker(row.media_fetched, row.media_fetched_at),
                quotes: marker(row.quotes_fetched, row.quotes_fetched_at),
            },
            scorers: row.scorers.0,
            goals: row.goals.0,
            raw_boxscore: row.raw_boxscore,
            discussion_thread_id: row.discussion_thread_id,
            discussion_url: row.discussion_url,
            discussion_comment_count: row.discussion_comment_count,
            summary_line: row.summary_line,
            recap_text: row.recap_text,
            next_game_storyline: row.next_game_storyline,
            failed_attempts: row.failed_attempts,
            last_error: row.last_error,
            claimed_by: row.claimed_by,
            claimed_at: row.claimed_at,
            status_updated_at: row.status_updated_at,
            completed_at: row.completed_at,
            archived_at: row.archived_at,
            created_at: row.created_at,
        })
    }
}

/// Marker and timestamp columns of a stage. `None` for archive.
pub(crate) fn marker_columns(stage: Stage) -> Option<(&'static str, &'static str)> {
    match stage {
        Stage::BasicStats => Some(("basic_stats_fetched", "basic_stats_fetched_at")),
        Stage::DetailedStats => Some(("detailed_stats_fetched", "detailed_stats_fetched_at")),
        Stage::Discussion => Some(("discussion_fetched", "discussion_fetched_at")),
        Stage::Media => Some(("media_fetched", "media_fetched_at")),
        Stage::Quotes => Some(("quotes_fetched", "quotes_fetched_at")),
        Stage::Archive => None,
    }
}

const STATUS_ORDER: &str = "ARRAY['SCHEDULED', 'LIVE', 'FINAL', 'ARCHIVED']";

const ALL_MARKERS: &str = "basic_stats_fetched AND detailed_stats_fetched AND discussion_fetched \
     AND media_fetched AND quotes_fetched";

/// PostgreSQL implementation of GameRepo.
pub struct PgGameRepo {
    pool: PgPool,
}

impl PgGameRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn ensure_exists(&self, id: GameId) -> DbResult<()> {
        let found: Option<i64> = sqlx::query_scalar("SELECT game_id FROM games WHERE game_id = $1")
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await?;
        found
            .map(|_| ())
            .ok_or_else(|| DbError::NotFound(format!("game {}", id)))
    }

    fn check_updated(id: GameId, rows: u64) -> DbResult<()> {
        if rows == 0 {
            return Err(DbError::NotFound(format!("game {}", id)));
        }
        Ok(())
    }
}

#[async_trait]
impl GameRepo for PgGameRepo {
    async fn insert_if_absent(&self, game: &GameRecord) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO games (game_id, season, game_type, game_date_utc, away_team, home_team,
                               status, final_at, status_updated_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (game_id) DO NOTHING
            "#,
        )
        .bind(game.game_id.get())
        .bind(&game.season)
        .bind(game.game_type)
        .bind(game.game_date_utc)
        .bind(&game.away_team)
        .bind(&game.home_team)
        .bind(game.status.as_str())
        .bind(game.final_at)
        .bind(game.status_updated_at)
        .bind(game.created_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn get(&self, id: GameId) -> DbResult<GameRecord> {
        let row = sqlx::query_as::<_, GameRow>("SELECT * FROM games WHERE game_id = $1")
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("game {}", id)))?;
        row.try_into()
    }

    async fn list_recent(&self, limit: i64, team: Option<&str>) -> DbResult<Vec<GameRecord>> {
        let rows = sqlx::query_as::<_, GameRow>(
            r#"
            SELECT * FROM games
            WHERE status IN ('FINAL', 'ARCHIVED')
              AND ($2::TEXT IS NULL OR UPPER(away_team) = UPPER($2) OR UPPER(home_team) = UPPER($2))
            ORDER BY game_date_utc DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .bind(team)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(GameRecord::try_from).collect()
    }

    async fn list_in_flight(&self) -> DbResult<Vec<GameRecord>> {
        let rows = sqlx::query_as::<_, GameRow>(
            "SELECT * FROM games WHERE status = 'FINAL' ORDER BY game_date_utc",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(GameRecord::try_from).collect()
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
        let query = format!(
            r#"
            UPDATE games
            SET status = $2, final_at = COALESCE(final_at, $3), status_updated_at = $4
            WHERE game_id = $1
              AND array_position({order}, status) < array_position({order}, $2::TEXT)
            "#,
            order = STATUS_ORDER
        );
        let result = sqlx::query(&query)
            .bind(id.get())
            .bind(status.as_str())
            .bind(final_at)
            .bind(now)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            self.ensure_exists(id).await?;
            return Ok(false);
        }
        Ok(true)
    }

    async fn save_basic_stats(
        &self,
        id: GameId,
        summary: &BoxscoreSummary,
        raw_boxscore: &serde_json::Value,
    ) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE games
            SET away_score = $2, home_score = $3, scorers = $4, raw_boxscore = $5
            WHERE game_id = $1
            "#,
        )
        .bind(id.get())
        .bind(summary.away_score)
        .bind(summary.home_score)
        .bind(Json(&summary.scorers))
        .bind(raw_boxscore)
        .execute(&self.pool)
        .await?;
        Self::check_updated(id, result.rows_affected())
    }

    async fn save_goals(&self, id: GameId, goals: &[GoalDetail]) -> DbResult<()> {
        let result = sqlx::query("UPDATE games SET goals = $2 WHERE game_id = $1")
            .bind(id.get())
            .bind(Json(goals))
            .execute(&self.pool)
            .await?;
        Self::check_updated(id, result.rows_affected())
    }

    async fn save_discussion(
        &self,
        id: GameId,
        thread: Option<&DiscussionThread>,
    ) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE games
            SET discussion_thread_id = $2, discussion_url = $3, discussion_comment_count = $4
            WHERE game_id = $1
            "#,
        )
        .bind(id.get())
        .bind(thread.map(|t| t.thread_id.as_str()))
        .bind(thread.map(|t| t.url.as_str()))
        .bind(thread.map(|t| t.comment_count()))
        .execute(&self.pool)
        .await?;
        Self::check_updated(id, result.rows_affected())
    }

    async fn save_recap(&self, id: GameId, recap: &Recap, now: DateTime<Utc>) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE games
            SET summary_line = $2, recap_text = $3, next_game_storyline = $4,
                completed_at = COALESCE(completed_at, $5)
            WHERE game_id = $1
            "#,
        )
        .bind(id.get())
        .bind(&recap.summary_line)
        .bind(&recap.recap_text)
        .bind(&recap.next_game_storyline)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Self::check_updated(id, result.rows_affected())
    }

    async fn set_marker(&self, id: GameId, stage: Stage, at: DateTime<Utc>) -> DbResult<bool> {
        let (fetched, fetched_at) = marker_columns(stage)
            .ok_or_else(|| DbError::Invariant(format!("stage '{}' has no marker", stage)))?;
        let query = format!(
            r#"
            UPDATE games
            SET {fetched} = TRUE, {fetched_at} = COALESCE({fetched_at}, $2),
                failed_attempts = 0, last_error = NULL
            WHERE game_id = $1 AND NOT {fetched}
            "#
        );
        let result = sqlx::query(&query)
            .bind(id.get())
            .bind(at)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            self.ensure_exists(id).await?;
            return Ok(false);
        }
        Ok(true)
    }

    async fn record_failure(&self, id: GameId, error: &str) -> DbResult<i32> {
        sqlx::query_scalar::<_, i32>(
            r#"
            UPDATE games SET failed_attempts = failed_attempts + 1, last_error = $2
            WHERE game_id = $1
            RETURNING failed_attempts
            "#,
        )
        .bind(id.get())
        .bind(error)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::NotFound(format!("game {}", id)))
    }

    async fn try_claim(
        &self,
        id: GameId,
        worker: &str,
        lease: TimeDelta,
        now: DateTime<Utc>,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE games SET claimed_by = $2, claimed_at = $3
            WHERE game_id = $1
              AND (claimed_by IS NULL OR claimed_by = $2 OR claimed_at IS NULL OR claimed_at <= $4)
            "#,
        )
        .bind(id.get())
        .bind(worker)
        .bind(now)
        .bind(now - lease)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            self.ensure_exists(id).await?;
            return Ok(false);
        }
        Ok(true)
    }

    async fn release_claim(&self, id: GameId, worker: &str) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE games SET claimed_by = NULL, claimed_at = NULL
            WHERE game_id = $1 AND claimed_by = $2
            "#,
        )
        .bind(id.get())
        .bind(worker)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn archive(&self, id: GameId, now: DateTime<Utc>) -> DbResult<()> {
        let query = format!(
            r#"
            UPDATE games SET status = 'ARCHIVED', archived_at = $2, status_updated_at = $2
            WHERE game_id = $1 AND status = 'FINAL' AND {ALL_MARKERS}
            "#
        );
        let result = sqlx::query(&query)
            .bind(id.get())
            .bind(now)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 1 {
            return Ok(());
        }
        let game = self.get(id).await?;
        archive_refusal(&game)
    }

    async fn status_counts(&self) -> DbResult<StatusCounts> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM games GROUP BY status")
                .fetch_all(&self.pool)
                .await?;
        let mut counts = StatusCounts::default();
        for (status, count) in rows {
            let status = status
                .parse::<GameStatus>()
                .map_err(|e| DbError::InvalidRow(e.to_string()))?;
            counts.add(status, count);
        }
        Ok(counts)
    }

    async fn ping(&self) -> DbResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Why `game` cannot be archived, or `Ok` when it already is.
pub(crate) fn archive_refusal(game: &GameRecord) -> DbResult<()> {
    match game.status {
        GameStatus::Archived => Ok(()),
        GameStatus::Final => {
            let pending: Vec<_> = game
                .markers
                .pending()
                .iter()
                .map(|s| s.name())
                .collect();
            Err(DbError::Invariant(format!(
                "game {} has unfinished stages: {}",
                game.game_id,
                pending.join(", ")
            )))
        }
        status => Err(DbError::Invariant(format!(
            "game {} is {}, not FINAL",
            game.game_id, status
        ))),
    }
}

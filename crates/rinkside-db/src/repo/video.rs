//! Highlight video repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rinkside_core::media::{Video, VideoCandidate, VideoKind};
use rinkside_core::{GameId, ResourceId};
use sqlx::PgPool;

use crate::{DbError, DbResult};

#[async_trait]
pub trait VideoRepo: Send + Sync {
    /// Attach a video to a game. A video already attached is skipped.
    /// Returns whether a row was inserted.
    async fn insert(
        &self,
        game_id: GameId,
        video: &VideoCandidate,
        now: DateTime<Utc>,
    ) -> DbResult<bool>;
    async fn list_for_game(&self, game_id: GameId) -> DbResult<Vec<Video>>;
    async fn count(&self) -> DbResult<i64>;
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VideoRow {
    pub id: uuid::Uuid,
    pub game_id: i64,
    pub youtube_id: String,
    pub title: String,
    pub channel_name: Option<String>,
    pub thumbnail_url: Option<String>,
    pub kind: String,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<VideoRow> for Video {
    type Error = DbError;

    fn try_from(row: VideoRow) -> DbResult<Self> {
        let kind = row
            .kind
            .parse::<VideoKind>()
            .map_err(|e| DbError::InvalidRow(format!("video {}: {}", row.id, e)))?;
        Ok(Video {
            id: ResourceId::from(row.id),
            game_id: GameId::new(row.game_id),
            youtube_id: row.youtube_id,
            title: row.title,
            channel_name: row.channel_name,
            thumbnail_url: row.thumbnail_url,
            kind,
            published_at: row.published_at,
            created_at: row.created_at,
        })
    }
}

/// PostgreSQL implementation of VideoRepo.
pub struct PgVideoRepo {
    pool: PgPool,
}

impl PgVideoRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VideoRepo for PgVideoRepo {
    async fn insert(
        &self,
        game_id: GameId,
        video: &VideoCandidate,
        now: DateTime<Utc>,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO videos (id, game_id, youtube_id, title, channel_name, thumbnail_url,
                                kind, published_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (game_id, youtube_id) DO NOTHING
            "#,
        )
        .bind(uuid::Uuid::now_v7())
        .bind(game_id.get())
        .bind(&video.youtube_id)
        .bind(&video.title)
        .bind(&video.channel_name)
        .bind(&video.thumbnail_url)
        .bind(video.kind.as_str())
        .bind(video.published_at)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn list_for_game(&self, game_id: GameId) -> DbResult<Vec<Video>> {
        let rows = sqlx::query_as::<_, VideoRow>(
            r#"
            SELECT * FROM videos WHERE game_id = $1
            ORDER BY CASE kind WHEN 'nhl_official' THEN 0 WHEN 'professor_hockey' THEN 1 ELSE 2 END,
                     created_at
            "#,
        )
        .bind(game_id.get())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Video::try_from).collect()
    }

    async fn count(&self) -> DbResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM videos")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

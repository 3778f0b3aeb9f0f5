//! Post-game quote repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rinkside_core::quote::{NewQuote, Quote};
use rinkside_core::{GameId, ResourceId};
use sqlx::PgPool;

use crate::DbResult;

#[async_trait]
pub trait QuoteRepo: Send + Sync {
    async fn insert(&self, game_id: GameId, quote: NewQuote, now: DateTime<Utc>)
    -> DbResult<Quote>;
    async fn list_for_game(&self, game_id: GameId) -> DbResult<Vec<Quote>>;
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct QuoteRow {
    pub id: uuid::Uuid,
    pub game_id: i64,
    pub text: String,
    pub speaker_name: String,
    pub speaker_role: Option<String>,
    pub speaker_image_url: Option<String>,
    pub source: Option<String>,
    pub source_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<QuoteRow> for Quote {
    fn from(row: QuoteRow) -> Self {
        Quote {
            id: ResourceId::from(row.id),
            game_id: GameId::new(row.game_id),
            text: row.text,
            speaker_name: row.speaker_name,
            speaker_role: row.speaker_role,
            speaker_image_url: row.speaker_image_url,
            source: row.source,
            source_url: row.source_url,
            created_at: row.created_at,
        }
    }
}

/// PostgreSQL implementation of QuoteRepo.
pub struct PgQuoteRepo {
    pool: PgPool,
}

impl PgQuoteRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QuoteRepo for PgQuoteRepo {
    async fn insert(
        &self,
        game_id: GameId,
        quote: NewQuote,
        now: DateTime<Utc>,
    ) -> DbResult<Quote> {
        let quote = Quote::from_new(game_id, quote, now);
        sqlx::query(
            r#"
            INSERT INTO quotes (id, game_id, text, speaker_name, speaker_role,
                                speaker_image_url, source, source_url, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(quote.id.as_uuid())
        .bind(game_id.get())
        .bind(&quote.text)
        .bind(&quote.speaker_name)
        .bind(&quote.speaker_role)
        .bind(&quote.speaker_image_url)
        .bind(&quote.source)
        .bind(&quote.source_url)
        .bind(quote.created_at)
        .execute(&self.pool)
        .await?;
        Ok(quote)
    }

    async fn list_for_game(&self, game_id: GameId) -> DbResult<Vec<Quote>> {
        let rows = sqlx::query_as::<_, QuoteRow>(
            "SELECT * FROM quotes WHERE game_id = $1 ORDER BY created_at",
        )
        .bind(game_id.get())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Quote::from).collect())
    }
}

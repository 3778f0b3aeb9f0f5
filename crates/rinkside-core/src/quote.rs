//! Post-game quotes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{GameId, GameRecord, ResourceId, Result};

/// A quote as returned by a source, before it is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewQuote {
    pub text: String,
    pub speaker_name: String,
    /// "Head Coach", "Captain", ...
    pub speaker_role: Option<String>,
    pub speaker_image_url: Option<String>,
    /// "Post-game interview", ...
    pub source: Option<String>,
    pub source_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub id: ResourceId,
    pub game_id: GameId,
    pub text: String,
    pub speaker_name: String,
    pub speaker_role: Option<String>,
    pub speaker_image_url: Option<String>,
    pub source: Option<String>,
    pub source_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Quote {
    pub fn from_new(game_id: GameId, quote: NewQuote, now: DateTime<Utc>) -> Self {
        Self {
            id: ResourceId::new(),
            game_id,
            text: quote.text,
            speaker_name: quote.speaker_name,
            speaker_role: quote.speaker_role,
            speaker_image_url: quote.speaker_image_url,
            source: quote.source,
            source_url: quote.source_url,
            created_at: now,
        }
    }
}

#[async_trait]
pub trait QuoteSource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn quotes(&self, game: &GameRecord) -> Result<Vec<NewQuote>>;
}

/// Used when no quote provider is configured. Every game has no quotes.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoQuoteSource;

#[async_trait]
impl QuoteSource for NoQuoteSource {
    fn name(&self) -> &'static str {
        "none"
    }

    async fn quotes(&self, _game: &GameRecord) -> Result<Vec<NewQuote>> {
        Ok(Vec::new())
    }
}

//! Highlight videos and the search that finds them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::{Error, GameId, ResourceId, Result};

/// Declared in display priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoKind {
    /// From the league's official channel.
    NhlOfficial,
    /// The "Professor Hockey" season-review breakdown.
    ProfessorHockey,
    Other,
}

impl VideoKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoKind::NhlOfficial => "nhl_official",
            VideoKind::ProfessorHockey => "professor_hockey",
            VideoKind::Other => "other",
        }
    }
}

impl std::str::FromStr for VideoKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "nhl_official" => Ok(VideoKind::NhlOfficial),
            "professor_hockey" => Ok(VideoKind::ProfessorHockey),
            "other" => Ok(VideoKind::Other),
            other => Err(Error::InvalidInput(format!("unknown video kind: {}", other))),
        }
    }
}

/// A search hit, not yet attached to a game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoCandidate {
    pub youtube_id: String,
    pub title: String,
    pub channel_name: Option<String>,
    pub thumbnail_url: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub kind: VideoKind,
}

/// A stored video row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Video {
    pub id: ResourceId,
    pub game_id: GameId,
    pub youtube_id: String,
    pub title: String,
    pub channel_name: Option<String>,
    pub thumbnail_url: Option<String>,
    pub kind: VideoKind,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// What to search for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightQuery {
    pub game_id: GameId,
    /// Only videos published after this instant are considered.
    pub published_after: DateTime<Utc>,
    /// Query for the official league highlight package.
    pub official_query: String,
    /// Query for the season-review breakdown.
    pub review_query: String,
    /// Substring a review hit's channel name must contain, ignoring case.
    pub review_channel: String,
    /// Substring a review hit's title must contain, ignoring case.
    pub review_keyword: String,
    pub max_results: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HighlightResults {
    pub official: Option<VideoCandidate>,
    pub review: Option<VideoCandidate>,
    pub others: Vec<VideoCandidate>,
}

impl HighlightResults {
    /// All hits, official first, without repeated video ids.
    pub fn into_candidates(self) -> Vec<VideoCandidate> {
        let mut seen = HashSet::new();
        self.official
            .into_iter()
            .chain(self.review)
            .chain(self.others)
            .filter(|c| seen.insert(c.youtube_id.clone()))
            .collect()
    }
}

impl HighlightQuery {
    pub fn is_review(&self, channel_name: &str, title: &str) -> bool {
        channel_name
            .to_lowercase()
            .contains(&self.review_channel.to_lowercase())
            && title.to_lowercase().contains(&self.review_keyword.to_lowercase())
    }
}

#[async_trait]
pub trait HighlightSearch: Send + Sync {
    fn name(&self) -> &'static str;

    async fn search(&self, query: &HighlightQuery) -> Result<HighlightResults>;
}

/// Used when no video search is configured. Finds nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHighlightSearch;

#[async_trait]
impl HighlightSearch for NoHighlightSearch {
    fn name(&self) -> &'static str {
        "none"
    }

    async fn search(&self, _query: &HighlightQuery) -> Result<HighlightResults> {
        Ok(HighlightResults::default())
    }
}

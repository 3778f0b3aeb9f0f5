//! Fan discussion threads.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscussionComment {
    pub author: String,
    pub body: String,
    pub score: i64,
    pub created_utc: Option<DateTime<Utc>>,
    pub permalink: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscussionThread {
    pub thread_id: String,
    pub url: String,
    pub title: String,
    /// Top-level comments that are still visible, best first.
    pub comments: Vec<DiscussionComment>,
}

impl DiscussionThread {
    pub fn comment_count(&self) -> i32 {
        i32::try_from(self.comments.len()).unwrap_or(i32::MAX)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadQuery {
    pub away_team: String,
    pub home_team: String,
    pub game_date: NaiveDate,
    pub subreddit: String,
    pub comment_limit: u32,
}

impl ThreadQuery {
    /// Search terms for the subreddit search: `"SJS LAK 11/20/2025"`.
    pub fn search_terms(&self) -> String {
        format!(
            "{} {} {}",
            self.away_team,
            self.home_team,
            self.game_date.format("%m/%d/%Y")
        )
    }
}

/// A post title looks like the game thread for this matchup.
pub fn is_game_thread(title: &str, away_team: &str, home_team: &str) -> bool {
    let title = title.to_lowercase();
    let labelled = title.contains("game thread") || title.contains("gdt");
    labelled
        && (title.contains(&away_team.to_lowercase()) || title.contains(&home_team.to_lowercase()))
}

/// Deleted and removed comments keep their slot but lose their body.
pub fn is_visible_body(body: &str) -> bool {
    !matches!(body.trim(), "" | "[deleted]" | "[removed]")
}

#[async_trait]
pub trait DiscussionSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// `None` when no game thread exists.
    async fn find_thread(&self, query: &ThreadQuery) -> Result<Option<DiscussionThread>>;
}

//! Reddit public JSON endpoints.
//!
//! The raw [`RedditClient::search`] and [`RedditClient::comments`] calls hand
//! the upstream body back untouched for the API proxy. The
//! [`DiscussionSource`] implementation uses the same endpoints to find a
//! game thread and its top comments.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::DateTime;
use regex::Regex;
use rinkside_core::discussion::{
    is_game_thread, is_visible_body, DiscussionComment, DiscussionSource, DiscussionThread,
    ThreadQuery,
};
use rinkside_core::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::{debug, info};
use url::Url;

use crate::http::{check_status, transport};

const SERVICE: &str = "Reddit API";

/// Search results scanned for a game thread.
const THREAD_SEARCH_LIMIT: &str = "5";

/// Query accepted by the search pass-through.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchParams {
    pub q: String,
    pub subreddit: Option<String>,
    pub limit: Option<String>,
    pub sort: Option<String>,
    pub t: Option<String>,
}

/// Query accepted by the comments pass-through.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentsParams {
    pub permalink: String,
    pub limit: Option<String>,
    pub sort: Option<String>,
}

pub struct RedditClient {
    client: reqwest::Client,
    base_url: String,
    user_agent: String,
}

#[derive(Debug, Deserialize)]
struct Listing<T> {
    data: ListingData<T>,
}

#[derive(Debug, Deserialize)]
struct ListingData<T> {
    #[serde(default = "Vec::new")]
    children: Vec<Thing<T>>,
}

#[derive(Debug, Deserialize)]
struct Thing<T> {
    kind: String,
    data: T,
}

#[derive(Debug, Deserialize)]
struct PostData {
    id: String,
    title: String,
    permalink: String,
}

/// `more` stubs share the listing with real comments, so every field is optional.
#[derive(Debug, Default, Deserialize)]
struct CommentData {
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    score: Option<i64>,
    #[serde(default)]
    created_utc: Option<f64>,
    #[serde(default)]
    permalink: Option<String>,
}

impl CommentData {
    fn into_comment(self) -> Option<DiscussionComment> {
        let body = self.body.filter(|b| is_visible_body(b))?;
        Some(DiscussionComment {
            author: self
                .author
                .filter(|a| !a.is_empty())
                .unwrap_or_else(|| "Anonymous".to_string()),
            body,
            score: self.score.unwrap_or(0),
            created_utc: self
                .created_utc
                .and_then(|secs| DateTime::from_timestamp(secs as i64, 0)),
            permalink: self.permalink,
        })
    }
}

fn is_reddit_host(host: &str) -> bool {
    host == "reddit.com" || host.ends_with(".reddit.com")
}

static SUBREDDIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]{2,21}$").unwrap());

/// Reject subreddit names that would change the path or query they are
/// spliced into.
fn check_subreddit(subreddit: &str) -> Result<&str> {
    if SUBREDDIT.is_match(subreddit) {
        Ok(subreddit)
    } else {
        Err(Error::InvalidInput("Invalid subreddit param".to_string()))
    }
}

impl RedditClient {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        user_agent: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            user_agent: user_agent.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> Result<Url> {
        Url::parse(&format!("{}{}", self.base_url, path))
            .map_err(|e| Error::Internal(format!("bad Reddit URL {}: {}", path, e)))
    }

    /// Resolve a post permalink to its `.json` URL on the configured host.
    ///
    /// Relative permalinks are joined to the base URL. Absolute ones must
    /// point at Reddit (or the configured base host); only their path is kept.
    pub fn comments_url(&self, permalink: &str) -> Result<Url> {
        let invalid = || Error::InvalidInput("Invalid permalink param".to_string());

        let path = if permalink.starts_with('/') {
            permalink.to_string()
        } else {
            let absolute = Url::parse(permalink).map_err(|_| invalid())?;
            let host = absolute.host_str().ok_or_else(invalid)?;
            let base_host = Url::parse(&self.base_url)
                .ok()
                .and_then(|u| u.host_str().map(str::to_string));
            if !is_reddit_host(host) && base_host.as_deref() != Some(host) {
                return Err(invalid());
            }
            absolute.path().to_string()
        };

        let path = path.trim_end_matches('/');
        if path.is_empty() || path.contains("..") {
            return Err(invalid());
        }
        self.url(&format!("{}.json", path))
    }

    async fn fetch(&self, url: Url) -> Result<Bytes> {
        debug!(url = %url, "GET");
        let response = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .send()
            .await
            .map_err(|e| transport(SERVICE, e))?;
        let response = check_status(SERVICE, response)?;
        response.bytes().await.map_err(|e| transport(SERVICE, e))
    }

    async fn fetch_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let body = self.fetch(url).await?;
        serde_json::from_slice(&body).map_err(|e| Error::Malformed(format!("{}: {}", SERVICE, e)))
    }

    /// Search all of Reddit, or one subreddit when given.
    pub async fn search(&self, params: &SearchParams) -> Result<Bytes> {
        let mut url = match params.subreddit.as_deref().filter(|s| !s.is_empty()) {
            Some(subreddit) => {
                self.url(&format!("/r/{}/search.json", check_subreddit(subreddit)?))?
            }
            None => self.url("/search.json")?,
        };
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("q", &params.q);
            if params.subreddit.as_deref().is_some_and(|s| !s.is_empty()) {
                query.append_pair("restrict_sr", "on");
            }
            for (key, value) in [
                ("limit", &params.limit),
                ("sort", &params.sort),
                ("t", &params.t),
            ] {
                if let Some(value) = value {
                    query.append_pair(key, value);
                }
            }
        }
        self.fetch(url).await
    }

    /// Comments for a post, by permalink.
    pub async fn comments(&self, params: &CommentsParams) -> Result<Bytes> {
        let mut url = self.comments_url(&params.permalink)?;
        {
            let mut query = url.query_pairs_mut();
            for (key, value) in [("limit", &params.limit), ("sort", &params.sort)] {
                if let Some(value) = value {
                    query.append_pair(key, value);
                }
            }
        }
        if url.query() == Some("") {
            url.set_query(None);
        }
        self.fetch(url).await
    }
}

#[async_trait]
impl DiscussionSource for RedditClient {
    fn name(&self) -> &'static str {
        "reddit"
    }

    async fn find_thread(&self, query: &ThreadQuery) -> Result<Option<DiscussionThread>> {
        let subreddit = check_subreddit(&query.subreddit)?;
        let mut search_url = self.url(&format!("/r/{}/search.json", subreddit))?;
        search_url
            .query_pairs_mut()
            .append_pair("q", &query.search_terms())
            .append_pair("restrict_sr", "on")
            .append_pair("sort", "relevance")
            .append_pair("limit", THREAD_SEARCH_LIMIT);

        let results: Listing<PostData> = self.fetch_json(search_url).await?;
        let Some(post) = results
            .data
            .children
            .into_iter()
            .map(|thing| thing.data)
            .find(|post| is_game_thread(&post.title, &query.away_team, &query.home_team))
        else {
            info!(
                subreddit = %query.subreddit,
                terms = %query.search_terms(),
                "No game thread found"
            );
            return Ok(None);
        };

        let mut comments_url =
            self.url(&format!("/r/{}/comments/{}.json", subreddit, post.id))?;
        comments_url
            .query_pairs_mut()
            .append_pair("sort", "top")
            .append_pair("limit", &query.comment_limit.to_string());

        let (_post, listing): (serde_json::Value, Listing<CommentData>) =
            self.fetch_json(comments_url).await?;
        let comments: Vec<DiscussionComment> = listing
            .data
            .children
            .into_iter()
            .filter(|thing| thing.kind == "t1")
            .filter_map(|thing| thing.data.into_comment())
            .take(query.comment_limit as usize)
            .collect();

        debug!(thread_id = %post.id, comments = comments.len(), "Found game thread");
        Ok(Some(DiscussionThread {
            url: format!("{}{}", self.base_url, post.permalink),
            thread_id: post.id,
            title: post.title,
            comments,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> RedditClient {
        RedditClient::new(reqwest::Client::new(), "https://www.reddit.com/", "test-agent")
    }

    #[test]
    fn test_relative_permalink_is_joined_to_base() {
        let url = client()
            .comments_url("/r/SanJoseSharks/comments/abc123/game_thread/")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://www.reddit.com/r/SanJoseSharks/comments/abc123/game_thread.json"
        );
    }

    #[test]
    fn test_absolute_reddit_permalink_keeps_path() {
        let url = client()
            .comments_url("https://old.reddit.com/r/hockey/comments/xyz/post/")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://www.reddit.com/r/hockey/comments/xyz/post.json"
        );
    }

    #[test]
    fn test_foreign_hosts_are_rejected() {
        let client = client();
        for permalink in [
            "https://example.com/r/hockey/comments/xyz",
            "http://169.254.169.254/latest/meta-data",
            "r/hockey/comments/xyz",
            "/",
        ] {
            let err = client.comments_url(permalink).unwrap_err();
            assert!(matches!(err, Error::InvalidInput(_)), "{permalink}");
        }
    }

    #[test]
    fn test_subreddit_names() {
        for name in ["SanJoseSharks", "hockey", "nhl_2025"] {
            assert_eq!(check_subreddit(name).unwrap(), name);
        }
        let too_long = "x".repeat(22);
        for name in ["a", "a?b", "../x", "sharks/comments", "a b", too_long.as_str()] {
            let err = check_subreddit(name).unwrap_err();
            assert!(matches!(err, Error::InvalidInput(_)), "{name}");
        }
    }

    #[tokio::test]
    async fn test_search_rejects_bad_subreddit_before_fetching() {
        let params = SearchParams {
            q: "game thread".to_string(),
            subreddit: Some("sharks?restrict_sr=off".to_string()),
            ..SearchParams::default()
        };
        let err = client().search(&params).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(ref m) if m == "Invalid subreddit param"));
    }

    #[test]
    fn test_deleted_comments_are_dropped() {
        let deleted = CommentData {
            body: Some("[deleted]".to_string()),
            ..CommentData::default()
        };
        assert!(deleted.into_comment().is_none());

        let anonymous = CommentData {
            body: Some("What a finish".to_string()),
            created_utc: Some(1_763_700_000.0),
            ..CommentData::default()
        }
        .into_comment()
        .unwrap();
        assert_eq!(anonymous.author, "Anonymous");
        assert_eq!(anonymous.score, 0);
        assert!(anonymous.created_utc.is_some());
    }
}

//! YouTube Data API highlight search.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rinkside_core::media::{
    HighlightQuery, HighlightResults, HighlightSearch, VideoCandidate, VideoKind,
};
use rinkside_core::Result;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::http::{read_json, transport};

const SERVICE: &str = "YouTube API";

/// The league's official channel.
pub const NHL_CHANNEL_ID: &str = "UCqFMzb-4AUf6WAIbl132QKA";

/// Review candidates fetched before filtering by channel and title.
const REVIEW_CANDIDATES: u32 = 3;

pub struct YouTubeClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    official_channel_id: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: ItemId,
    snippet: Snippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemId {
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    title: String,
    #[serde(default)]
    channel_title: Option<String>,
    #[serde(default)]
    published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    thumbnails: Thumbnails,
}

#[derive(Debug, Default, Deserialize)]
struct Thumbnails {
    high: Option<Thumbnail>,
    default: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

impl SearchItem {
    fn into_candidate(self, kind: VideoKind) -> Option<VideoCandidate> {
        let youtube_id = self.id.video_id?;
        let thumbnails = self.snippet.thumbnails;
        Some(VideoCandidate {
            youtube_id,
            title: self.snippet.title,
            channel_name: self.snippet.channel_title,
            thumbnail_url: thumbnails.high.or(thumbnails.default).map(|t| t.url),
            published_at: self.snippet.published_at,
            kind,
        })
    }
}

struct SearchRequest<'a> {
    q: &'a str,
    channel_id: Option<&'a str>,
    max_results: u32,
    order: &'a str,
    published_after: DateTime<Utc>,
}

impl YouTubeClient {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            official_channel_id: NHL_CHANNEL_ID.to_string(),
        }
    }

    pub fn with_official_channel(mut self, channel_id: impl Into<String>) -> Self {
        self.official_channel_id = channel_id.into();
        self
    }

    async fn search_videos(&self, request: SearchRequest<'_>) -> Result<Vec<SearchItem>> {
        let max_results = request.max_results.to_string();
        let published_after = request
            .published_after
            .to_rfc3339_opts(SecondsFormat::Secs, true);
        let mut params = vec![
            ("part", "id,snippet"),
            ("type", "video"),
            ("q", request.q),
            ("maxResults", max_results.as_str()),
            ("order", request.order),
            ("publishedAfter", published_after.as_str()),
            ("key", self.api_key.as_str()),
        ];
        if let Some(channel_id) = request.channel_id {
            params.push(("channelId", channel_id));
        }

        debug!(q = %request.q, order = %request.order, "Searching videos");
        let response = self
            .client
            .get(format!("{}/search", self.base_url))
            .query(&params)
            .send()
            .await
            .map_err(|e| transport(SERVICE, e))?;
        let body: SearchResponse = read_json(SERVICE, response).await?;
        Ok(body.items)
    }
}

#[async_trait]
impl HighlightSearch for YouTubeClient {
    fn name(&self) -> &'static str {
        "youtube"
    }

    async fn search(&self, query: &HighlightQuery) -> Result<HighlightResults> {
        let (official, review, others) = futures::join!(
            self.search_videos(SearchRequest {
                q: &query.official_query,
                channel_id: Some(&self.official_channel_id),
                max_results: 1,
                order: "date",
                published_after: query.published_after,
            }),
            self.search_videos(SearchRequest {
                q: &query.review_query,
                channel_id: None,
                max_results: REVIEW_CANDIDATES,
                order: "relevance",
                published_after: query.published_after,
            }),
            self.search_videos(SearchRequest {
                q: &query.official_query,
                channel_id: None,
                max_results: query.max_results,
                order: "relevance",
                published_after: query.published_after,
            }),
        );

        // One failed search is tolerated; all three failing is an error.
        let (official, review, others) = match (official, review, others) {
            (Err(_), Err(_), Err(e)) => return Err(e),
            results => results,
        };

        let official = official
            .inspect_err(|e| warn!(game_id = %query.game_id, error = %e, "Official highlight search failed"))
            .unwrap_or_default()
            .into_iter()
            .find_map(|item| item.into_candidate(VideoKind::NhlOfficial));

        let review = review
            .inspect_err(|e| warn!(game_id = %query.game_id, error = %e, "Review video search failed"))
            .unwrap_or_default()
            .into_iter()
            .filter(|item| {
                query.is_review(
                    item.snippet.channel_title.as_deref().unwrap_or_default(),
                    &item.snippet.title,
                )
            })
            .find_map(|item| item.into_candidate(VideoKind::ProfessorHockey));

        let others = others
            .inspect_err(|e| warn!(game_id = %query.game_id, error = %e, "Highlight search failed"))
            .unwrap_or_default()
            .into_iter()
            .filter_map(|item| item.into_candidate(VideoKind::Other))
            .collect();

        Ok(HighlightResults {
            official,
            review,
            others,
        })
    }
}

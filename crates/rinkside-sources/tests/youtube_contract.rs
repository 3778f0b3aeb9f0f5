//! YouTube Data API contract tests.

use chrono::{TimeZone, Utc};
use rinkside_core::media::{HighlightQuery, HighlightSearch, VideoKind};
use rinkside_core::{Error, GameId};
use rinkside_sources::YouTubeClient;
use rinkside_sources::youtube::NHL_CHANNEL_ID;
use serde_json::{Value, json};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn query() -> HighlightQuery {
    HighlightQuery {
        game_id: GameId::new(2025020190),
        published_after: Utc.with_ymd_and_hms(2025, 11, 2, 0, 0, 0).unwrap(),
        official_query: "SJS vs LAK highlights".to_string(),
        review_query: "Sharks Review Game 14".to_string(),
        review_channel: "professor".to_string(),
        review_keyword: "sharks".to_string(),
        max_results: 5,
    }
}

fn item(id: &str, title: &str, channel: &str) -> Value {
    json!({
        "id": {"kind": "youtube#video", "videoId": id},
        "snippet": {
            "title": title,
            "channelTitle": channel,
            "publishedAt": "2025-11-02T06:00:00Z",
            "thumbnails": {
                "default": {"url": format!("https://i.ytimg.com/vi/{id}/default.jpg")},
                "high": {"url": format!("https://i.ytimg.com/vi/{id}/hqdefault.jpg")}
            }
        }
    })
}

#[tokio::test]
async fn test_three_searches_are_classified() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("channelId", NHL_CHANNEL_ID))
        .and(query_param("order", "date"))
        .and(query_param("key", "yt-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [item("official1", "Sharks at Kings | Highlights", "NHL")]
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "Sharks Review Game 14"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                item("wrong1", "Sharks Review Game 14", "Some Fan"),
                item("review1", "Sharks Review: Game 14", "Professor Hockey")
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "SJS vs LAK highlights"))
        .and(query_param("order", "relevance"))
        .and(query_param("maxResults", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                item("official1", "Sharks at Kings | Highlights", "NHL"),
                item("other1", "All goals", "Hockey Clips")
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = YouTubeClient::new(reqwest::Client::new(), server.uri(), "yt-key");
    let results = client.search(&query()).await.unwrap();

    let official = results.official.clone().unwrap();
    assert_eq!(official.youtube_id, "official1");
    assert_eq!(official.kind, VideoKind::NhlOfficial);
    assert_eq!(
        official.thumbnail_url.as_deref(),
        Some("https://i.ytimg.com/vi/official1/hqdefault.jpg")
    );
    assert_eq!(results.review.clone().unwrap().youtube_id, "review1");

    let ids: Vec<_> = results
        .into_candidates()
        .into_iter()
        .map(|c| c.youtube_id)
        .collect();
    assert_eq!(ids, vec!["official1", "review1", "other1"]);
}

#[tokio::test]
async fn test_one_failed_search_is_tolerated() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("order", "date"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("order", "relevance"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [item("other1", "All goals", "Hockey Clips")]
        })))
        .mount(&server)
        .await;

    let client = YouTubeClient::new(reqwest::Client::new(), server.uri(), "yt-key");
    let results = client.search(&query()).await.unwrap();
    assert!(results.official.is_none());
    assert!(results.review.is_none());
    assert_eq!(results.others.len(), 1);
}

#[tokio::test]
async fn test_all_searches_failing_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(403))
        .expect(3)
        .mount(&server)
        .await;

    let client = YouTubeClient::new(reqwest::Client::new(), server.uri(), "bad-key");
    let err = client.search(&query()).await.unwrap_err();
    assert!(matches!(err, Error::Upstream { status: 403, .. }));
}

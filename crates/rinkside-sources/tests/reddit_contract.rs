//! Reddit JSON endpoint contract tests.

use chrono::NaiveDate;
use rinkside_core::Error;
use rinkside_core::discussion::{DiscussionSource, ThreadQuery};
use rinkside_sources::{CommentsParams, RedditClient, SearchParams};
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> RedditClient {
    RedditClient::new(reqwest::Client::new(), server.uri(), "rinkside-test/1.0")
}

#[tokio::test]
async fn test_subreddit_search_is_passed_through() {
    let server = MockServer::start().await;
    let body = json!({"kind": "Listing", "data": {"children": [], "after": null}});

    Mock::given(method("GET"))
        .and(path("/r/SanJoseSharks/search.json"))
        .and(query_param("q", "game thread"))
        .and(query_param("restrict_sr", "on"))
        .and(query_param("sort", "new"))
        .and(header("user-agent", "rinkside-test/1.0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let params = SearchParams {
        q: "game thread".to_string(),
        subreddit: Some("SanJoseSharks".to_string()),
        sort: Some("new".to_string()),
        ..SearchParams::default()
    };
    let bytes = client(&server).search(&params).await.unwrap();
    let returned: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(returned, body);
}

#[tokio::test]
async fn test_site_search_without_subreddit() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search.json"))
        .and(query_param("q", "sharks"))
        .and(query_param("limit", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(1)
        .mount(&server)
        .await;

    let params = SearchParams {
        q: "sharks".to_string(),
        limit: Some("3".to_string()),
        ..SearchParams::default()
    };
    client(&server).search(&params).await.unwrap();
}

#[tokio::test]
async fn test_comments_use_permalink_path() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/r/SanJoseSharks/comments/abc123/game_thread.json"))
        .and(query_param("limit", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .expect(1)
        .mount(&server)
        .await;

    let params = CommentsParams {
        permalink: "/r/SanJoseSharks/comments/abc123/game_thread/".to_string(),
        limit: Some("10".to_string()),
        sort: None,
    };
    let bytes = client(&server).comments(&params).await.unwrap();
    assert_eq!(&bytes[..], b"[]");
}

#[tokio::test]
async fn test_upstream_status_is_reported() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search.json"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let params = SearchParams {
        q: "sharks".to_string(),
        ..SearchParams::default()
    };
    let err = client(&server).search(&params).await.unwrap_err();
    assert!(matches!(err, Error::Upstream { status: 429, .. }));
}

fn thread_query() -> ThreadQuery {
    ThreadQuery {
        away_team: "SJS".to_string(),
        home_team: "LAK".to_string(),
        game_date: NaiveDate::from_ymd_opt(2025, 11, 1).unwrap(),
        subreddit: "SanJoseSharks".to_string(),
        comment_limit: 2,
    }
}

#[tokio::test]
async fn test_find_thread_collects_visible_comments() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/r/SanJoseSharks/search.json"))
        .and(query_param("q", "SJS LAK 11/01/2025"))
        .and(query_param("restrict_sr", "on"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "kind": "Listing",
            "data": {"children": [
                {"kind": "t3", "data": {
                    "id": "zzz", "title": "Post game: rough night",
                    "permalink": "/r/SanJoseSharks/comments/zzz/post_game/"
                }},
                {"kind": "t3", "data": {
                    "id": "abc123", "title": "Game Thread: SJS @ LAK - 11/01/2025",
                    "permalink": "/r/SanJoseSharks/comments/abc123/game_thread/"
                }}
            ]}
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/r/SanJoseSharks/comments/abc123.json"))
        .and(query_param("sort", "top"))
        .and(query_param("limit", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"kind": "Listing", "data": {"children": []}},
            {"kind": "Listing", "data": {"children": [
                {"kind": "t1", "data": {"author": "teal_fan", "body": "Celly!", "score": 120, "created_utc": 1762050000.0}},
                {"kind": "t1", "data": {"author": "[deleted]", "body": "[removed]", "score": 3}},
                {"kind": "t1", "data": {"body": "Two points", "score": 40}},
                {"kind": "more", "data": {"count": 12, "children": ["x", "y"]}}
            ]}}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let reddit = client(&server);
    let thread = reddit.find_thread(&thread_query()).await.unwrap().unwrap();
    assert_eq!(thread.thread_id, "abc123");
    assert_eq!(
        thread.url,
        format!("{}/r/SanJoseSharks/comments/abc123/game_thread/", server.uri())
    );
    assert_eq!(thread.comment_count(), 2);
    assert_eq!(thread.comments[0].author, "teal_fan");
    assert_eq!(thread.comments[1].author, "Anonymous");
}

#[tokio::test]
async fn test_find_thread_without_match() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/r/SanJoseSharks/search.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "kind": "Listing",
            "data": {"children": [
                {"kind": "t3", "data": {"id": "q1", "title": "Trade rumours", "permalink": "/r/SanJoseSharks/comments/q1/x/"}}
            ]}
        })))
        .mount(&server)
        .await;

    let thread = client(&server).find_thread(&thread_query()).await.unwrap();
    assert!(thread.is_none());
}

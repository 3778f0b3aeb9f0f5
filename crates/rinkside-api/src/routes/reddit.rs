//! Reddit proxy endpoints.
//!
//! Requests are forwarded to Reddit's public JSON endpoints and the upstream
//! body is returned unmodified, with a cache header for the CDN.

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use rinkside_sources::{CommentsParams, SearchParams};
use serde::Deserialize;
use tracing::debug;

use crate::AppState;
use crate::error::ApiError;

pub const CACHE_CONTROL: &str = "s-maxage=300, stale-while-revalidate=300";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/search", get(search))
        .route("/comments", get(comments))
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    q: Option<String>,
    subreddit: Option<String>,
    limit: Option<String>,
    sort: Option<String>,
    t: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CommentsQuery {
    permalink: Option<String>,
    limit: Option<String>,
    sort: Option<String>,
}

fn required(value: Option<String>, name: &str) -> Result<String, ApiError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest(format!("Missing {} param", name)))
}

fn json_body(body: Bytes) -> Response {
    (
        [
            (header::CONTENT_TYPE, "application/json"),
            (header::CACHE_CONTROL, CACHE_CONTROL),
        ],
        body,
    )
        .into_response()
}

async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Response, ApiError> {
    let params = SearchParams {
        q: required(query.q, "q")?,
        subreddit: query.subreddit,
        limit: query.limit,
        sort: query.sort,
        t: query.t,
    };
    debug!(q = %params.q, subreddit = ?params.subreddit, "Proxying Reddit search");
    let body = state.reddit.search(&params).await?;
    Ok(json_body(body))
}

async fn comments(
    State(state): State<AppState>,
    Query(query): Query<CommentsQuery>,
) -> Result<Response, ApiError> {
    let params = CommentsParams {
        permalink: required(query.permalink, "permalink")?,
        limit: query.limit,
        sort: query.sort,
    };
    debug!(permalink = %params.permalink, "Proxying Reddit comments");
    let body = state.reddit.comments(&params).await?;
    Ok(json_body(body))
}

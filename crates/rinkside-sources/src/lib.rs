//! HTTP clients for the external services the pipeline talks to.
//!
//! Each client implements one of the source traits from `rinkside-core`:
//! - [`NhlClient`]: the league schedule and game feed
//! - [`YouTubeClient`]: highlight video search
//! - [`AnthropicRecapWriter`]: recap generation
//! - [`RedditClient`]: game-thread lookup, plus the raw search/comments
//!   pass-through used by the API proxy

mod http;

pub mod anthropic;
pub mod nhl;
pub mod reddit;
pub mod youtube;

pub use anthropic::AnthropicRecapWriter;
pub use nhl::NhlClient;
pub use reddit::{CommentsParams, RedditClient, SearchParams};
pub use youtube::YouTubeClient;

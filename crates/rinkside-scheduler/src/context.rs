//! The external sources and stores a pipeline run works against.

use rinkside_core::discussion::DiscussionSource;
use rinkside_core::feed::GameFeed;
use rinkside_core::media::{HighlightSearch, NoHighlightSearch};
use rinkside_core::quote::{NoQuoteSource, QuoteSource};
use rinkside_core::recap::{RecapWriter, TemplateRecapWriter};
use rinkside_db::{GameRepo, MemoryStore, QuoteRepo, VideoRepo};
use std::sync::Arc;

#[derive(Clone)]
pub struct Sources {
    pub feed: Arc<dyn GameFeed>,
    pub highlights: Arc<dyn HighlightSearch>,
    pub recaps: Arc<dyn RecapWriter>,
    pub discussion: Arc<dyn DiscussionSource>,
    pub quotes: Arc<dyn QuoteSource>,
}

impl Sources {
    /// Feed and discussion lookup only; videos, recaps and quotes fall back
    /// to the no-op implementations.
    pub fn new(feed: Arc<dyn GameFeed>, discussion: Arc<dyn DiscussionSource>) -> Self {
        Self {
            feed,
            highlights: Arc::new(NoHighlightSearch),
            recaps: Arc::new(TemplateRecapWriter),
            discussion,
            quotes: Arc::new(NoQuoteSource),
        }
    }

    pub fn with_highlights(mut self, highlights: Arc<dyn HighlightSearch>) -> Self {
        self.highlights = highlights;
        self
    }

    pub fn with_recaps(mut self, recaps: Arc<dyn RecapWriter>) -> Self {
        self.recaps = recaps;
        self
    }

    pub fn with_quotes(mut self, quotes: Arc<dyn QuoteSource>) -> Self {
        self.quotes = quotes;
        self
    }
}

#[derive(Clone)]
pub struct Stores {
    pub games: Arc<dyn GameRepo>,
    pub videos: Arc<dyn VideoRepo>,
    pub quotes: Arc<dyn QuoteRepo>,
}

impl Stores {
    /// All three repositories backed by one in-memory store.
    pub fn memory(store: Arc<MemoryStore>) -> Self {
        Self {
            games: store.clone(),
            videos: store.clone(),
            quotes: store,
        }
    }
}

//! Application state.

use rinkside_config::PipelineConfig;
use rinkside_scheduler::{Scheduler, Stores};
use rinkside_sources::RedditClient;
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub stores: Stores,
    pub reddit: Arc<RedditClient>,
    pub scheduler: Arc<Scheduler>,
}

impl AppState {
    pub fn new(stores: Stores, reddit: Arc<RedditClient>, scheduler: Arc<Scheduler>) -> Self {
        Self {
            stores,
            reddit,
            scheduler,
        }
    }

    pub fn pipeline(&self) -> &PipelineConfig {
        self.scheduler.config()
    }
}

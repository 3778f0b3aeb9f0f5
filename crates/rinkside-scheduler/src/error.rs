//! Scheduler error types.

use rinkside_db::DbError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("a scheduler tick is already running")]
    TickInProgress,

    #[error("game {game_id} has unfinished stages: {stages}")]
    Unfinished { game_id: String, stages: String },

    #[error(transparent)]
    Source(#[from] rinkside_core::Error),

    #[error(transparent)]
    Db(#[from] DbError),
}

pub type SchedulerResult<T> = std::result::Result<T, SchedulerError>;

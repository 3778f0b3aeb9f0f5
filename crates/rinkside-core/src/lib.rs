//! Core domain types and traits for the Rinkside game pipeline.
//!
//! This crate contains:
//! - Game and resource identifiers
//! - The persisted game record and its per-stage markers
//! - Pipeline stages and the delay schedule that decides when each is due
//! - Traits for the external sources each stage talks to (schedule feed,
//!   highlight search, recap writer, discussion lookup, quotes)

pub mod discussion;
pub mod error;
pub mod feed;
pub mod game;
pub mod id;
pub mod media;
pub mod quote;
pub mod recap;
pub mod stage;

pub use error::{Error, Result};
pub use game::{GameRecord, GameStatus, GoalDetail, StageMarker, StageMarkers};
pub use id::{GameId, ResourceId};
pub use stage::{Stage, StagePlanEntry, StageSchedule};

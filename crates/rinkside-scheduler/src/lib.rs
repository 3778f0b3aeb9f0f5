//! Game discovery and the staged post-game pipeline.
//!
//! Each tick discovers new and finished games from the schedule feed, then
//! walks every in-flight game through the stages that are due. Games are
//! claimed with a lease in the database so that several processes can tick
//! without doing the same work twice.

pub mod context;
pub mod discovery;
pub mod error;
pub mod runner;
pub mod scheduler;

#[cfg(test)]
pub(crate) mod testing;

pub use context::{Sources, Stores};
pub use discovery::{DiscoveryReport, discover_games};
pub use error::{SchedulerError, SchedulerResult};
pub use runner::{StageOutcome, StageRunner};
pub use scheduler::{Scheduler, SchedulerStatus, TickReport, next_tick_after};

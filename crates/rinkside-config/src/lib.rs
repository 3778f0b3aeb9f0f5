//! Configuration for Rinkside.
//!
//! This crate handles:
//! - The pipeline definition (`rinkside.kdl`)
//! - System settings read from the environment
//! - `${...}` interpolation in search-query templates

pub mod error;
pub mod pipeline;
pub mod system;
pub mod variables;

pub use error::{ConfigError, ConfigResult};
pub use pipeline::{
    MediaQueries, PipelineConfig, SchedulerSettings, load_pipeline_config, parse_duration,
    parse_pipeline_config,
};
pub use system::SystemConfig;
pub use variables::QueryContext;

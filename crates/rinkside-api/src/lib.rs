//! API server for Rinkside.
//!
//! Serves the Reddit proxy endpoints, the games read API and the scheduler
//! monitoring endpoints. The server process also hosts the scheduler task.

pub mod error;
pub mod routes;
pub mod state;

pub use state::AppState;

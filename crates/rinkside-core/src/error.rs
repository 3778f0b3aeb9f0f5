//! Error types for Rinkside.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("{service} returned HTTP {status}")]
    Upstream { service: String, status: u16 },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn upstream(service: impl Into<String>, status: u16) -> Self {
        Error::Upstream {
            service: service.into(),
            status,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

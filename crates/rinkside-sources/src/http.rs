//! Response handling shared by the clients.

use rinkside_core::{Error, Result};
use serde::de::DeserializeOwned;

pub(crate) fn transport(service: &str, err: reqwest::Error) -> Error {
    Error::Transport(format!("{}: {}", service, err))
}

/// Turn a non-2xx response into [`Error::Upstream`].
pub(crate) fn check_status(
    service: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response> {
    let status = response.status();
    if !status.is_success() {
        return Err(Error::upstream(service, status.as_u16()));
    }
    Ok(response)
}

pub(crate) async fn read_json<T: DeserializeOwned>(
    service: &str,
    response: reqwest::Response,
) -> Result<T> {
    let response = check_status(service, response)?;
    response
        .json()
        .await
        .map_err(|e| Error::Malformed(format!("{}: {}", service, e)))
}

//! Shared HTTP client setup

use crate::error::GrabError;
use grab_types::Settings;
use reqwest::{Client, Response};
use std::time::Duration;

/// Build the client used for direct downloads and torrent file fetches
///
/// Identifies as a regular browser; some hosts refuse default client
/// identification. No overall timeout is set so large bodies can stream.
pub fn build_client(settings: &Settings) -> Result<Client, GrabError> {
    let client = Client::builder()
        .user_agent(settings.user_agent.clone())
        .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
        .build()?;
    Ok(client)
}

/// Turn a non-2xx response into a server error
pub(crate) fn ensure_success(response: Response) -> Result<Response, GrabError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(GrabError::ServerError {
            status: status.as_u16(),
            message: status
                .canonical_reason()
                .unwrap_or("Unexpected status")
                .to_string(),
        })
    }
}

/// Declared Content-Length, if any
pub(crate) fn declared_length(response: &Response) -> Option<u64> {
    response
        .headers()
        .get(reqwest::header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

//! HTTP clients for the two metadata providers.

pub mod bangumi;
pub mod jikan;

use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use thiserror::Error;

pub use bangumi::BangumiClient;
pub use jikan::JikanClient;

/// Errors raised while talking to a provider.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid request URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("{provider} API error: {status} - {body}")]
    Status {
        provider: &'static str,
        status: StatusCode,
        body: String,
    },
}

fn build_http_client(user_agent: &str, timeout_seconds: u64) -> Result<Client, FetchError> {
    Ok(Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(timeout_seconds))
        .build()?)
}

/// Turns a non-success response into [`FetchError::Status`].
async fn check_status(provider: &'static str, response: Response) -> Result<Response, FetchError> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(FetchError::Status {
        provider,
        status,
        body,
    })
}

//! HTTP transport with bounded retry
//!
//! Every outbound GET in the pipeline goes through [`Transport::fetch_with_retry`].
//! Not-found responses are terminal; any other failure is retried with a
//! linear backoff (`backoff_step * attempt`) until the attempt budget runs out.

use anyhow::Context;
use reqwest::header::HeaderMap;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Default number of attempts per request
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default linear backoff step
pub const DEFAULT_BACKOFF_STEP: Duration = Duration::from_millis(1000);

/// Transport-level errors
#[derive(Error, Debug)]
pub enum FetchError {
    /// The resource does not exist; never retried
    #[error("Not found: {url}")]
    NotFound { url: String },

    /// A non-success status that survived every retry
    #[error("HTTP {status}")]
    Status { status: u16, url: String },

    /// Connection, TLS or timeout failure
    #[error("Request to {url} failed")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The body could not be read or decoded
    #[error("Failed to decode response from {url}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::NotFound { .. })
    }

    /// Status code carried by the error, if the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::NotFound { .. } => Some(StatusCode::NOT_FOUND.as_u16()),
            FetchError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Retry budget and backoff
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,

    /// Delay unit; attempt N is followed by a wait of `backoff_step * N`
    pub backoff_step: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_step: DEFAULT_BACKOFF_STEP,
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after the given failed attempt (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.backoff_step.saturating_mul(attempt)
    }
}

/// Shared HTTP client plus retry policy
#[derive(Debug, Clone)]
pub struct Transport {
    client: Client,
    policy: RetryPolicy,
}

impl Transport {
    /// Build a transport with the crate's user agent
    ///
    /// No explicit timeout is set; per-attempt timeouts are left to the client default.
    pub fn new(policy: RetryPolicy) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("themedex/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, policy })
    }

    /// Wrap an existing client
    pub fn with_client(client: Client, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// GET `url`, retrying transient failures
    pub async fn fetch_with_retry(
        &self,
        url: &str,
        headers: &HeaderMap,
    ) -> Result<Response, FetchError> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let error = match self.client.get(url).headers(headers.clone()).send().await {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) if response.status() == StatusCode::NOT_FOUND => {
                    debug!("GET {} -> 404", url);
                    return Err(FetchError::NotFound {
                        url: url.to_string(),
                    });
                }
                Ok(response) => FetchError::Status {
                    status: response.status().as_u16(),
                    url: url.to_string(),
                },
                Err(source) => FetchError::Network {
                    url: url.to_string(),
                    source,
                },
            };

            if attempt >= max_attempts {
                debug!("GET {} failed after {} attempts: {}", url, attempt, error);
                return Err(error);
            }

            let delay = self.policy.delay_for(attempt);
            debug!(
                "GET {} attempt {}/{} failed ({}), retrying in {:?}",
                url, attempt, max_attempts, error, delay
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    /// GET and decode a JSON body
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        headers: &HeaderMap,
    ) -> Result<T, FetchError> {
        let response = self.fetch_with_retry(url, headers).await?;
        response.json::<T>().await.map_err(|source| FetchError::Decode {
            url: url.to_string(),
            source,
        })
    }

    /// GET a text body
    pub async fn get_text(&self, url: &str, headers: &HeaderMap) -> Result<String, FetchError> {
        let response = self.fetch_with_retry(url, headers).await?;
        response.text().await.map_err(|source| FetchError::Decode {
            url: url.to_string(),
            source,
        })
    }
}

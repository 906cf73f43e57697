//! Page fetching.
//!
//! [`Fetcher`] is the seam between the pipeline and the network: listing
//! pages and article pages both go through it. The production implementation
//! is [`ReqwestFetcher`]; tests substitute an in-memory map.

use crate::config::FetchSettings;
use crate::error::FetchError;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};
use url::Url;

/// Retrieves a page and returns its body decoded as UTF-8.
///
/// Implementations do not retry. Any failure (network, timeout, non-success
/// status) is returned as a [`FetchError`] and callers treat it as "no
/// document" for that URL.
pub trait Fetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// [`Fetcher`] backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: Client,
}

impl ReqwestFetcher {
    /// Build a client with the configured timeouts and browser `User-Agent`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Http`] if the underlying client cannot be
    /// constructed (e.g. TLS backend initialization fails).
    pub fn new(settings: &FetchSettings) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
            .user_agent(&settings.user_agent)
            .build()?;
        Ok(Self { client })
    }
}

impl Fetcher for ReqwestFetcher {
    #[instrument(level = "debug", skip(self))]
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let t0 = Instant::now();
        let response = self
            .client
            .get(parsed)
            .header(
                reqwest::header::ACCEPT,
                "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8",
            )
            .send()
            .await
            .map_err(|e| classify(e, url))?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), %url, "Non-success status");
            return Err(FetchError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        // Decode as UTF-8 regardless of the declared charset; Bengali pages
        // are frequently mislabelled.
        let bytes = response.bytes().await.map_err(|e| classify(e, url))?;
        let body = String::from_utf8_lossy(&bytes).into_owned();

        debug!(
            bytes = body.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Fetched page"
        );
        Ok(body)
    }
}

fn classify(e: reqwest::Error, url: &str) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else {
        FetchError::Http(e)
    }
}

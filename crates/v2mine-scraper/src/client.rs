//! HTTP fetching with timeout, polite delays and linear-backoff retries.

use crate::error::{Result, ScrapeError};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;
use v2mine_core::ScrapeConfig;

/// Sequential page fetcher. Waits between consecutive requests and retries
/// transient failures.
pub struct PageClient {
    http: reqwest::Client,
    delay: Duration,
    max_retries: u32,
    retry_delay: Duration,
    requests_made: u64,
}

impl PageClient {
    /// Build a client from the scrape settings.
    pub fn new(config: &ScrapeConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.request_timeout())
            .build()
            .map_err(ScrapeError::Client)?;

        Ok(Self {
            http,
            delay: config.delay_between_requests(),
            max_retries: config.max_retries,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
            requests_made: 0,
        })
    }

    /// Number of HTTP requests sent so far, retries included.
    #[must_use]
    pub fn requests_made(&self) -> u64 {
        self.requests_made
    }

    /// Fetch `url` as text, retrying transient failures up to `max_retries`
    /// times with a delay of `retry_delay * attempt`.
    pub async fn fetch(&mut self, url: &Url, cancel: &CancellationToken) -> Result<String> {
        let attempts = self.max_retries + 1;
        let mut attempt = 1;

        loop {
            match self.fetch_once(url, cancel).await {
                Ok(body) => return Ok(body),
                Err(e) if attempt < attempts && e.is_transient() => {
                    let delay = self.retry_delay * attempt;
                    tracing::warn!(
                        url = %url,
                        error = %e,
                        "Fetch failed (attempt {}/{}), retrying in {:?}",
                        attempt,
                        attempts,
                        delay
                    );
                    pause(delay, cancel).await?;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn fetch_once(&mut self, url: &Url, cancel: &CancellationToken) -> Result<String> {
        if self.requests_made > 0 {
            pause(self.delay, cancel).await?;
        }
        self.requests_made += 1;
        tracing::debug!(url = %url, "GET");

        let request = async {
            let response = self
                .http
                .get(url.clone())
                .send()
                .await
                .map_err(|source| ScrapeError::Request {
                    url: url.to_string(),
                    source,
                })?;

            let status = response.status();
            if !status.is_success() {
                return Err(ScrapeError::Status {
                    url: url.to_string(),
                    status: status.as_u16(),
                });
            }

            response.text().await.map_err(|source| ScrapeError::Request {
                url: url.to_string(),
                source,
            })
        };

        tokio::select! {
            () = cancel.cancelled() => Err(ScrapeError::Cancelled),
            result = request => result,
        }
    }
}

async fn pause(delay: Duration, cancel: &CancellationToken) -> Result<()> {
    if delay.is_zero() {
        return Ok(());
    }
    tokio::select! {
        () = cancel.cancelled() => Err(ScrapeError::Cancelled),
        () = tokio::time::sleep(delay) => Ok(()),
    }
}

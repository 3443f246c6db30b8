//! Plain-request fetch strategy: a reused HTTP session with rotating headers and a
//! bounded retry loop against blocks, rate limits and broken responses.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use tracing::{info, warn};
use url::Url;

use super::retry::{classify_status, is_html_content_type, AttemptOutcome, RetryPolicy};
use super::rotation::UserAgentRotation;
use crate::error::{FetchError, FetchResult, RetryReason};
use crate::models::ScraperKind;
use crate::normalizer::{self, PageContent};
use crate::pacing::{pause, Pacing};
use crate::traits::PageFetcher;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);
const HOMEPAGE_TIMEOUT: Duration = Duration::from_secs(15);

/// Plain HTTP fetcher holding one session for the whole sweep
pub struct HttpFetcher {
    client: Client,
    rotation: UserAgentRotation,
    policy: RetryPolicy,
    /// Sent as `Referer` on search requests
    referer: Option<String>,
}

impl HttpFetcher {
    /// Create a fetcher with the default user-agent pool and retry table
    pub fn new() -> anyhow::Result<Self> {
        Self::with_policy(UserAgentRotation::default(), RetryPolicy::default())
    }

    pub fn with_policy(rotation: UserAgentRotation, policy: RetryPolicy) -> anyhow::Result<Self> {
        let client = Client::builder()
            .cookie_store(true)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            rotation,
            policy,
            referer: None,
        })
    }

    /// One GET request, classified into an explicit outcome
    async fn attempt(&self, url: &Url) -> AttemptOutcome {
        let referer = if url.path().contains("search") {
            self.referer.as_deref()
        } else {
            None
        };

        let response = match self
            .client
            .get(url.clone())
            .headers(self.rotation.headers(referer))
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) if e.is_builder() => {
                return AttemptOutcome::Fatal(FetchError::Request(e.to_string()));
            }
            Err(e) => return AttemptOutcome::Retryable(RetryReason::Transport(e.to_string())),
        };

        let status = response.status();
        if !status.is_success() {
            return AttemptOutcome::Retryable(classify_status(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);

        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => return AttemptOutcome::Retryable(RetryReason::Transport(e.to_string())),
        };

        info!(
            "Response status: {}, Content-Type: {}, size: {} bytes",
            status,
            content_type.as_deref().unwrap_or("Unknown"),
            bytes.len()
        );

        if !is_html_content_type(content_type.as_deref()) {
            return AttemptOutcome::Retryable(RetryReason::NotHtml(
                content_type.unwrap_or_else(|| "no content type".to_string()),
            ));
        }

        match normalizer::normalize_response(&bytes, content_type.as_deref()) {
            Ok(content) => AttemptOutcome::Success(content),
            Err(rejection) => AttemptOutcome::Retryable(rejection.into()),
        }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    fn kind(&self) -> ScraperKind {
        ScraperKind::Http
    }

    async fn fetch(&mut self, url: &str) -> FetchResult<PageContent> {
        let parsed = Url::parse(url).map_err(|source| FetchError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;

        let mut attempt = 1;
        loop {
            if attempt > 1 {
                self.rotation.rotate();
                info!("Retry {} with new user agent", attempt);
            }

            let reason = match self.attempt(&parsed).await {
                AttemptOutcome::Success(content) => return Ok(content),
                AttemptOutcome::Fatal(error) => return Err(error),
                AttemptOutcome::Retryable(reason) => reason,
            };

            warn!("Attempt {} for {} failed: {}", attempt, url, reason);
            if self.policy.is_final(attempt) {
                warn!("Failed to get content after {} attempts", attempt);
                return Err(FetchError::Exhausted {
                    attempts: attempt,
                    reason,
                });
            }

            let wait = pause(self.policy.backoff(&reason, attempt)).await;
            if !wait.is_zero() {
                info!("Waited {:.1} seconds before retry", wait.as_secs_f64());
            }
            attempt += 1;
        }
    }

    async fn warm_up(&mut self, base_url: &str, pacing: &Pacing) -> bool {
        info!("Visiting homepage first...");
        self.referer = Some(base_url.to_string());

        let response = self
            .client
            .get(base_url)
            .headers(self.rotation.headers(None))
            .timeout(HOMEPAGE_TIMEOUT)
            .send()
            .await;

        match response {
            Ok(response) if response.status() == StatusCode::OK => {
                info!("Homepage visit successful");
                pause(pacing.after_homepage).await;
                true
            }
            Ok(response) => {
                warn!("Homepage visit returned {}", response.status());
                false
            }
            Err(e) => {
                warn!("Homepage visit failed: {}", e);
                false
            }
        }
    }
}

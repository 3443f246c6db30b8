//! Per-attempt outcomes and the backoff table of the plain-request retry loop

use std::time::Duration;

use crate::error::{FetchError, RetryReason};
use crate::normalizer::PageContent;
use crate::pacing::DelayRange;

/// Result of one request attempt
#[derive(Debug)]
pub enum AttemptOutcome {
    Success(PageContent),
    Retryable(RetryReason),
    Fatal(FetchError),
}

/// Attempt ceiling and randomized backoff per failure kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, the successful one included
    pub max_attempts: u32,
    pub forbidden: DelayRange,
    pub rate_limited: DelayRange,
    pub anti_bot: DelayRange,
    /// Multiplied by the attempt number
    pub transport: DelayRange,
    /// Content-type mismatches and garbled bodies
    pub short: DelayRange,
}

impl RetryPolicy {
    /// Same ceiling, no waiting between attempts
    pub const fn immediate() -> Self {
        Self {
            max_attempts: 3,
            forbidden: DelayRange::ZERO,
            rate_limited: DelayRange::ZERO,
            anti_bot: DelayRange::ZERO,
            transport: DelayRange::ZERO,
            short: DelayRange::ZERO,
        }
    }

    /// Delay bounds to wait after `attempt` (1-based) failed for `reason`
    pub fn backoff(&self, reason: &RetryReason, attempt: u32) -> DelayRange {
        match reason {
            RetryReason::Forbidden => self.forbidden,
            RetryReason::RateLimited => self.rate_limited,
            RetryReason::AntiBot(_) => self.anti_bot,
            RetryReason::HttpStatus(_) | RetryReason::Transport(_) => {
                self.transport.scaled(attempt.max(1))
            }
            RetryReason::NotHtml(_) | RetryReason::Garbled => self.short,
        }
    }

    pub fn is_final(&self, attempt: u32) -> bool {
        attempt >= self.max_attempts
    }

    pub fn sample_backoff(&self, reason: &RetryReason, attempt: u32) -> Duration {
        self.backoff(reason, attempt).sample()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            forbidden: DelayRange::secs(10, 20),
            rate_limited: DelayRange::secs(30, 60),
            anti_bot: DelayRange::secs(20, 40),
            transport: DelayRange::secs(5, 15),
            short: DelayRange::secs(2, 5),
        }
    }
}

/// Map a non-success HTTP status to the reason it is retried for
pub fn classify_status(status: u16) -> RetryReason {
    match status {
        403 => RetryReason::Forbidden,
        429 => RetryReason::RateLimited,
        other => RetryReason::HttpStatus(other),
    }
}

/// Whether a Content-Type header announces an HTML document
pub fn is_html_content_type(content_type: Option<&str>) -> bool {
    content_type.is_some_and(|ct| ct.to_ascii_lowercase().contains("html"))
}

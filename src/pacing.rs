//! Randomized pacing delays that approximate human browsing cadence

use std::time::Duration;

use rand::Rng;
use tracing::debug;

/// Inclusive bounds for a randomized delay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayRange {
    pub min: Duration,
    pub max: Duration,
}

impl DelayRange {
    pub const ZERO: Self = Self::millis(0, 0);

    pub const fn secs(min: u64, max: u64) -> Self {
        Self {
            min: Duration::from_secs(min),
            max: Duration::from_secs(max),
        }
    }

    pub const fn millis(min: u64, max: u64) -> Self {
        Self {
            min: Duration::from_millis(min),
            max: Duration::from_millis(max),
        }
    }

    /// Both bounds multiplied by `factor`, used for attempt-scaled backoff
    pub fn scaled(self, factor: u32) -> Self {
        Self {
            min: self.min * factor,
            max: self.max * factor,
        }
    }

    pub fn sample(&self) -> Duration {
        if self.max <= self.min {
            return self.min;
        }
        rand::thread_rng().gen_range(self.min..=self.max)
    }
}

/// Sleep for a random duration within `range` and return how long was slept.
pub async fn pause(range: DelayRange) -> Duration {
    let delay = range.sample();
    if !delay.is_zero() {
        debug!("Pausing for {:.1} seconds", delay.as_secs_f64());
        tokio::time::sleep(delay).await;
    }
    delay
}

/// Pacing between the steps of a category sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    /// Between two result pages of one category
    pub between_pages: DelayRange,
    /// Between two categories, skipped after the last one
    pub between_categories: DelayRange,
    /// After the homepage visit that opens a session
    pub after_homepage: DelayRange,
}

impl Pacing {
    /// No waiting at all
    pub const fn none() -> Self {
        Self {
            between_pages: DelayRange::ZERO,
            between_categories: DelayRange::ZERO,
            after_homepage: DelayRange::ZERO,
        }
    }
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            between_pages: DelayRange::secs(2, 5),
            between_categories: DelayRange::secs(10, 20),
            after_homepage: DelayRange::secs(2, 5),
        }
    }
}

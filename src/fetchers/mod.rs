//! Fetch strategies behind the [`PageFetcher`](crate::traits::PageFetcher) trait

pub mod browser;
pub mod http;
pub mod retry;
pub mod rotation;

pub use browser::{BrowserFetcher, BrowserSettings};
pub use http::HttpFetcher;
pub use retry::{AttemptOutcome, RetryPolicy};
pub use rotation::UserAgentRotation;

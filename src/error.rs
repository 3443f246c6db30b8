use thiserror::Error;

/// Why a single fetch attempt did not produce usable content.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RetryReason {
    #[error("403 Forbidden, likely blocked")]
    Forbidden,

    #[error("429 Rate limited")]
    RateLimited,

    #[error("HTTP status {0}")]
    HttpStatus(u16),

    #[error("expected HTML but got {0}")]
    NotHtml(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("anti-bot page detected: {0}")]
    AntiBot(String),

    #[error("garbled content that no fallback encoding could recover")]
    Garbled,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("failed to get content after {attempts} attempts: {reason}")]
    Exhausted { attempts: u32, reason: RetryReason },

    #[error("request could not be built: {0}")]
    Request(String),

    #[error("page rejected: {0}")]
    Rejected(RetryReason),

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("browser unavailable: {0}")]
    Environment(String),

    #[error("CDP error: {0}")]
    Cdp(#[from] chromiumoxide::error::CdpError),
}

impl FetchError {
    /// Environment failures abandon a whole strategy instead of a single page.
    pub fn is_environment(&self) -> bool {
        matches!(self, Self::Environment(_))
    }
}

pub type FetchResult<T> = std::result::Result<T, FetchError>;

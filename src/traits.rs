//! Traits and configuration shared by the fetch strategies and the category sweep

use async_trait::async_trait;

use crate::error::FetchResult;
use crate::models::ScraperKind;
use crate::normalizer::PageContent;
use crate::pacing::{DelayRange, Pacing};

/// How the sweep moves from one result page to the next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pagination {
    /// Build each page URL from the search pattern's `{page}` placeholder
    PageParameter,
    /// Follow the page's "next" control, stop when there is none
    FollowNextLink,
}

/// Configuration for a category sweep over one site
#[derive(Debug, Clone)]
pub struct ScraperConfig {
    /// Display name for the website
    pub name: String,
    /// Base URL that relative links and images resolve against
    pub base_url: String,
    /// Search URL pattern with `{query}` and `{page}` placeholders
    pub search_url_pattern: String,
    /// Search terms, one per category
    pub search_terms: Vec<String>,
    /// Currency code stamped on every record
    pub currency: String,
    pub pagination: Pagination,
    /// Hard cap on result pages per category
    pub max_pages: u32,
    /// Optional cap on records per category
    pub max_products_per_category: Option<usize>,
    pub pacing: Pacing,
}

pub const CASTORAMA_BASE_URL: &str = "https://www.castorama.fr";

/// Category search terms (tiles, sinks, toilets, paint, vanities, showers)
pub const CASTORAMA_SEARCH_TERMS: &[&str] = &[
    "carrelage",
    "evier",
    "toilettes",
    "peinture",
    "meuble vasque",
    "douche",
];

impl ScraperConfig {
    /// Castorama over plain HTTP: numbered result pages, up to 10 pages and 100 records
    /// per category
    pub fn castorama_http() -> Self {
        Self {
            name: "Castorama".to_string(),
            base_url: CASTORAMA_BASE_URL.to_string(),
            search_url_pattern: format!("{CASTORAMA_BASE_URL}/search?term={{query}}&page={{page}}"),
            search_terms: CASTORAMA_SEARCH_TERMS.iter().map(ToString::to_string).collect(),
            currency: "EUR".to_string(),
            pagination: Pagination::PageParameter,
            max_pages: 10,
            max_products_per_category: Some(100),
            pacing: Pacing::default(),
        }
    }

    /// Castorama through a headless browser: follows the "next" control for up to 3 pages
    pub fn castorama_browser() -> Self {
        Self {
            pagination: Pagination::FollowNextLink,
            max_pages: 3,
            max_products_per_category: None,
            pacing: Pacing {
                between_pages: DelayRange::secs(3, 6),
                between_categories: DelayRange::secs(15, 30),
                after_homepage: DelayRange::secs(3, 7),
            },
            ..Self::castorama_http()
        }
    }

    /// Search URL for a term and 1-based page number
    pub fn build_search_url(&self, search_term: &str, page: u32) -> String {
        let encoded_term = urlencoding::encode(search_term);
        self.search_url_pattern
            .replace("{query}", &encoded_term)
            .replace("{page}", &page.to_string())
    }
}

/// A strategy that retrieves rendered page content for a URL
#[async_trait]
pub trait PageFetcher: Send {
    /// Which strategy this is
    fn kind(&self) -> ScraperKind;

    /// Fetch and normalize one page
    ///
    /// # Returns
    /// * `FetchResult<PageContent>` - Normalized content, or why none could be obtained
    async fn fetch(&mut self, url: &str) -> FetchResult<PageContent>;

    /// Establish a session before the first search request
    ///
    /// # Arguments
    /// * `base_url` - Homepage of the site
    /// * `pacing` - Pacing of the sweep that is about to start
    ///
    /// # Returns
    /// * `bool` - Whether the warm-up succeeded; failure is not fatal
    async fn warm_up(&mut self, _base_url: &str, _pacing: &Pacing) -> bool {
        true
    }
}

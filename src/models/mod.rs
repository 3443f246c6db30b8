//! Data models for scraped product listings and the JSON report written at the end of a run

use serde::{Deserialize, Serialize};

/// A product listing scraped from a category search page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub name: String,
    /// Search term the listing was found under
    pub category: String,
    pub price: f64,
    pub currency: String,
    pub product_url: String,
    pub brand: String,
    pub unit: String,
    pub image_url: String,
}

/// Which fetch strategy produced a set of records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScraperKind {
    Http,
    Browser,
}

impl ScraperKind {
    /// Tag written to the report's `scraper_type` field. Plain HTTP runs carry no tag.
    pub fn report_tag(self) -> Option<&'static str> {
        match self {
            Self::Http => None,
            Self::Browser => Some("browser"),
        }
    }

    /// Default output file name for this strategy
    pub fn output_file_name(self) -> &'static str {
        match self {
            Self::Http => "products.json",
            Self::Browser => "products_browser.json",
        }
    }
}

impl std::fmt::Display for ScraperKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http => f.write_str("http"),
            Self::Browser => f.write_str("browser"),
        }
    }
}

/// Output document persisted after a sweep
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeReport {
    /// Local time, `YYYY-MM-DD HH:MM:SS`
    pub scrape_timestamp: String,
    pub total_products: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scraper_type: Option<String>,
    pub products: Vec<ProductRecord>,
}

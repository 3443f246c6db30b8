//! Category-search product scraper for Castorama France.
//!
//! Pages are fetched through a [`traits::PageFetcher`] (plain HTTP with retries, or a
//! headless browser), normalized, and turned into [`models::ProductRecord`]s by the
//! [`extractor`]. [`CategoryScraper`](crate::scraper::CategoryScraper) drives the
//! pagination over every search term.

pub mod error;
pub mod extractor;
pub mod fetchers;
pub mod material_finder;
pub mod models;
pub mod normalizer;
pub mod output;
pub mod pacing;
pub mod scraper;
pub mod traits;

//! Category sweep: walks the result pages of every search term through a [`PageFetcher`]
//! and collects the extracted products in order.

use scraper::{Html, Selector};
use tracing::{info, warn};
use url::Url;

use crate::extractor::ProductExtractor;
use crate::models::ProductRecord;
use crate::normalizer::PageContent;
use crate::pacing::pause;
use crate::traits::{PageFetcher, Pagination, ScraperConfig};

/// Selector for the "next page" control of a result page
const NEXT_PAGE_SELECTOR: &str = "a[rel='next'], a[aria-label*='next'], a[aria-label*='Next'], \
     a[aria-label*='suivant'], a[aria-label*='Suivant'], .next-page, .pagination-next";

/// Outcome of one result page
struct PageResult {
    products: Vec<ProductRecord>,
    next_url: Option<String>,
}

pub struct CategoryScraper {
    config: ScraperConfig,
    extractor: ProductExtractor,
    warmed_up: bool,
}

impl CategoryScraper {
    pub fn new(config: ScraperConfig) -> anyhow::Result<Self> {
        let extractor = ProductExtractor::new(&config.base_url, &config.currency)?;
        Ok(Self {
            config,
            extractor,
            warmed_up: false,
        })
    }

    /// Sweep every configured category in order.
    ///
    /// The fetcher is warmed up once per scraper, before the first search request. A
    /// category whose pages cannot be fetched contributes whatever was collected before
    /// the failure; the sweep itself never fails.
    pub async fn scrape_all<F>(&mut self, fetcher: &mut F) -> Vec<ProductRecord>
    where
        F: PageFetcher + ?Sized,
    {
        info!(
            "Scraping {} categories on {} with the {} fetcher",
            self.config.search_terms.len(),
            self.config.name,
            fetcher.kind()
        );

        if !self.warmed_up {
            self.warmed_up = true;
            if !fetcher.warm_up(&self.config.base_url, &self.config.pacing).await {
                warn!("Homepage visit failed, continuing with category search anyway");
            }
        }

        let terms = self.config.search_terms.clone();
        let mut all_products = Vec::new();
        for (index, term) in terms.iter().enumerate() {
            info!("=== Scraping category: {} ===", term);
            let products = self.scrape_category(fetcher, term).await;
            info!("Category {}: {} products", term, products.len());
            all_products.extend(products);

            if index + 1 < terms.len() {
                let waited = pause(self.config.pacing.between_categories).await;
                if !waited.is_zero() {
                    info!("Waited {:.1} seconds before next category", waited.as_secs_f64());
                }
            }
        }

        info!("Total products scraped: {}", all_products.len());
        all_products
    }

    /// Walk the result pages of one search term
    pub async fn scrape_category<F>(&self, fetcher: &mut F, term: &str) -> Vec<ProductRecord>
    where
        F: PageFetcher + ?Sized,
    {
        let limit = self.config.max_products_per_category;
        let mut products: Vec<ProductRecord> = Vec::new();
        let mut current_url = self.config.build_search_url(term, 1);
        let mut page_num = 1;

        loop {
            if page_num > self.config.max_pages {
                info!(
                    "Reached maximum page limit ({}) for category: {}",
                    self.config.max_pages, term
                );
                break;
            }

            info!("Fetching page {} for category: {}", page_num, term);
            let content = match fetcher.fetch(&current_url).await {
                Ok(content) => content,
                Err(e) => {
                    warn!("Failed to fetch page {} for {}: {}", page_num, term, e);
                    break;
                }
            };

            let remaining = limit.map(|limit| limit.saturating_sub(products.len()));
            let page = self.process_page(&content, &current_url, term, remaining);

            if page.products.is_empty() {
                info!("No products found on page {}, stopping", page_num);
                break;
            }
            info!("Found {} products on page {}", page.products.len(), page_num);
            products.extend(page.products);

            if limit.is_some_and(|limit| products.len() >= limit) {
                info!("Reached product limit for category: {}", term);
                break;
            }

            let next_url = match self.config.pagination {
                Pagination::PageParameter => Some(self.config.build_search_url(term, page_num + 1)),
                Pagination::FollowNextLink => page.next_url,
            };
            let Some(next_url) = next_url else {
                info!("No next page found for category: {}", term);
                break;
            };
            if next_url == current_url {
                info!("Next page URL is the same as current URL, stopping pagination for: {}", term);
                break;
            }

            current_url = next_url;
            page_num += 1;
            pause(self.config.pacing.between_pages).await;
        }

        products
    }

    /// Parse a page and extract its products. The document stays in this synchronous scope
    /// so it never lives across an await point.
    fn process_page(
        &self,
        content: &PageContent,
        page_url: &str,
        term: &str,
        limit: Option<usize>,
    ) -> PageResult {
        let document = content.document();
        let products = self.extractor.extract_page(&document, term, limit);
        let next_url = extract_next_page_url(document.html(), page_url);
        PageResult { products, next_url }
    }
}

/// First usable "next page" link, resolved against the page it was read from.
/// Placeholder links (`#...` or empty) are skipped.
fn extract_next_page_url(document: &Html, page_url: &str) -> Option<String> {
    let next_link_selector = Selector::parse(NEXT_PAGE_SELECTOR).ok()?;
    let href = document.select(&next_link_selector).find_map(|link| {
        let href = link.value().attr("href")?.trim();
        (!href.is_empty() && !href.starts_with('#')).then_some(href)
    })?;

    Url::parse(page_url).ok()?.join(href).ok().map(String::from)
}

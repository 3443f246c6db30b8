use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Result};
use tracing::{error, info, warn};

use crate::fetchers::{BrowserFetcher, BrowserSettings, HttpFetcher, RetryPolicy, UserAgentRotation};
use crate::models::{ProductRecord, ScrapeReport, ScraperKind};
use crate::scraper::CategoryScraper;
use crate::traits::ScraperConfig;

/// Which fetch strategies a run uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// Plain HTTP first, the browser only when HTTP finds nothing
    #[default]
    Auto,
    Http,
    Browser,
}

impl FromStr for Strategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "http" | "requests" => Ok(Self::Http),
            "browser" => Ok(Self::Browser),
            other => bail!("Unknown scraper strategy '{other}' (expected auto, http or browser)"),
        }
    }
}

/// Run settings: compiled-in site configuration plus environment overrides
#[derive(Debug, Clone)]
pub struct FinderSettings {
    pub strategy: Strategy,
    pub output_dir: PathBuf,
    pub http_config: ScraperConfig,
    pub browser_config: ScraperConfig,
    pub retry_policy: RetryPolicy,
    pub browser: BrowserSettings,
}

impl Default for FinderSettings {
    fn default() -> Self {
        Self {
            strategy: Strategy::Auto,
            output_dir: PathBuf::from("."),
            http_config: ScraperConfig::castorama_http(),
            browser_config: ScraperConfig::castorama_browser(),
            retry_policy: RetryPolicy::default(),
            browser: BrowserSettings::default(),
        }
    }
}

impl FinderSettings {
    /// Read `SCRAPER_STRATEGY`, `SCRAPER_OUTPUT_DIR`, `CHROME_PATH` and `BROWSER_HEADLESS`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut settings = Self::default();
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(strategy) = var("SCRAPER_STRATEGY") {
            settings.strategy = strategy.parse()?;
        }
        if let Some(dir) = var("SCRAPER_OUTPUT_DIR") {
            settings.output_dir = PathBuf::from(dir);
        }
        if let Some(path) = var("CHROME_PATH") {
            settings.browser.chrome_path = Some(PathBuf::from(path));
        }
        if let Some(headless) = var("BROWSER_HEADLESS") {
            settings.browser.headless = !matches!(
                headless.trim().to_ascii_lowercase().as_str(),
                "0" | "false" | "no" | "off"
            );
        }
        Ok(settings)
    }
}

/// Records of a successful run and the strategy that produced them
#[derive(Debug, Clone)]
pub struct Sweep {
    pub kind: ScraperKind,
    pub products: Vec<ProductRecord>,
}

impl Sweep {
    pub fn report(&self) -> ScrapeReport {
        ScrapeReport::new(self.products.clone(), self.kind)
    }
}

pub struct MaterialFinder {
    settings: FinderSettings,
}

impl MaterialFinder {
    pub fn new(settings: FinderSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &FinderSettings {
        &self.settings
    }

    /// Run the configured strategies. `None` means no strategy produced any product.
    pub async fn run(&self) -> Result<Option<Sweep>> {
        let try_http = matches!(self.settings.strategy, Strategy::Auto | Strategy::Http);
        let try_browser = matches!(self.settings.strategy, Strategy::Auto | Strategy::Browser);

        if try_http {
            info!("Starting Castorama scraper using plain HTTP...");
            let products = self.run_http().await?;
            if !products.is_empty() {
                return Ok(Some(Sweep {
                    kind: ScraperKind::Http,
                    products,
                }));
            }
            if try_browser {
                warn!("Plain HTTP found no products, falling back to the browser");
            }
        }

        if try_browser {
            info!("Starting Castorama scraper using a headless browser...");
            let products = self.run_browser().await;
            if !products.is_empty() {
                return Ok(Some(Sweep {
                    kind: ScraperKind::Browser,
                    products,
                }));
            }
        }

        Ok(None)
    }

    /// Save a sweep under the output directory, named after its strategy
    pub async fn save(&self, sweep: &Sweep) -> Result<PathBuf> {
        let path = self.settings.output_dir.join(sweep.kind.output_file_name());
        sweep.report().save_to_json(&path).await?;
        Ok(path)
    }

    async fn run_http(&self) -> Result<Vec<ProductRecord>> {
        let mut fetcher =
            HttpFetcher::with_policy(UserAgentRotation::default(), self.settings.retry_policy)?;
        let mut scraper = CategoryScraper::new(self.settings.http_config.clone())?;
        Ok(scraper.scrape_all(&mut fetcher).await)
    }

    /// Browser sweep. A browser that cannot be launched abandons the strategy with no
    /// results; once launched it is closed on every path.
    async fn run_browser(&self) -> Vec<ProductRecord> {
        let mut scraper = match CategoryScraper::new(self.settings.browser_config.clone()) {
            Ok(scraper) => scraper,
            Err(e) => {
                error!("Invalid browser configuration: {}", e);
                return Vec::new();
            }
        };

        let mut fetcher = match BrowserFetcher::launch(self.settings.browser.clone()).await {
            Ok(fetcher) => fetcher,
            Err(e) if e.is_environment() => {
                error!("Browser unavailable, abandoning browser strategy: {}", e);
                return Vec::new();
            }
            Err(e) => {
                error!("Browser scraping failed: {}", e);
                return Vec::new();
            }
        };

        let products = scraper.scrape_all(&mut fetcher).await;

        if let Err(e) = fetcher.close().await {
            warn!("Error while closing the browser: {}", e);
        }
        products
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn settings_from(vars: &[(&str, &str)]) -> Result<FinderSettings> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        FinderSettings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn strategy_parses_case_insensitively() {
        assert_eq!("AUTO".parse::<Strategy>().unwrap(), Strategy::Auto);
        assert_eq!(" http ".parse::<Strategy>().unwrap(), Strategy::Http);
        assert_eq!("Browser".parse::<Strategy>().unwrap(), Strategy::Browser);
        assert!("selenium".parse::<Strategy>().is_err());
    }

    #[test]
    fn defaults_without_environment() {
        let settings = settings_from(&[]).unwrap();
        assert_eq!(settings.strategy, Strategy::Auto);
        assert_eq!(settings.output_dir, PathBuf::from("."));
        assert!(settings.browser.headless);
        assert!(settings.browser.chrome_path.is_none());
        assert_eq!(settings.http_config.max_pages, 10);
        assert_eq!(settings.browser_config.max_pages, 3);
    }

    #[test]
    fn environment_overrides_apply() {
        let settings = settings_from(&[
            ("SCRAPER_STRATEGY", "browser"),
            ("SCRAPER_OUTPUT_DIR", "/tmp/out"),
            ("CHROME_PATH", "/usr/bin/chromium"),
            ("BROWSER_HEADLESS", "false"),
        ])
        .unwrap();
        assert_eq!(settings.strategy, Strategy::Browser);
        assert_eq!(settings.output_dir, PathBuf::from("/tmp/out"));
        assert_eq!(settings.browser.chrome_path, Some(PathBuf::from("/usr/bin/chromium")));
        assert!(!settings.browser.headless);
    }

    #[test]
    fn blank_values_are_ignored_and_bad_strategy_fails() {
        let settings = settings_from(&[("SCRAPER_STRATEGY", "  ")]).unwrap();
        assert_eq!(settings.strategy, Strategy::Auto);
        assert!(settings_from(&[("SCRAPER_STRATEGY", "curl")]).is_err());
    }

    #[tokio::test]
    async fn unavailable_browser_abandons_the_strategy() {
        let finder = MaterialFinder::new(FinderSettings {
            strategy: Strategy::Browser,
            browser: BrowserSettings {
                chrome_path: Some(PathBuf::from("/nonexistent/chromium")),
                ..BrowserSettings::default()
            },
            ..FinderSettings::default()
        });
        assert!(finder.run().await.unwrap().is_none());
    }

    #[test]
    fn output_file_follows_strategy() {
        let finder = MaterialFinder::new(FinderSettings {
            output_dir: PathBuf::from("out"),
            ..FinderSettings::default()
        });
        let sweep = Sweep {
            kind: ScraperKind::Browser,
            products: Vec::new(),
        };
        assert_eq!(
            finder.settings().output_dir.join(sweep.kind.output_file_name()),
            PathBuf::from("out/products_browser.json")
        );
        assert_eq!(sweep.report().scraper_type.as_deref(), Some("browser"));
    }
}

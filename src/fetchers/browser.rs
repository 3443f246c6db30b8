//! Browser-automation fetch strategy built on a headless Chromium instance.
//!
//! The browser is an exclusive external process. [`BrowserFetcher::launch`] acquires it
//! and [`BrowserFetcher::close`] releases it; `close` consumes the fetcher so it can only
//! run once. If a fetcher is dropped without being closed, the CDP handler task is
//! aborted and chromiumoxide kills the child process when its `Browser` drops.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::page::Page;
use futures::StreamExt;
use rand::Rng;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{FetchError, FetchResult};
use crate::models::ScraperKind;
use crate::normalizer::{self, PageContent};
use crate::pacing::{pause, DelayRange};
use crate::traits::PageFetcher;

pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Extra launch flags, passed with a `--` prefix
const LAUNCH_ARGS: &[&str] = &[
    "disable-dev-shm-usage",
    "disable-extensions",
    "disable-plugins",
    "disable-infobars",
    "no-first-run",
    "no-default-browser-check",
];

/// Hides the automation markers that sites probe first
const STEALTH_JS: &str = r"
Object.defineProperty(Navigator.prototype, 'webdriver', { get: () => undefined, configurable: true });
if (!window.chrome) { window.chrome = { runtime: {} }; }
Object.defineProperty(navigator, 'languages', { get: () => ['fr-FR', 'fr', 'en-US', 'en'] });
";

const SCROLL_HEIGHT_JS: &str = "document.body ? document.body.scrollHeight : 0";

/// Upper bound on scroll steps for pages that keep growing
const MAX_SCROLL_STEPS: u32 = 200;

#[derive(Debug, Clone)]
pub struct BrowserSettings {
    pub headless: bool,
    /// Chrome/Chromium binary; chromiumoxide searches the usual locations when unset
    pub chrome_path: Option<PathBuf>,
    pub user_agent: String,
    pub window_size: (u32, u32),
    pub navigation_timeout: Duration,
    pub before_navigation: DelayRange,
    pub after_navigation: DelayRange,
    pub scroll_pause: DelayRange,
    /// Pixel bounds of one scroll increment
    pub scroll_step: (u32, u32),
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            chrome_path: None,
            user_agent: BROWSER_USER_AGENT.to_string(),
            window_size: (1920, 1080),
            navigation_timeout: Duration::from_secs(30),
            before_navigation: DelayRange::millis(500, 1500),
            after_navigation: DelayRange::secs(3, 5),
            scroll_pause: DelayRange::millis(500, 1500),
            scroll_step: (300, 600),
        }
    }
}

impl BrowserSettings {
    fn launch_config(&self) -> FetchResult<BrowserConfig> {
        let (width, height) = self.window_size;
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .window_size(width, height)
            .arg(format!("--user-agent={}", self.user_agent))
            .arg("--disable-blink-features=AutomationControlled");

        if !self.headless {
            builder = builder.with_head();
        }
        for arg in LAUNCH_ARGS {
            builder = builder.arg(format!("--{arg}"));
        }
        if let Some(path) = &self.chrome_path {
            builder = builder.chrome_executable(path);
        }

        builder.build().map_err(FetchError::Environment)
    }

    fn scroll_increment(&self) -> u64 {
        let (min, max) = self.scroll_step;
        if max <= min {
            return u64::from(min.max(1));
        }
        u64::from(rand::thread_rng().gen_range(min..=max))
    }
}

/// Headless browser fetcher reusing one tab for every navigation
pub struct BrowserFetcher {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    settings: BrowserSettings,
    closed: bool,
}

impl BrowserFetcher {
    /// Acquire a browser instance. Any failure here is an environment failure.
    pub async fn launch(settings: BrowserSettings) -> FetchResult<Self> {
        let config = settings.launch_config()?;

        let (mut browser, mut handler) = Browser::launch(config).await.map_err(|e| {
            FetchError::Environment(format!(
                "failed to launch Chrome ({e}); make sure Chrome or Chromium is installed"
            ))
        })?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("CDP handler error: {}", e);
                }
            }
        });

        let page = match Self::open_page(&browser).await {
            Ok(page) => page,
            Err(e) => {
                let _ = browser.close().await;
                handler_task.abort();
                return Err(FetchError::Environment(e.to_string()));
            }
        };

        info!("Chrome browser setup successful");
        Ok(Self {
            browser,
            page,
            handler: handler_task,
            settings,
            closed: false,
        })
    }

    async fn open_page(browser: &Browser) -> FetchResult<Page> {
        let page = browser.new_page("about:blank").await?;
        page.execute(AddScriptToEvaluateOnNewDocumentParams::new(STEALTH_JS))
            .await?;
        Ok(page)
    }

    /// Release the browser process
    pub async fn close(mut self) -> FetchResult<()> {
        self.closed = true;
        let closed = self.browser.close().await;
        if let Err(e) = self.browser.wait().await {
            warn!("Waiting for Chrome to exit failed: {}", e);
        }
        if tokio::time::timeout(Duration::from_secs(5), &mut self.handler)
            .await
            .is_err()
        {
            self.handler.abort();
        }
        info!("Browser closed");
        closed.map(|_| ()).map_err(FetchError::from)
    }

    async fn scroll_height(&self) -> FetchResult<u64> {
        let height: f64 = self
            .page
            .evaluate(SCROLL_HEIGHT_JS)
            .await?
            .into_value()
            .unwrap_or(0.0);
        Ok(height.max(0.0) as u64)
    }

    /// Scroll down in graduated increments, re-reading the page height after each step
    /// so that lazily loaded products are rendered before the source is read.
    async fn human_like_scroll(&self) -> FetchResult<()> {
        let increment = self.settings.scroll_increment();
        let mut total_height = self.scroll_height().await?;
        let mut position = 0u64;
        let mut steps = 0;

        while position < total_height && steps < MAX_SCROLL_STEPS {
            self.page
                .evaluate(format!("window.scrollTo(0, {position});"))
                .await?;
            pause(self.settings.scroll_pause).await;
            position += increment;
            total_height = self.scroll_height().await?;
            steps += 1;
        }

        debug!("Scrolled {} steps over {} px", steps, total_height);
        Ok(())
    }
}

#[async_trait]
impl PageFetcher for BrowserFetcher {
    fn kind(&self) -> ScraperKind {
        ScraperKind::Browser
    }

    async fn fetch(&mut self, url: &str) -> FetchResult<PageContent> {
        Url::parse(url).map_err(|source| FetchError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;

        pause(self.settings.before_navigation).await;
        info!("Navigating to {}", url);

        match tokio::time::timeout(self.settings.navigation_timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => return Err(FetchError::Navigation(e.to_string())),
            Err(_) => return Err(FetchError::Navigation(format!("timed out loading {url}"))),
        }

        match tokio::time::timeout(Duration::from_secs(10), self.page.find_element("body")).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => return Err(FetchError::Navigation(format!("page has no body: {e}"))),
            Err(_) => return Err(FetchError::Navigation("page load timeout".to_string())),
        }

        self.human_like_scroll().await?;
        let html = self.page.content().await?;
        pause(self.settings.after_navigation).await;

        normalizer::normalize_rendered(html).map_err(|rejection| FetchError::Rejected(rejection.into()))
    }
}

impl Drop for BrowserFetcher {
    fn drop(&mut self) {
        if !self.closed {
            warn!("Browser fetcher dropped without close; aborting CDP handler");
            self.handler.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_are_headless_and_paced() {
        let settings = BrowserSettings::default();
        assert!(settings.headless);
        assert_eq!(settings.window_size, (1920, 1080));
        assert_eq!(settings.after_navigation, DelayRange::secs(3, 5));
    }

    #[test]
    fn scroll_increment_stays_within_step_bounds() {
        let settings = BrowserSettings::default();
        for _ in 0..100 {
            let step = settings.scroll_increment();
            assert!((300..=600).contains(&step));
        }
        let fixed = BrowserSettings {
            scroll_step: (0, 0),
            ..BrowserSettings::default()
        };
        assert_eq!(fixed.scroll_increment(), 1);
    }

    #[tokio::test]
    async fn missing_chrome_binary_is_an_environment_failure() {
        let settings = BrowserSettings {
            chrome_path: Some(PathBuf::from("/nonexistent/chromium")),
            ..BrowserSettings::default()
        };
        let err = BrowserFetcher::launch(settings).await.err().unwrap();
        assert!(err.is_environment());
        assert!(!FetchError::Navigation("timeout".to_string()).is_environment());
    }
}

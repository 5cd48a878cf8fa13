use std::sync::Arc;

use lumascrape::browser::{BrowserPool, BrowserPoolConfig, fetcher_for};
use lumascrape::{EventScraper, FetchMode, PageFetcher, ScraperConfig};

/// One lazily-populated pool per window mode so the per-request
/// `headless` flag is honored.
#[derive(Debug, Clone)]
pub struct BrowserPools {
    headless: Arc<BrowserPool>,
    headed: Arc<BrowserPool>,
}

impl BrowserPools {
    pub fn new(max_browsers: usize, config: &ScraperConfig) -> Self {
        let pool = |headless| {
            BrowserPool::new(BrowserPoolConfig {
                max_browsers,
                headless,
                request_timeout: config.request_timeout,
            })
        };
        Self {
            headless: pool(true),
            headed: pool(false),
        }
    }

    pub fn select(&self, headless: bool) -> &Arc<BrowserPool> {
        if headless { &self.headless } else { &self.headed }
    }

    pub async fn shutdown(&self) {
        self.headless.shutdown().await;
        self.headed.shutdown().await;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    pub headless: bool,
    pub use_selenium: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            headless: true,
            use_selenium: true,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    config: ScraperConfig,
    http: Arc<dyn PageFetcher>,
    browsers: Option<BrowserPools>,
}

impl AppState {
    pub fn new(
        config: ScraperConfig,
        http: Arc<dyn PageFetcher>,
        browsers: Option<BrowserPools>,
    ) -> Self {
        Self {
            config,
            http,
            browsers,
        }
    }

    /// Builds the scraper for one request. In browser mode it holds a pooled
    /// browser until dropped.
    pub async fn scraper(&self, opts: FetchOptions) -> EventScraper {
        let mode = FetchMode::from_flag(opts.use_selenium);
        let pool = self.browsers.as_ref().map(|b| b.select(opts.headless));
        let fetcher = fetcher_for(mode, pool, Arc::clone(&self.http), &self.config).await;
        EventScraper::new(fetcher, self.config.clone())
    }
}

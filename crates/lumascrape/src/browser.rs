//! Pooled Chrome sessions for pages that render their content client-side.
//!
//! A [`BrowserPool`] is owned by the process entry point and shared by
//! reference. Each request checks out one browser through a [`BrowserLease`],
//! which holds it exclusively and returns it to the pool when dropped.

use std::path::PathBuf;
use std::process::Command;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig, HeadlessMode};
use futures::StreamExt;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;

use crate::config::ScraperConfig;
use crate::fetcher::{CHROME_USER_AGENT, FetchError, FetchMode, PageFetcher};

#[derive(Debug, Clone)]
pub struct BrowserPoolConfig {
    /// Upper bound on browsers alive at once (idle + leased).
    pub max_browsers: usize,
    pub headless: bool,
    /// CDP request timeout handed to chromiumoxide.
    pub request_timeout: Duration,
}

impl Default for BrowserPoolConfig {
    fn default() -> Self {
        Self {
            max_browsers: 2,
            headless: true,
            request_timeout: Duration::from_secs(30),
        }
    }
}

struct PooledBrowser {
    id: u64,
    browser: Browser,
    handler: JoinHandle<()>,
    user_data_dir: PathBuf,
}

impl PooledBrowser {
    async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            log::warn!("Failed to close browser {}: {}", self.id, e);
        }
        let _ = self.browser.wait().await;
    }
}

impl Drop for PooledBrowser {
    fn drop(&mut self) {
        self.handler.abort();
        if let Err(e) = std::fs::remove_dir_all(&self.user_data_dir) {
            log::debug!(
                "Could not remove browser profile {}: {}",
                self.user_data_dir.display(),
                e
            );
        }
    }
}

pub struct BrowserPool {
    config: BrowserPoolConfig,
    idle: Mutex<Vec<PooledBrowser>>,
    permits: Arc<Semaphore>,
    next_id: AtomicU64,
}

impl std::fmt::Debug for BrowserPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrowserPool")
            .field("config", &self.config)
            .field("available_permits", &self.permits.available_permits())
            .finish()
    }
}

impl BrowserPool {
    /// Creates an empty pool. Browsers are launched lazily on first demand.
    pub fn new(config: BrowserPoolConfig) -> Arc<Self> {
        let permits = Arc::new(Semaphore::new(config.max_browsers.max(1)));
        Arc::new(Self {
            config,
            idle: Mutex::new(Vec::new()),
            permits,
            next_id: AtomicU64::new(0),
        })
    }

    pub fn headless(&self) -> bool {
        self.config.headless
    }

    /// Waits for a free slot and returns a browser owned exclusively by the
    /// caller until the lease is dropped.
    pub async fn acquire(self: &Arc<Self>) -> Result<BrowserLease, FetchError> {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| FetchError::Browser("browser pool is shut down".into()))?;

        let reused = self
            .idle
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop();

        let browser = match reused {
            Some(browser) => {
                log::debug!("Reusing pooled browser {}", browser.id);
                browser
            }
            None => self.launch().await?,
        };

        Ok(BrowserLease {
            browser: Some(browser),
            pool: Arc::clone(self),
            discard: AtomicBool::new(false),
            _permit: permit,
        })
    }

    /// Closes idle browsers and refuses further leases. Leased browsers are
    /// killed when their lease drops.
    pub async fn shutdown(&self) {
        log::info!("Shutting down browser pool");
        self.permits.close();

        let idle = std::mem::take(&mut *self.idle.lock().unwrap_or_else(|e| e.into_inner()));
        for browser in idle {
            browser.close().await;
        }
    }

    async fn launch(&self) -> Result<PooledBrowser, FetchError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let chrome_path = find_browser_executable()?;
        let user_data_dir = std::env::temp_dir().join(format!(
            "lumascrape_chrome_{}_{}",
            std::process::id(),
            id
        ));
        std::fs::create_dir_all(&user_data_dir)
            .map_err(|e| FetchError::Browser(format!("failed to create profile dir: {e}")))?;

        let mut builder = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .request_timeout(self.config.request_timeout)
            .window_size(1920, 1080)
            .user_data_dir(user_data_dir.clone());

        builder = if self.config.headless {
            builder.headless_mode(HeadlessMode::True)
        } else {
            builder.with_head()
        };

        let config = builder
            .arg(format!("--user-agent={}", CHROME_USER_AGENT))
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .build()
            .map_err(|e| FetchError::Browser(format!("invalid browser config: {e}")))?;

        log::info!(
            "Launching browser {} (headless: {})",
            id,
            self.config.headless
        );
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| FetchError::Browser(format!("failed to launch browser: {e}")))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    log::trace!("Browser handler error: {}", e);
                }
            }
        });

        Ok(PooledBrowser {
            id,
            browser,
            handler,
            user_data_dir,
        })
    }
}

/// Exclusive checkout of one pooled browser.
pub struct BrowserLease {
    browser: Option<PooledBrowser>,
    pool: Arc<BrowserPool>,
    discard: AtomicBool,
    _permit: OwnedSemaphorePermit,
}

impl BrowserLease {
    pub fn browser(&self) -> Option<&Browser> {
        self.browser.as_ref().map(|b| &b.browser)
    }

    /// Marks the browser as broken so it is killed instead of returned.
    pub fn discard(&self) {
        self.discard.store(true, Ordering::Relaxed);
    }
}

impl Drop for BrowserLease {
    fn drop(&mut self) {
        let Some(browser) = self.browser.take() else {
            return;
        };
        if self.discard.load(Ordering::Relaxed) || self.pool.permits.is_closed() {
            log::debug!("Dropping browser {}", browser.id);
            return;
        }
        log::debug!("Returning browser {} to pool", browser.id);
        self.pool
            .idle
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(browser);
    }
}

/// Loads pages through one leased browser, waiting a fixed interval after
/// the DOM is ready so client-side content can render. The browser goes
/// back to the pool when the fetcher is dropped.
pub struct BrowserFetcher {
    lease: BrowserLease,
    render_wait: Duration,
    page_timeout: Duration,
}

impl std::fmt::Debug for BrowserFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrowserFetcher")
            .field("browser", &self.lease.browser.as_ref().map(|b| b.id))
            .field("render_wait", &self.render_wait)
            .field("page_timeout", &self.page_timeout)
            .finish()
    }
}

impl BrowserFetcher {
    pub fn new(lease: BrowserLease, render_wait: Duration, page_timeout: Duration) -> Self {
        Self {
            lease,
            render_wait,
            page_timeout,
        }
    }
}

#[async_trait]
impl PageFetcher for BrowserFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let Some(browser) = self.lease.browser() else {
            return Err(FetchError::Browser("lease holds no browser".into()));
        };
        log::debug!("Browser GET {}", url);

        let loaded =
            tokio::time::timeout(self.page_timeout, load_page(browser, url, self.render_wait))
                .await;

        match loaded {
            Ok(Ok(html)) => Ok(html),
            Ok(Err(e)) => {
                log::error!("Browser error for {url}: {e}");
                self.lease.discard();
                Err(e)
            }
            Err(_) => {
                log::warn!("Timeout loading page: {url}");
                self.lease.discard();
                Err(FetchError::Timeout(url.to_string()))
            }
        }
    }
}

/// Picks the page fetcher for one request. Browser mode checks out a single
/// browser up front and keeps it for every page of the request; without a
/// pool, or when no browser can be checked out, the whole request uses `http`.
pub async fn fetcher_for(
    mode: FetchMode,
    pool: Option<&Arc<BrowserPool>>,
    http: Arc<dyn PageFetcher>,
    config: &ScraperConfig,
) -> Arc<dyn PageFetcher> {
    let pool = match (mode, pool) {
        (FetchMode::Http, _) => return http,
        (FetchMode::Browser, None) => {
            log::warn!("Browser mode requested but no browser pool is configured; using plain HTTP");
            return http;
        }
        (FetchMode::Browser, Some(pool)) => pool,
    };

    match pool.acquire().await {
        Ok(lease) => {
            log::debug!("Leased browser for request (headless: {})", pool.headless());
            Arc::new(BrowserFetcher::new(
                lease,
                config.render_wait,
                config.request_timeout + config.render_wait,
            ))
        }
        Err(e) => {
            log::warn!("{e}; using plain HTTP for this request");
            http
        }
    }
}

async fn load_page(browser: &Browser, url: &str, render_wait: Duration) -> Result<String, FetchError> {
    let page = browser
        .new_page(url)
        .await
        .map_err(|e| FetchError::Browser(e.to_string()))?;

    let html = async {
        page.wait_for_navigation().await?;
        page.find_element("body").await?;
        tokio::time::sleep(render_wait).await;
        page.content().await
    }
    .await
    .map_err(|e| FetchError::Browser(e.to_string()));

    if let Err(e) = page.close().await {
        log::debug!("Failed to close page {}: {}", url, e);
    }

    html
}

/// Locates a Chrome/Chromium binary: `CHROMIUM_PATH`, well-known install
/// locations, then `which`.
pub fn find_browser_executable() -> Result<PathBuf, FetchError> {
    if let Ok(path) = std::env::var("CHROMIUM_PATH") {
        let path = PathBuf::from(path);
        if path.exists() {
            return Ok(path);
        }
        log::warn!(
            "CHROMIUM_PATH points to a missing file: {}",
            path.display()
        );
    }

    let candidates: &[&str] = if cfg!(target_os = "macos") {
        &[
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
            "/opt/homebrew/bin/chromium",
        ]
    } else if cfg!(target_os = "windows") {
        &[
            r"C:\Program Files\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
        ]
    } else {
        &[
            "/usr/bin/google-chrome",
            "/usr/bin/google-chrome-stable",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/snap/bin/chromium",
        ]
    };

    if let Some(path) = candidates.iter().map(PathBuf::from).find(|p| p.exists()) {
        return Ok(path);
    }

    if !cfg!(target_os = "windows") {
        for cmd in ["chromium", "chromium-browser", "google-chrome", "chrome"] {
            if let Ok(output) = Command::new("which").arg(cmd).output()
                && output.status.success()
            {
                let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !path.is_empty() {
                    return Ok(PathBuf::from(path));
                }
            }
        }
    }

    Err(FetchError::Browser(
        "Chrome/Chromium executable not found; set CHROMIUM_PATH".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticFetcher;

    #[async_trait]
    impl PageFetcher for StaticFetcher {
        async fn fetch(&self, url: &str) -> Result<String, FetchError> {
            Ok(format!("<html><body>{url}</body></html>"))
        }
    }

    #[tokio::test]
    async fn test_closed_pool_refuses_leases() {
        let pool = BrowserPool::new(BrowserPoolConfig::default());
        pool.shutdown().await;
        assert!(matches!(pool.acquire().await, Err(FetchError::Browser(_))));
    }

    struct CountingFetcher(Mutex<usize>);

    #[async_trait]
    impl PageFetcher for CountingFetcher {
        async fn fetch(&self, url: &str) -> Result<String, FetchError> {
            *self.0.lock().unwrap() += 1;
            Ok(format!("<html><body>{url}</body></html>"))
        }
    }

    #[tokio::test]
    async fn test_unavailable_pool_sends_whole_request_over_http() {
        let pool = BrowserPool::new(BrowserPoolConfig::default());
        pool.shutdown().await;

        let counting = Arc::new(CountingFetcher(Mutex::new(0)));
        let http: Arc<dyn PageFetcher> = counting.clone();
        let config = ScraperConfig::default();

        let chosen = fetcher_for(FetchMode::Browser, Some(&pool), Arc::clone(&http), &config).await;
        assert!(Arc::ptr_eq(&chosen, &http));

        for url in ["https://lu.ma/web3", "https://lu.ma/a", "https://lu.ma/b"] {
            let html = chosen.fetch(url).await.unwrap();
            assert!(html.contains(url));
        }
        assert_eq!(*counting.0.lock().unwrap(), 3);
    }

    #[tokio::test]
    async fn test_fetcher_for_http_mode() {
        let http: Arc<dyn PageFetcher> = Arc::new(StaticFetcher);
        let pool = BrowserPool::new(BrowserPoolConfig::default());
        let config = ScraperConfig::default();

        let chosen = fetcher_for(FetchMode::Http, Some(&pool), Arc::clone(&http), &config).await;
        assert!(Arc::ptr_eq(&chosen, &http));

        let chosen = fetcher_for(FetchMode::Browser, None, Arc::clone(&http), &config).await;
        assert!(Arc::ptr_eq(&chosen, &http));
    }
}

use std::sync::Arc;

use lumascrape::{HttpFetcher, ScraperConfig};
use lumascrape_server::{AppState, BrowserPools, router};

const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:8055";
const DEFAULT_MAX_BROWSERS: usize = 2;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .write_style(env_logger::WriteStyle::Never)
        .init();

    let config = ScraperConfig::from_env();
    let max_browsers = std::env::var("MAX_BROWSERS")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(DEFAULT_MAX_BROWSERS);

    let http = Arc::new(HttpFetcher::new(config.request_timeout)?);
    let browsers = BrowserPools::new(max_browsers, &config);
    let state = AppState::new(config, http, Some(browsers.clone()));

    let address = std::env::var("BIND_ADDRESS").unwrap_or_else(|_| DEFAULT_BIND_ADDRESS.into());
    let tcp_listener = tokio::net::TcpListener::bind(&address).await?;

    log::info!("Starting lu.ma scraper API on address: {}", address);

    axum::serve(tcp_listener, router(state))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::error!("Failed to listen for shutdown signal: {}", e);
            }
            log::info!("Shutting down");
        })
        .await?;

    browsers.shutdown().await;
    Ok(())
}

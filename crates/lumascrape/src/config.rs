use std::time::Duration;

/// Knobs shared by the CLI and the HTTP service.
#[derive(Debug, Clone)]
pub struct ScraperConfig {
    pub base_url: String,
    /// Fixed pause between consecutive event-page fetches.
    pub request_delay: Duration,
    /// How long a browser page is given to render after the DOM is ready.
    pub render_wait: Duration,
    pub request_timeout: Duration,
    pub explore_limit: usize,
    pub custom_limit: usize,
    pub city_limit: usize,
    /// Fetch organizer profile pages for extra social links.
    pub enrich_profiles: bool,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: crate::BASE_URL.to_string(),
            request_delay: Duration::from_secs(1),
            render_wait: Duration::from_secs(2),
            request_timeout: Duration::from_secs(30),
            explore_limit: 20,
            custom_limit: 20,
            city_limit: 30,
            enrich_profiles: true,
        }
    }
}

impl ScraperConfig {
    /// Overrides defaults from `LUMA_BASE_URL` and `REQUEST_DELAY_MS` when set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(base_url) = std::env::var("LUMA_BASE_URL")
            && !base_url.trim().is_empty()
        {
            config.base_url = base_url.trim().trim_end_matches('/').to_string();
        }
        if let Some(ms) = std::env::var("REQUEST_DELAY_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
        {
            config.request_delay = Duration::from_millis(ms);
        }
        config
    }
}

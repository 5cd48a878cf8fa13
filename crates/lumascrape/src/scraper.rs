use std::collections::HashSet;
use std::sync::Arc;

use crate::config::ScraperConfig;
use crate::fetcher::{FetchError, PageFetcher};
use crate::parser::{
    extract_event_links, extract_fields, extract_profile_social_links, merge_social_links,
};
use crate::types::{EventRecord, Field, Source};
use crate::utils::KeywordFilter;

#[derive(Debug, thiserror::Error)]
pub enum ScraperError {
    #[error("Failed to load page: {0}")]
    Fetch(#[from] FetchError),
}

/// Runs the source drivers: listing page → event links → one record per
/// event page, fetched sequentially with a fixed delay in between.
#[derive(Clone)]
pub struct EventScraper {
    fetcher: Arc<dyn PageFetcher>,
    config: ScraperConfig,
}

impl std::fmt::Debug for EventScraper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventScraper")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl EventScraper {
    pub fn new(fetcher: Arc<dyn PageFetcher>, config: ScraperConfig) -> Self {
        Self { fetcher, config }
    }

    pub async fn scrape_explore(
        &self,
        filter: &KeywordFilter,
    ) -> Result<Vec<EventRecord>, ScraperError> {
        self.scrape_source(&Source::Explore, filter).await
    }

    pub async fn scrape_custom(
        &self,
        slug: &str,
        filter: &KeywordFilter,
    ) -> Result<Vec<EventRecord>, ScraperError> {
        let source = Source::Custom {
            slug: slug.to_string(),
        };
        self.scrape_source(&source, filter).await
    }

    pub async fn scrape_city(
        &self,
        city: &str,
        filter: &KeywordFilter,
    ) -> Result<Vec<EventRecord>, ScraperError> {
        let source = Source::City {
            city: city.to_string(),
        };
        self.scrape_source(&source, filter).await
    }

    pub async fn scrape_source(
        &self,
        source: &Source,
        filter: &KeywordFilter,
    ) -> Result<Vec<EventRecord>, ScraperError> {
        self.scrape_source_with_seen(source, filter, &mut HashSet::new())
            .await
    }

    /// Like [`EventScraper::scrape_source`], but skips (without fetching)
    /// event URLs already in `seen` and records the ones it visits. Lets
    /// several sources share one run.
    pub async fn scrape_source_with_seen(
        &self,
        source: &Source,
        filter: &KeywordFilter,
        seen: &mut HashSet<String>,
    ) -> Result<Vec<EventRecord>, ScraperError> {
        let limit = match source {
            Source::Explore => self.config.explore_limit,
            Source::Custom { .. } => self.config.custom_limit,
            Source::City { .. } => self.config.city_limit,
        };
        let listing_url = source.listing_url(&self.config.base_url);
        log::info!("Scraping {} events from {}", source, listing_url);

        let links = self.collect_event_links(&listing_url, limit).await?;
        if links.is_empty() {
            log::warn!("No event links found on {}", listing_url);
            return Ok(Vec::new());
        }
        log::info!("Found {} event links", links.len());

        let events = self.scrape_event_urls(&links, seen).await;
        let events = filter.apply(events);
        log::info!("Scraped {} events from {}", events.len(), source);
        Ok(events)
    }

    /// Single event page, no keyword filter.
    pub async fn scrape_url(&self, url: &str) -> Result<EventRecord, ScraperError> {
        log::info!("Scraping event {}", url);
        Ok(self.scrape_event(url).await?)
    }

    pub async fn collect_event_links(
        &self,
        listing_url: &str,
        limit: usize,
    ) -> Result<Vec<String>, ScraperError> {
        let html = self.fetcher.fetch(listing_url).await?;
        Ok(extract_event_links(&html, &self.config.base_url, limit))
    }

    /// Fetches each URL not yet in `seen`, in order. Pages that fail are
    /// logged and skipped.
    pub async fn scrape_event_urls(
        &self,
        urls: &[String],
        seen: &mut HashSet<String>,
    ) -> Vec<EventRecord> {
        let mut events = Vec::with_capacity(urls.len());
        let mut fetched = 0;

        for (i, url) in urls.iter().enumerate() {
            if !seen.insert(url.clone()) {
                log::debug!("Skipping already scraped {}", url);
                continue;
            }
            if fetched > 0 {
                self.pause().await;
            }
            fetched += 1;
            log::info!("Scraping event {}/{}: {}", i + 1, urls.len(), url);
            match self.scrape_event(url).await {
                Ok(event) => events.push(event),
                Err(e) => log::warn!("Skipping {}: {}", url, e),
            }
        }

        events
    }

    async fn scrape_event(&self, url: &str) -> Result<EventRecord, FetchError> {
        let html = self.fetcher.fetch(url).await?;
        let mut fields = extract_fields(&html, url, &self.config.base_url);

        if self.config.enrich_profiles
            && let Some(profile_url) = fields.get(&Field::OrganizerContact).cloned()
        {
            self.pause().await;
            match self.fetcher.fetch(&profile_url).await {
                Ok(profile) => {
                    let extra = extract_profile_social_links(&profile);
                    if !extra.is_empty() {
                        let existing = fields
                            .get(&Field::HostSocialMedia)
                            .map(String::as_str)
                            .unwrap_or_default();
                        let merged = merge_social_links(existing, &extra);
                        fields.insert(Field::HostSocialMedia, merged);
                    }
                }
                Err(e) => log::warn!("Could not load organizer profile {}: {}", profile_url, e),
            }
        }

        Ok(EventRecord::from_fields(fields))
    }

    async fn pause(&self) {
        if !self.config.request_delay.is_zero() {
            tokio::time::sleep(self.config.request_delay).await;
        }
    }
}

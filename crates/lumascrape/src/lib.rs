pub mod browser;
pub mod config;
pub mod export;
pub mod fetcher;
mod parser;
pub mod scraper;
pub mod types;
pub mod utils;

pub use config::ScraperConfig;
pub use fetcher::{FetchError, FetchMode, HttpFetcher, PageFetcher};
pub use parser::{extract_event_links, parse_event_page};
pub use crate::scraper::{EventScraper, ScraperError};
pub use types::{EventRecord, Field, PLACEHOLDER, Source};

pub(crate) const BASE_URL: &str = "https://lu.ma";

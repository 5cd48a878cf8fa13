use std::process;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use lumascrape::browser::{BrowserPool, BrowserPoolConfig, fetcher_for};
use lumascrape::export::{ExportFormat, default_filename, write_export};
use lumascrape::utils::{EventStats, KeywordFilter};
use lumascrape::{EventRecord, EventScraper, FetchMode, HttpFetcher, PageFetcher, ScraperConfig, Source};

const PREVIEW_EVENTS: usize = 3;

#[derive(Parser)]
#[command(name = "lumascrape")]
#[command(about = "A lu.ma event scraper", long_about = None)]
struct Cli {
    #[arg(
        short = 'l',
        long = "log-level",
        value_enum,
        default_value = "info",
        global = true,
        help = "Set the logging level"
    )]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Csv,
    Both,
    None,
}

impl OutputFormat {
    fn formats(self) -> &'static [ExportFormat] {
        match self {
            OutputFormat::Json => &[ExportFormat::Json],
            OutputFormat::Csv => &[ExportFormat::Csv],
            OutputFormat::Both => &[ExportFormat::Json, ExportFormat::Csv],
            OutputFormat::None => &[],
        }
    }
}

#[derive(Debug, Args)]
struct ScrapeOptions {
    #[arg(
        short = 'k',
        long,
        num_args = 1..,
        value_name = "KEYWORD",
        help = "Only keep events whose name or details mention one of these keywords"
    )]
    keywords: Vec<String>,

    #[arg(
        short = 'o',
        long = "output-format",
        value_enum,
        default_value = "both",
        help = "Files to write"
    )]
    format: OutputFormat,

    #[arg(
        long,
        default_value = "luma_events",
        help = "File name prefix for exports"
    )]
    output_prefix: String,

    #[arg(long, help = "Show the browser window")]
    headed: bool,

    #[arg(long, help = "Fetch pages over plain HTTP instead of a browser")]
    no_browser: bool,

    #[arg(long, value_name = "MS", help = "Delay between event page requests")]
    delay_ms: Option<u64>,

    #[arg(long, help = "Skip organizer profile pages when collecting social links")]
    no_profiles: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape events listed on the explore page
    Explore {
        #[command(flatten)]
        opts: ScrapeOptions,
    },
    /// Scrape events from a calendar or community page
    Custom {
        #[arg(help = "Calendar slug, e.g. web3")]
        slug: String,

        #[command(flatten)]
        opts: ScrapeOptions,
    },
    /// Scrape events listed for a city
    City {
        #[arg(help = "City name, e.g. \"San Francisco\"")]
        city: String,

        #[command(flatten)]
        opts: ScrapeOptions,
    },
    /// Scrape a single event page
    Url {
        #[arg(help = "URL of the event page")]
        url: String,

        #[command(flatten)]
        opts: ScrapeOptions,
    },
}

enum Target {
    Source(Source),
    Event(String),
}

fn print_preview(events: &[EventRecord]) {
    let preview = &events[..events.len().min(PREVIEW_EVENTS)];
    match serde_json::to_string_pretty(preview) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            log::error!("Error serializing to JSON: {}", e);
            process::exit(1);
        }
    }
    if events.len() > PREVIEW_EVENTS {
        println!("... and {} more events", events.len() - PREVIEW_EVENTS);
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level.clone().into())
        .init();

    let (target, opts) = match cli.command {
        Commands::Explore { opts } => (Target::Source(Source::Explore), opts),
        Commands::Custom { slug, opts } => (Target::Source(Source::Custom { slug }), opts),
        Commands::City { city, opts } => (Target::Source(Source::City { city }), opts),
        Commands::Url { url, opts } => (Target::Event(url), opts),
    };

    let mut config = ScraperConfig::from_env();
    if let Some(ms) = opts.delay_ms {
        config.request_delay = Duration::from_millis(ms);
    }
    config.enrich_profiles = !opts.no_profiles;

    let http: Arc<dyn PageFetcher> =
        Arc::new(HttpFetcher::new(config.request_timeout).unwrap_or_else(|e| {
            log::error!("Error creating HTTP client: {}", e);
            process::exit(1);
        }));

    let mode = FetchMode::from_flag(!opts.no_browser);
    let pool = (mode == FetchMode::Browser).then(|| {
        BrowserPool::new(BrowserPoolConfig {
            max_browsers: 1,
            headless: !opts.headed,
            request_timeout: config.request_timeout,
        })
    });

    let fetcher = fetcher_for(mode, pool.as_ref(), http, &config).await;
    let scraper = EventScraper::new(fetcher, config);
    let filter = KeywordFilter::new(opts.keywords.iter().flat_map(|k| k.split(',')));

    if !filter.is_empty() {
        log::info!("Filtering by keywords: {}", filter.keywords().join(", "));
    }

    let result = match &target {
        Target::Source(source) => scraper.scrape_source(source, &filter).await,
        Target::Event(url) => scraper
            .scrape_url(url)
            .await
            .map(|event| filter.apply(vec![event])),
    };
    drop(scraper);

    if let Some(pool) = &pool {
        pool.shutdown().await;
    }

    let events = result.unwrap_or_else(|e| {
        log::error!("Error scraping events: {}", e);
        process::exit(1);
    });

    if events.is_empty() {
        log::warn!("No events found");
        return;
    }
    for event in &events {
        log::debug!("\n{}", event);
    }

    let now = Utc::now();
    for format in opts.format.formats() {
        let path = default_filename(&opts.output_prefix, *format, now);
        if let Err(e) = write_export(&events, *format, &path) {
            log::error!("Error writing {}: {}", path, e);
            process::exit(1);
        }
        println!("Saved {} events to {}", events.len(), path);
    }

    print_preview(&events);
    print!("{}", EventStats::from_events(&events));
}

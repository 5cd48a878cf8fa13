use std::collections::{HashMap, HashSet};

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use lumascrape::export::{ExportFormat, default_filename};
use lumascrape::types::SourceKind;
use lumascrape::utils::{EventStats, KeywordFilter};
use lumascrape::{EventRecord, Field, Source};
use serde::Deserialize;
use serde_json::{Map, Value, json};

use crate::envelope::{Envelope, SourceResult, timestamp};
use crate::error::{ApiError, ParamError};
use crate::state::{AppState, FetchOptions};

const SERVICE_NAME: &str = "lumascrape-server";
const EXPORT_PREFIX: &str = "luma_events";

/// Query string shared by the GET scrape endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct ScrapeQuery {
    pub slug: Option<String>,
    pub city: Option<String>,
    pub keywords: Option<String>,
    pub headless: Option<String>,
    pub use_selenium: Option<String>,
}

impl ScrapeQuery {
    fn fetch_options(&self) -> Result<FetchOptions, ParamError> {
        Ok(FetchOptions {
            headless: parse_flag("headless", self.headless.as_deref(), true)?,
            use_selenium: parse_flag("use_selenium", self.use_selenium.as_deref(), true)?,
        })
    }

    fn filter(&self) -> KeywordFilter {
        self.keywords
            .as_deref()
            .map(KeywordFilter::from_comma_list)
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
pub struct UrlRequest {
    pub url: Option<String>,
    pub headless: Option<bool>,
    pub use_selenium: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Keywords {
    List(Vec<String>),
    Comma(String),
}

impl Keywords {
    fn filter(&self) -> KeywordFilter {
        match self {
            Keywords::List(list) => KeywordFilter::new(list),
            Keywords::Comma(list) => KeywordFilter::from_comma_list(list),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    #[serde(default)]
    pub sources: Vec<Value>,
    pub keywords: Option<Keywords>,
    pub headless: Option<bool>,
    pub use_selenium: Option<bool>,
}

/// Events arrive as loose objects; missing fields become placeholders.
#[derive(Debug, Deserialize)]
pub struct EventsRequest {
    #[serde(default)]
    pub events: Vec<Map<String, Value>>,
    pub filename: Option<String>,
}

impl EventsRequest {
    fn records(&self) -> Result<Vec<EventRecord>, ParamError> {
        if self.events.is_empty() {
            return Err(ParamError::NoEvents);
        }
        Ok(self.events.iter().map(record_from_json).collect())
    }
}

fn record_from_json(object: &Map<String, Value>) -> EventRecord {
    let fields = Field::ALL
        .iter()
        .filter_map(|field| {
            let value = match object.get(field.as_str())? {
                Value::Null => return None,
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            Some((*field, value))
        })
        .collect::<HashMap<_, _>>();
    EventRecord::from_fields(fields)
}

fn parse_flag(field: &'static str, value: Option<&str>, default: bool) -> Result<bool, ParamError> {
    let Some(value) = value else {
        return Ok(default);
    };
    match value.trim().to_lowercase().as_str() {
        "" => Ok(default),
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(ParamError::Invalid {
            field,
            reason: format!("expected true or false, got '{other}'"),
        }),
    }
}

fn required<'a>(field: &'static str, value: Option<&'a str>) -> Result<&'a str, ParamError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(ParamError::Missing(field))
}

fn query<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, ParamError> {
    query
        .map(|Query(q)| q)
        .map_err(|e| ParamError::Malformed(e.body_text()))
}

fn body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ParamError> {
    body.map(|Json(b)| b)
        .map_err(|e| ParamError::Malformed(e.body_text()))
}

fn scraped(events: Vec<EventRecord>, what: &str) -> Json<Envelope> {
    Json(Envelope::ok(format!("Scraped {} events from {}", events.len(), what)).with_events(events))
}

pub async fn scrape_explore(
    State(state): State<AppState>,
    params: Result<Query<ScrapeQuery>, QueryRejection>,
) -> Result<Json<Envelope>, ApiError> {
    let params = query(params)?;
    let events = state
        .scraper(params.fetch_options()?)
        .await
        .scrape_explore(&params.filter())
        .await?;
    Ok(scraped(events, "explore"))
}

pub async fn scrape_custom(
    State(state): State<AppState>,
    params: Result<Query<ScrapeQuery>, QueryRejection>,
) -> Result<Json<Envelope>, ApiError> {
    let params = query(params)?;
    let slug = required("slug", params.slug.as_deref())?;
    let events = state
        .scraper(params.fetch_options()?)
        .await
        .scrape_custom(slug, &params.filter())
        .await?;
    Ok(scraped(events, slug))
}

pub async fn scrape_city(
    State(state): State<AppState>,
    params: Result<Query<ScrapeQuery>, QueryRejection>,
) -> Result<Json<Envelope>, ApiError> {
    let params = query(params)?;
    let city = required("city", params.city.as_deref())?;
    let events = state
        .scraper(params.fetch_options()?)
        .await
        .scrape_city(city, &params.filter())
        .await?;
    Ok(scraped(events, city))
}

pub async fn scrape_url(
    State(state): State<AppState>,
    request: Result<Json<UrlRequest>, JsonRejection>,
) -> Result<Json<Envelope>, ApiError> {
    let request = body(request)?;
    let url = required("url", request.url.as_deref())?;
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(ParamError::Invalid {
            field: "url",
            reason: "must be an http(s) URL".into(),
        }
        .into());
    }

    let opts = FetchOptions {
        headless: request.headless.unwrap_or(true),
        use_selenium: request.use_selenium.unwrap_or(true),
    };
    let event = state.scraper(opts).await.scrape_url(url).await?;
    Ok(Json(
        Envelope::ok(format!("Scraped event from {}", url)).with_events(vec![event]),
    ))
}

fn parse_batch_source(entry: &Value) -> Result<Source, String> {
    let kind = entry
        .get("type")
        .and_then(Value::as_str)
        .ok_or("Missing source type")?;
    let params = entry.get("params");
    let param = |name: &str| {
        params
            .and_then(|p| p.get(name))
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    match kind.parse::<SourceKind>().map_err(|e| e.to_string())? {
        SourceKind::Explore => Ok(Source::Explore),
        SourceKind::Custom => param("slug")
            .map(|slug| Source::Custom { slug })
            .ok_or_else(|| "Missing required parameter: slug".to_string()),
        SourceKind::City => param("city")
            .map(|city| Source::City { city })
            .ok_or_else(|| "Missing required parameter: city".to_string()),
    }
}

pub async fn batch(
    State(state): State<AppState>,
    request: Result<Json<BatchRequest>, JsonRejection>,
) -> Result<Json<Envelope>, ApiError> {
    let request = body(request)?;
    if request.sources.is_empty() {
        return Err(ParamError::Missing("sources").into());
    }

    let filter = request
        .keywords
        .as_ref()
        .map(Keywords::filter)
        .unwrap_or_default();
    let scraper = state
        .scraper(FetchOptions {
            headless: request.headless.unwrap_or(true),
            use_selenium: request.use_selenium.unwrap_or(true),
        })
        .await;

    let mut results = Vec::with_capacity(request.sources.len());
    let mut events = Vec::new();
    let mut seen = HashSet::new();

    for entry in &request.sources {
        let parsed = parse_batch_source(entry);
        let kind = match &parsed {
            Ok(source) => source.kind().to_string(),
            Err(_) => entry
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string(),
        };

        let outcome = match parsed {
            Ok(source) => scraper
                .scrape_source_with_seen(&source, &filter, &mut seen)
                .await
                .map_err(|e| e.to_string()),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(found) => {
                results.push(SourceResult {
                    kind,
                    success: true,
                    count: found.len(),
                    error: None,
                });
                events.extend(found);
            }
            Err(e) => {
                log::warn!("Batch source '{}' failed: {}", kind, e);
                results.push(SourceResult {
                    kind,
                    success: false,
                    count: 0,
                    error: Some(e),
                });
            }
        }
    }

    let succeeded = results.iter().filter(|r| r.success).count();
    let message = format!(
        "Processed {} sources ({} succeeded), {} events",
        results.len(),
        succeeded,
        events.len()
    );
    Ok(Json(
        Envelope::ok(message)
            .with_events(events)
            .with_results(results),
    ))
}

fn export(request: EventsRequest, format: ExportFormat) -> Result<Response, ApiError> {
    let events = request.records()?;
    let rendered = format.render(&events)?;
    let filename = request
        .filename
        .as_deref()
        .map(|name| export_filename(name, format))
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| default_filename(EXPORT_PREFIX, format, Utc::now()));

    log::info!("Exporting {} events as {}", events.len(), filename);
    let headers = [
        (CONTENT_TYPE, format.content_type().to_string()),
        (
            CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        ),
    ];
    Ok((StatusCode::OK, headers, rendered).into_response())
}

/// Keeps header-safe characters and makes sure the extension matches.
fn export_filename(requested: &str, format: ExportFormat) -> String {
    let name: String = requested
        .trim()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();
    if name.is_empty() {
        return name;
    }
    let suffix = format!(".{}", format.extension());
    if name.ends_with(&suffix) {
        name
    } else {
        name + &suffix
    }
}

pub async fn export_json(
    request: Result<Json<EventsRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    export(body(request)?, ExportFormat::Json)
}

pub async fn export_csv(
    request: Result<Json<EventsRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    export(body(request)?, ExportFormat::Csv)
}

pub async fn stats(
    request: Result<Json<EventsRequest>, JsonRejection>,
) -> Result<Json<Envelope>, ApiError> {
    let events = body(request)?.records()?;
    Ok(Json(
        Envelope::ok(format!("Computed statistics for {} events", events.len()))
            .with_stats(EventStats::from_events(&events)),
    ))
}

pub async fn health() -> impl IntoResponse {
    Json(json!({
        "success": true,
        "status": "healthy",
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": timestamp(),
    }))
}

pub async fn index() -> impl IntoResponse {
    Json(json!({
        "success": true,
        "message": "lu.ma event scraper API",
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "GET /scrape/explore": "Scrape the explore page (keywords, headless, use_selenium)",
            "GET /scrape/custom": "Scrape a calendar by slug (slug, keywords, headless, use_selenium)",
            "GET /scrape/city": "Scrape a city page (city, keywords, headless, use_selenium)",
            "POST /scrape/url": "Scrape one event page ({url, headless, use_selenium})",
            "POST /batch": "Scrape several sources ({sources, keywords, headless, use_selenium})",
            "POST /export/json": "Download events as JSON ({events, filename})",
            "POST /export/csv": "Download events as CSV ({events, filename})",
            "POST /stats": "Summarize events ({events})",
            "GET /health": "Service health",
        },
        "timestamp": timestamp(),
    }))
}

pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(uri.path().to_string())
}

use chrono::{SecondsFormat, Utc};
use lumascrape::EventRecord;
use lumascrape::utils::EventStats;
use serde::Serialize;

/// Per-source outcome of a `/batch` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceResult {
    #[serde(rename = "type")]
    pub kind: String,
    pub success: bool,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The `{success, message|error, count?, events?, timestamp}` body shared
/// by every JSON endpoint.
#[derive(Debug, Serialize)]
pub struct Envelope {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub events: Option<Vec<EventRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<SourceResult>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<EventStats>,
    pub timestamp: String,
}

pub fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

impl Envelope {
    pub fn new(success: bool) -> Self {
        Self {
            success,
            message: None,
            error: None,
            count: None,
            events: None,
            results: None,
            stats: None,
            timestamp: timestamp(),
        }
    }

    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::new(true)
        }
    }

    pub fn error(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::new(false)
        }
    }

    pub fn with_events(mut self, events: Vec<EventRecord>) -> Self {
        self.count = Some(events.len());
        self.events = Some(events);
        self
    }

    pub fn with_results(mut self, results: Vec<SourceResult>) -> Self {
        self.results = Some(results);
        self
    }

    pub fn with_stats(mut self, stats: EventStats) -> Self {
        self.count = Some(stats.total_events);
        self.stats = Some(stats);
        self
    }
}

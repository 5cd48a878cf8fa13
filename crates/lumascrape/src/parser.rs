use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::types::{EventRecord, Field};

const MAX_SOCIAL_LINKS: usize = 5;
const MAX_PROFILE_SOCIAL_LINKS: usize = 3;
const MIN_DETAILS_LEN: usize = 20;
const MAX_DETAILS_LEN: usize = 1200;

const SOCIAL_HOSTS: &[&str] = &[
    "x.com",
    "twitter.com",
    "instagram.com",
    "facebook.com",
    "linkedin.com",
    "youtube.com",
    "tiktok.com",
    "github.com",
    "discord.gg",
    "discord.com",
    "t.me",
    "telegram.me",
];

const NAME_SELECTORS: &[&str] = &[
    r#"h1[data-testid="event-title"]"#,
    "h1.event-title",
    "h1.title",
    "h1",
    r#"[data-testid="event-name"]"#,
    r#"[class*="title"]"#,
];

const DATE_SELECTORS: &[&str] = &[
    r#"[data-testid="event-date"]"#,
    ".event-date",
    ".date",
    r#"[class*="date"]"#,
    r#"[class*="time"]"#,
];

const LOCATION_SELECTORS: &[&str] = &[
    r#"[data-testid="event-location"]"#,
    ".event-location",
    ".location",
    r#"[class*="location"]"#,
    r#"[class*="venue"]"#,
    r#"[class*="address"]"#,
];

const DETAILS_SELECTORS: &[&str] = &[
    r#"[data-testid="event-description"]"#,
    r#"[data-testid="event-details"]"#,
    r#"section[data-testid*="description"]"#,
    r#"div[data-testid*="description"]"#,
    r#"section[class*="description"]"#,
    r#"div[class*="description"]"#,
    r#"section[class*="about"]"#,
    r#"div[class*="about"]"#,
    "article",
];

const ORGANIZER_SELECTORS: &[&str] = &[
    r#"[data-testid="organizer-name"]"#,
    ".organizer-name",
    ".organizer",
    r#"[class*="organizer"]"#,
    r#"[class*="host"]"#,
    r#"[class*="creator"]"#,
    r#"a[href*="/u/"]"#,
];

const HOST_SECTION_SELECTORS: &[&str] = &[
    r#"[class*="social-link"]"#,
    r#"[class*="host"]"#,
    r#"[class*="organizer"]"#,
    r#"[class*="creator"]"#,
    r#"[data-testid*="host"]"#,
    r#"[data-testid*="organizer"]"#,
];

const EVENT_LINK_SELECTORS: &[&str] = &[
    r#"a[href*="/event/"]"#,
    r#"a[href*="/e/"]"#,
    r#"[data-testid="event-card"] a"#,
    ".event-card a",
    r#"a[class*="event"]"#,
    r#"[class*="event"] a"#,
];

const MONTHS: &str = "January|February|March|April|May|June|July|August|September|October|November|December|Jan|Feb|Mar|Apr|Jun|Jul|Aug|Sep|Sept|Oct|Nov|Dec";
const WEEKDAYS: &str = "Monday|Tuesday|Wednesday|Thursday|Friday|Saturday|Sunday";

static RE_DATES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        format!(r"(?i)\b(?:{WEEKDAYS})[, ]+\d{{1,2}}(?:st|nd|rd|th)?[, ]+(?:{MONTHS})\b"),
        format!(r"(?i)\b(?:{WEEKDAYS})[, ]+(?:{MONTHS})[, ]+\d{{1,2}}(?:st|nd|rd|th)?\b"),
        format!(r"(?i)\b\d{{1,2}}(?:st|nd|rd|th)?[, ]+(?:{MONTHS})\b"),
        format!(r"(?i)\b(?:{MONTHS})[, ]+\d{{1,2}}(?:st|nd|rd|th)?\b"),
        r"\b\d{4}[-/]\d{1,2}[-/]\d{1,2}\b".to_string(),
        r"\b\d{1,2}[-/]\d{1,2}[-/]\d{4}\b".to_string(),
        r"(?i)\b(?:Today|Tomorrow|Yesterday)\b".to_string(),
    ]
    .iter()
    .map(|p| Regex::new(p).expect("invalid regex: date pattern"))
    .collect()
});

static RE_TIMES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\b\d{1,2}:\d{2}(?:\s*[AP]M)?\s*[-–—]\s*\d{1,2}:\d{2}(?:\s*[AP]M)?\b",
        r"(?i)\b\d{1,2}(?::\d{2})?\s*[AP]M\s*(?:[-–—]|to)\s*\d{1,2}(?::\d{2})?\s*[AP]M\b",
        r"(?i)\b\d{1,2}:\d{2}(?:\s*[AP]M)?\b",
        r"(?i)\b\d{1,2}\s*[AP]M\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("invalid regex: time pattern"))
    .collect()
});

static RE_TIMEZONE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:GMT|UTC)\s*[+-]\s*[0-9:]+").expect("invalid regex: timezone")
});

/// Capture group 1 wins when present, otherwise the whole match.
static RE_LOCATIONS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"📍\s*([A-Za-z0-9][^\n📍]{1,99})",
        r"(?i)\b(?:venue|location|where)\s*:\s*([^\n]{2,100})",
        r"\b[A-Z][a-z]+(?: [A-Z][a-z]+)*, (?:[A-Z]{2}|[A-Z][a-z]+)\b",
        r"(?i)\b(?:Conference Room|Meeting Room|Building|Floor|Hall|Auditorium|Theat(?:er|re)|Cent(?:er|re)|Studio|Lab|Campus) [A-Za-z0-9][A-Za-z0-9 ]{0,60}",
        r"(?i)\b(?:Online|Virtual|Zoom|Google Meet|Microsoft Teams|Webinar)\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("invalid regex: location pattern"))
    .collect()
});

static RE_LOCATION_NOISE: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)Date:.*?Time:",
        r"(?i)(Hosted by|Contact us:|Email:|Telegram|Join our|Explore Events|Sign (in|up)|Report).*",
        r"\x{200B}.*",
        r"\.{2,}",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("invalid regex: location noise"))
    .collect()
});

static RE_HOSTED_BY: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)hosted\s+by\s*:?\s*([^,\n\r]{2,50})",
        r"(?i)organi[sz]ed\s+by\s*:?\s*([^,\n\r]{2,50})",
        r"(?i)organi[sz]er\s*:\s*([^,\n\r]{2,50})",
        r"(?i)presented\s+by\s*:?\s*([^,\n\r]{2,50})",
        r"(?i)sponsored\s+by\s*:?\s*([^,\n\r]{2,50})",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("invalid regex: hosted by"))
    .collect()
});

static RE_ORGANIZER_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(hosted|presented|organi[sz]ed)\s+by\s*:?\s*").expect("invalid regex: organizer prefix")
});

static RE_ORGANIZER_NOISE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\.{2,}|Access Support|LinkedOut \.").expect("invalid regex: organizer noise")
});

static RE_DETAILS_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)about( the)? event|about|event details|agenda|what to expect")
        .expect("invalid regex: details heading")
});

static RE_ABOUT_EVENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bAbout\s+Event\b[:\-]?").expect("invalid regex: about event")
});

static RE_EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").expect("invalid regex: email")
});

static RE_SOCIAL_URL: LazyLock<Regex> = LazyLock::new(|| {
    let hosts: Vec<String> = SOCIAL_HOSTS.iter().map(|h| regex::escape(h)).collect();
    Regex::new(&format!(
        r#"https?://(?:www\.)?(?:{})/[^\s"<>,]+"#,
        hosts.join("|")
    ))
    .expect("invalid regex: social url")
});

/// Sentence punctuation that trails a URL in running text.
const URL_TRAILING_PUNCTUATION: &[char] = &['.', ')', ';', ':', '!', '?'];

static BODY: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("body").expect("invalid selector: body"));
static ANCHORS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("invalid selector: anchors"));
static PARAGRAPHS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("p").expect("invalid selector: paragraphs"));
static HEADING_CANDIDATES: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("h1, h2, h3, h4, p, span").expect("invalid selector: headings")
});
static PROFILE_LINKS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"a[href*="/u/"]"#).expect("invalid selector: profile"));
static MAILTO: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"a[href^="mailto:"]"#).expect("invalid selector: mailto"));

/// A parsed event page with its visible text precomputed.
struct EventPage<'a> {
    document: Html,
    text: String,
    base_url: &'a str,
}

impl<'a> EventPage<'a> {
    fn new(html: &str, base_url: &'a str) -> Self {
        let document = Html::parse_document(html);
        let text = visible_text(&document);
        Self {
            document,
            text,
            base_url,
        }
    }

    /// First element matched by the first selector in `selectors` that matches anything.
    fn first_match(&self, selectors: &[&str]) -> Option<ElementRef<'_>> {
        selectors
            .iter()
            .filter_map(|css| Selector::parse(css).ok())
            .find_map(|sel| self.document.select(&sel).next())
    }
}

/// Parses an event page into a normalized record.
pub fn parse_event_page(html: &str, url: &str, base_url: &str) -> EventRecord {
    EventRecord::from_fields(extract_fields(html, url, base_url))
}

/// Runs every field lookup independently; fields that are not found are
/// simply absent from the map.
pub fn extract_fields(html: &str, url: &str, base_url: &str) -> HashMap<Field, String> {
    let page = EventPage::new(html, base_url);
    let mut fields = HashMap::new();

    let mut put = |field: Field, value: Option<String>| {
        if let Some(value) = value {
            fields.insert(field, value);
        }
    };

    put(Field::EventName, extract_event_name(&page));
    put(Field::DateTime, extract_date_time(&page));
    put(Field::Location, extract_location(&page));
    put(Field::EventDetails, extract_event_details(&page));

    let (organizer_name, organizer_contact) = extract_organizer(&page);
    put(Field::OrganizerName, organizer_name);
    put(Field::OrganizerContact, organizer_contact);
    put(Field::HostEmail, extract_host_email(&page));
    put(Field::HostSocialMedia, extract_host_social_media(&page));
    put(Field::EventUrl, Some(url.to_string()));

    fields
}

fn extract_event_name(page: &EventPage) -> Option<String> {
    page.first_match(NAME_SELECTORS)
        .map(spaced_text)
        .filter(|s| !s.is_empty())
}

fn extract_date_time(page: &EventPage) -> Option<String> {
    let date = first_pattern_match(&RE_DATES, &page.text);
    let time = first_pattern_match(&RE_TIMES, &page.text);

    let combined = match (date, time) {
        (Some(d), Some(t)) => Some(format!("{} {}", d, t)),
        (Some(d), None) => Some(d),
        (None, Some(t)) => Some(t),
        (None, None) => None,
    };

    combined.and_then(|s| clean_date_time(&s)).or_else(|| {
        page.first_match(DATE_SELECTORS)
            .map(spaced_text)
            .and_then(|s| clean_date_time(&s))
    })
}

fn extract_location(page: &EventPage) -> Option<String> {
    RE_LOCATIONS
        .iter()
        .flat_map(|re| re.captures_iter(&page.text))
        .filter_map(|caps| {
            let m = caps.get(1).or_else(|| caps.get(0))?;
            clean_location(m.as_str())
        })
        .next()
        .or_else(|| {
            page.first_match(LOCATION_SELECTORS)
                .map(spaced_text)
                .and_then(|s| clean_location(&s))
        })
}

fn extract_event_details(page: &EventPage) -> Option<String> {
    let from_containers = DETAILS_SELECTORS
        .iter()
        .filter_map(|css| Selector::parse(css).ok())
        .find_map(|sel| {
            page.document
                .select(&sel)
                .find_map(|e| clean_event_details(&spaced_text(e)))
        });
    if from_containers.is_some() {
        return from_containers;
    }

    let from_heading = page
        .document
        .select(&HEADING_CANDIDATES)
        .filter(|e| RE_DETAILS_HEADING.is_match(&spaced_text(*e)) && spaced_text(*e).len() < 40)
        .find_map(|heading| clean_event_details(&text_after_heading(heading)));
    if from_heading.is_some() {
        return from_heading;
    }

    let paragraphs: Vec<String> = page
        .document
        .select(&PARAGRAPHS)
        .take(3)
        .map(spaced_text)
        .collect();
    clean_event_details(&paragraphs.join(" "))
}

/// Text of up to five siblings following `heading`, stopping at the next heading.
fn text_after_heading(heading: ElementRef) -> String {
    let mut parts = Vec::new();
    for sibling in heading.next_siblings() {
        if let Some(element) = ElementRef::wrap(sibling) {
            if matches!(element.value().name(), "h1" | "h2" | "h3" | "h4") {
                break;
            }
            let text = spaced_text(element);
            if !text.is_empty() {
                parts.push(text);
            }
        } else if let Some(text) = sibling.value().as_text() {
            let text = text.trim();
            if !text.is_empty() {
                parts.push(text.to_string());
            }
        }
        if parts.len() >= 5 {
            break;
        }
    }
    parts.join(" ")
}

/// Returns `(organizer_name, organizer_contact)`.
fn extract_organizer(page: &EventPage) -> (Option<String>, Option<String>) {
    let mut name = None;
    let mut contact = None;

    if let Some(element) = page.first_match(ORGANIZER_SELECTORS) {
        name = clean_organizer(&spaced_text(element));
        if element.value().name() == "a" {
            contact = element
                .value()
                .attr("href")
                .and_then(|href| absolute_url(page.base_url, href));
        }
    }

    if contact.is_none()
        && let Some(link) = page.document.select(&PROFILE_LINKS).next()
    {
        contact = link
            .value()
            .attr("href")
            .and_then(|href| absolute_url(page.base_url, href));
        if name.is_none() {
            name = clean_organizer(&spaced_text(link));
        }
    }

    if name.is_none() {
        name = RE_HOSTED_BY
            .iter()
            .find_map(|re| re.captures(&page.text))
            .and_then(|caps| clean_organizer(&caps[1]));
    }

    (name, contact)
}

fn extract_host_email(page: &EventPage) -> Option<String> {
    RE_EMAIL
        .find(&page.text)
        .map(|m| m.as_str().to_string())
        .or_else(|| {
            page.document
                .select(&MAILTO)
                .filter_map(|a| a.value().attr("href"))
                .filter_map(|href| href.strip_prefix("mailto:"))
                .map(|addr| addr.split('?').next().unwrap_or(addr).trim().to_string())
                .find(|addr| RE_EMAIL.is_match(addr))
        })
}

fn extract_host_social_media(page: &EventPage) -> Option<String> {
    let mut links = Vec::new();

    for sel in HOST_SECTION_SELECTORS
        .iter()
        .filter_map(|css| Selector::parse(css).ok())
    {
        for section in page.document.select(&sel) {
            links.extend(
                section
                    .select(&ANCHORS)
                    .filter_map(|a| a.value().attr("href"))
                    .filter(|href| is_social_link(href))
                    .map(str::to_string),
            );
        }
    }

    links.extend(
        RE_SOCIAL_URL
            .find_iter(&page.text)
            .map(|m| m.as_str().trim_end_matches(URL_TRAILING_PUNCTUATION).to_string()),
    );

    let links = dedup_preserving_order(links);
    (!links.is_empty()).then(|| {
        links
            .into_iter()
            .take(MAX_SOCIAL_LINKS)
            .collect::<Vec<_>>()
            .join(", ")
    })
}

/// Social links found anywhere on an organizer profile page.
pub fn extract_profile_social_links(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let links = document
        .select(&ANCHORS)
        .filter_map(|a| a.value().attr("href"))
        .filter(|href| is_social_link(href))
        .map(str::to_string)
        .collect();

    dedup_preserving_order(links)
        .into_iter()
        .take(MAX_PROFILE_SOCIAL_LINKS)
        .collect()
}

/// Merges profile links into an existing comma-joined list, keeping at most five.
pub fn merge_social_links(existing: &str, extra: &[String]) -> String {
    let links = existing
        .split(", ")
        .map(str::trim)
        .filter(|s| !s.is_empty() && *s != crate::types::PLACEHOLDER)
        .map(str::to_string)
        .chain(extra.iter().cloned())
        .collect();

    dedup_preserving_order(links)
        .into_iter()
        .take(MAX_SOCIAL_LINKS)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Collects candidate event URLs from a listing page: the first selector
/// that yields anchors wins, falling back to any anchor that looks like an
/// event path. Links are made absolute, deduplicated and capped at `limit`.
pub fn extract_event_links(html: &str, base_url: &str, limit: usize) -> Vec<String> {
    let document = Html::parse_document(html);

    let hrefs: Vec<&str> = EVENT_LINK_SELECTORS
        .iter()
        .filter_map(|css| Selector::parse(css).ok())
        .map(|sel| {
            document
                .select(&sel)
                .filter_map(|a| a.value().attr("href"))
                .collect::<Vec<_>>()
        })
        .find(|hrefs| !hrefs.is_empty())
        .unwrap_or_else(|| {
            document
                .select(&ANCHORS)
                .filter_map(|a| a.value().attr("href"))
                .filter(|href| href.contains("/event/") || href.contains("/e/"))
                .collect()
        });

    let urls = hrefs
        .into_iter()
        .filter(|href| {
            !(href.starts_with('#') || href.starts_with("mailto:") || href.starts_with("javascript:"))
        })
        .filter_map(|href| absolute_url(base_url, href))
        .collect();

    let mut urls = dedup_preserving_order(urls);
    urls.truncate(limit);
    urls
}

fn clean_date_time(raw: &str) -> Option<String> {
    let cleaned = normalize_whitespace(&RE_TIMEZONE.replace_all(raw, " "));
    (cleaned.chars().count() >= 3).then_some(cleaned)
}

fn clean_location(raw: &str) -> Option<String> {
    let cleaned = RE_LOCATION_NOISE
        .iter()
        .fold(raw.to_string(), |acc, re| re.replace_all(&acc, " ").into_owned());
    let cleaned = normalize_whitespace(&cleaned);
    let cleaned = cleaned.trim_matches(|c: char| c == ',' || c == '.' || c.is_whitespace());
    let len = cleaned.chars().count();
    (2..=100).contains(&len).then(|| cleaned.to_string())
}

fn clean_organizer(raw: &str) -> Option<String> {
    let cleaned = RE_ORGANIZER_NOISE.replace_all(raw, " ");
    let cleaned = normalize_whitespace(&cleaned);
    let cleaned = RE_ORGANIZER_PREFIX.replace(&cleaned, "").trim().to_string();
    let len = cleaned.chars().count();
    (2..=100).contains(&len).then_some(cleaned)
}

fn clean_event_details(raw: &str) -> Option<String> {
    let cleaned = normalize_whitespace(&RE_ABOUT_EVENT.replace_all(raw, " "));
    if cleaned.chars().count() < MIN_DETAILS_LEN {
        return None;
    }
    if cleaned.chars().count() > MAX_DETAILS_LEN {
        let truncated: String = cleaned.chars().take(MAX_DETAILS_LEN).collect();
        return Some(truncated.trim_end().to_string());
    }
    Some(cleaned)
}

fn is_social_link(href: &str) -> bool {
    let Ok(url) = Url::parse(href) else {
        return false;
    };
    let Some(host) = url.host_str() else {
        return false;
    };
    let host = host.trim_start_matches("www.").to_lowercase();
    SOCIAL_HOSTS
        .iter()
        .any(|p| host == *p || host.ends_with(&format!(".{p}")))
}

fn absolute_url(base_url: &str, href: &str) -> Option<String> {
    let base = Url::parse(base_url).ok()?;
    base.join(href.trim()).ok().map(String::from)
}

fn first_pattern_match(patterns: &[Regex], text: &str) -> Option<String> {
    patterns.iter().find_map(|re| {
        re.find_iter(text)
            .map(|m| m.as_str().trim().to_string())
            .find(|s| s.chars().count() > 3)
    })
}

fn dedup_preserving_order(items: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

/// Text of every node under `<body>` outside scripts and styles, one text
/// node per line.
fn visible_text(document: &Html) -> String {
    let root = document
        .select(&BODY)
        .next()
        .unwrap_or_else(|| document.root_element());

    root.descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let hidden = node.ancestors().any(|a| {
                a.value().as_element().is_some_and(|e| {
                    matches!(e.name(), "script" | "style" | "noscript" | "template")
                })
            });
            let text = text.trim();
            (!hidden && !text.is_empty()).then(|| text.to_string())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn spaced_text(element: ElementRef) -> String {
    normalize_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PLACEHOLDER;
    use std::fs;

    const BASE: &str = "https://lu.ma";

    fn fixture(name: &str) -> String {
        fs::read_to_string(format!("fixtures/{}", name)).expect("Failed to read fixture")
    }

    #[test]
    fn test_parse_full_event_page() {
        let html = fixture("event_rust_meetup.html");
        let record = parse_event_page(&html, "https://lu.ma/rust-meetup", BASE);

        assert_eq!(record.event_name(), "Rust Nairobi Monthly Meetup");
        assert_eq!(record.date_time(), "Saturday 15th March 10:00 AM - 1:00 PM");
        assert_eq!(record.location(), "iHub, Senteu Plaza, Nairobi");
        assert!(record.event_details().starts_with("Join fellow Rustaceans"));
        assert_eq!(record.organizer_name(), "Rust Nairobi");
        assert_eq!(record.organizer_contact(), "https://lu.ma/u/rustnairobi");
        assert_eq!(record.host_email(), "hello@rustnairobi.dev");
        assert_eq!(
            record.host_social_media(),
            "https://x.com/rustnairobi, https://github.com/rust-nairobi"
        );
        assert_eq!(record.event_url(), "https://lu.ma/rust-meetup");
    }

    #[test]
    fn test_empty_page_still_produces_record() {
        let record = parse_event_page("<html><body></body></html>", "https://lu.ma/x", BASE);

        assert_eq!(record.event_url(), "https://lu.ma/x");
        assert_eq!(record.event_name(), PLACEHOLDER);
        assert_eq!(record.date_time(), PLACEHOLDER);
        assert_eq!(record.location(), PLACEHOLDER);
        assert_eq!(record.event_details(), PLACEHOLDER);
        assert_eq!(record.organizer_name(), PLACEHOLDER);
        assert_eq!(record.organizer_contact(), PLACEHOLDER);
        assert_eq!(record.host_email(), PLACEHOLDER);
        assert_eq!(record.host_social_media(), PLACEHOLDER);
    }

    #[test]
    fn test_fields_are_independent() {
        let html = r#"<html><body>
            <h1>Only A Title</h1>
            <p>Questions? write to team@example.org</p>
        </body></html>"#;
        let fields = extract_fields(html, "https://lu.ma/t", BASE);

        assert_eq!(fields.get(&Field::EventName).unwrap(), "Only A Title");
        assert_eq!(fields.get(&Field::HostEmail).unwrap(), "team@example.org");
        assert!(!fields.contains_key(&Field::Location));
        assert!(!fields.contains_key(&Field::OrganizerContact));
    }

    #[test]
    fn test_date_time_joins_first_date_and_time() {
        let html = r#"<html><body><div>Friday, 22nd November</div><div>18:30 - 21:00 GMT+5:30</div></body></html>"#;
        let record = parse_event_page(html, "https://lu.ma/t", BASE);
        assert_eq!(record.date_time(), "Friday, 22nd November 18:30 - 21:00");
    }

    #[test]
    fn test_date_falls_back_to_selector() {
        let html = r#"<html><body><span class="event-date">Next Thursday evening UTC+1</span></body></html>"#;
        let record = parse_event_page(html, "https://lu.ma/t", BASE);
        assert_eq!(record.date_time(), "Next Thursday evening");
    }

    #[test]
    fn test_location_online_marker() {
        let html = r#"<html><body><h1>Zig Study Group</h1><div>Online event</div></body></html>"#;
        let record = parse_event_page(html, "https://lu.ma/t", BASE);
        assert_eq!(record.location(), "Online");
    }

    #[test]
    fn test_details_from_heading_siblings() {
        let html = r#"<html><body>
            <h1>Hack Night</h1>
            <div>
              <h2>About Event</h2>
              <p>Bring a laptop and build something fun with friends.</p>
              <p>Pizza provided.</p>
              <h2>Location</h2>
            </div>
        </body></html>"#;
        let record = parse_event_page(html, "https://lu.ma/t", BASE);
        assert_eq!(
            record.event_details(),
            "Bring a laptop and build something fun with friends. Pizza provided."
        );
    }

    #[test]
    fn test_details_rejects_short_text_and_truncates_long() {
        assert_eq!(clean_event_details("Too short"), None);
        let long = "word ".repeat(400);
        let cleaned = clean_event_details(&long).unwrap();
        assert!(cleaned.chars().count() <= MAX_DETAILS_LEN);
        assert!(!cleaned.ends_with(' '));
    }

    #[test]
    fn test_organizer_from_hosted_by_text() {
        let html = r#"<html><body><p>Hosted by Nairobi Devs</p></body></html>"#;
        let record = parse_event_page(html, "https://lu.ma/t", BASE);
        assert_eq!(record.organizer_name(), "Nairobi Devs");
        assert_eq!(record.organizer_contact(), PLACEHOLDER);
    }

    #[test]
    fn test_social_links_capped_and_deduplicated() {
        let html = r#"<html><body><div class="social-links">
            <a href="https://x.com/a">x</a>
            <a href="https://x.com/a">x again</a>
            <a href="https://instagram.com/b">ig</a>
            <a href="https://www.linkedin.com/in/c">li</a>
            <a href="https://youtube.com/@d">yt</a>
            <a href="https://github.com/e">gh</a>
            <a href="https://t.me/f">tg</a>
            <a href="https://netflix.com/g">not social</a>
        </div></body></html>"#;
        let record = parse_event_page(html, "https://lu.ma/t", BASE);
        let links: Vec<&str> = record.host_social_media().split(", ").collect();

        assert_eq!(links.len(), 5);
        assert_eq!(links[0], "https://x.com/a");
        assert!(!links.contains(&"https://netflix.com/g"));
    }

    #[test]
    fn test_social_urls_in_text_cover_every_host() {
        let html = r#"<html><body>
            <p>Chat with us at https://telegram.me/rustke. Voice rooms live on
            our server (https://discord.com/invite/abc) every Friday!</p>
        </body></html>"#;
        let record = parse_event_page(html, "https://lu.ma/t", BASE);

        assert_eq!(
            record.host_social_media(),
            "https://telegram.me/rustke, https://discord.com/invite/abc"
        );
    }

    #[test]
    fn test_is_social_link_matches_hosts_only() {
        assert!(is_social_link("https://twitter.com/rustlang"));
        assert!(is_social_link("https://www.github.com/rust-lang"));
        assert!(!is_social_link("https://netflix.com/x"));
        assert!(!is_social_link("/u/someone"));
    }

    #[test]
    fn test_extract_event_links_from_listing() {
        let html = fixture("listing_web3.html");
        let links = extract_event_links(&html, BASE, 20);

        assert_eq!(
            links,
            vec![
                "https://lu.ma/e/evt-zk-proofs",
                "https://lu.ma/e/evt-crypto-night",
                "https://lu.ma/e/evt-design-jam",
            ]
        );
    }

    #[test]
    fn test_extract_event_links_respects_limit() {
        let html = fixture("listing_web3.html");
        assert_eq!(extract_event_links(&html, BASE, 2).len(), 2);
    }

    #[test]
    fn test_extract_event_links_empty_listing() {
        let html = fixture("listing_empty.html");
        assert!(extract_event_links(&html, BASE, 20).is_empty());
    }

    #[test]
    fn test_profile_social_links() {
        let html = fixture("profile_rustnairobi.html");
        let links = extract_profile_social_links(&html);
        assert_eq!(
            links,
            vec![
                "https://x.com/rustnairobi",
                "https://www.instagram.com/rustnairobi",
                "https://www.youtube.com/@rustnairobi",
            ]
        );
    }

    #[test]
    fn test_merge_social_links() {
        let merged = merge_social_links(
            "https://x.com/a, https://github.com/b",
            &["https://x.com/a".to_string(), "https://t.me/c".to_string()],
        );
        assert_eq!(merged, "https://x.com/a, https://github.com/b, https://t.me/c");
        assert_eq!(
            merge_social_links(PLACEHOLDER, &["https://t.me/c".to_string()]),
            "https://t.me/c"
        );
    }
}

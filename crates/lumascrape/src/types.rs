use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Value stored for any field the extractor could not find.
pub const PLACEHOLDER: &str = "N/A";

/// The nine fields of an [`EventRecord`], in export order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    EventName,
    DateTime,
    EventDetails,
    Location,
    OrganizerName,
    OrganizerContact,
    HostEmail,
    HostSocialMedia,
    EventUrl,
}

impl Field {
    pub const ALL: [Field; 9] = [
        Field::EventName,
        Field::DateTime,
        Field::EventDetails,
        Field::Location,
        Field::OrganizerName,
        Field::OrganizerContact,
        Field::HostEmail,
        Field::HostSocialMedia,
        Field::EventUrl,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::EventName => "event_name",
            Field::DateTime => "date_time",
            Field::EventDetails => "event_details",
            Field::Location => "location",
            Field::OrganizerName => "organizer_name",
            Field::OrganizerContact => "organizer_contact",
            Field::HostEmail => "host_email",
            Field::HostSocialMedia => "host_social_media",
            Field::EventUrl => "event_url",
        }
    }
}

impl Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One scraped event. Constructed once by [`EventRecord::from_fields`] and
/// never mutated afterwards.
///
/// Field declaration order is the JSON key order and the CSV column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    event_name: String,
    date_time: String,
    event_details: String,
    location: String,
    organizer_name: String,
    organizer_contact: String,
    host_email: String,
    host_social_media: String,
    event_url: String,
}

impl EventRecord {
    /// Normalizes a raw field map into a record. Missing or blank entries
    /// become [`PLACEHOLDER`]; content is otherwise taken verbatim.
    pub fn from_fields(mut fields: HashMap<Field, String>) -> Self {
        let mut take = |field: Field| {
            fields
                .remove(&field)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| PLACEHOLDER.to_string())
        };

        Self {
            event_name: take(Field::EventName),
            date_time: take(Field::DateTime),
            event_details: take(Field::EventDetails),
            location: take(Field::Location),
            organizer_name: take(Field::OrganizerName),
            organizer_contact: take(Field::OrganizerContact),
            host_email: take(Field::HostEmail),
            host_social_media: take(Field::HostSocialMedia),
            event_url: take(Field::EventUrl),
        }
    }

    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::EventName => &self.event_name,
            Field::DateTime => &self.date_time,
            Field::EventDetails => &self.event_details,
            Field::Location => &self.location,
            Field::OrganizerName => &self.organizer_name,
            Field::OrganizerContact => &self.organizer_contact,
            Field::HostEmail => &self.host_email,
            Field::HostSocialMedia => &self.host_social_media,
            Field::EventUrl => &self.event_url,
        }
    }

    /// True when the extractor found a real value for `field`.
    pub fn has(&self, field: Field) -> bool {
        self.get(field) != PLACEHOLDER
    }

    pub fn event_name(&self) -> &str {
        &self.event_name
    }

    pub fn date_time(&self) -> &str {
        &self.date_time
    }

    pub fn event_details(&self) -> &str {
        &self.event_details
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn organizer_name(&self) -> &str {
        &self.organizer_name
    }

    pub fn organizer_contact(&self) -> &str {
        &self.organizer_contact
    }

    pub fn host_email(&self) -> &str {
        &self.host_email
    }

    pub fn host_social_media(&self) -> &str {
        &self.host_social_media
    }

    pub fn event_url(&self) -> &str {
        &self.event_url
    }

    /// Field values in export order.
    pub fn values(&self) -> [&str; 9] {
        Field::ALL.map(|f| self.get(f))
    }
}

impl Display for EventRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "┌─ {}", self.event_name)?;
        writeln!(f, "│  When:      {}", self.date_time)?;
        writeln!(f, "│  Where:     {}", self.location)?;
        writeln!(f, "│  Organizer: {}", self.organizer_name)?;
        if self.has(Field::HostEmail) {
            writeln!(f, "│  Email:     {}", self.host_email)?;
        }
        if self.has(Field::HostSocialMedia) {
            writeln!(f, "│  Social:    {}", self.host_social_media)?;
        }
        write!(f, "└─ {}", self.event_url)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Invalid source '{0}'. Accepted values: 'explore', 'custom', 'city'")]
pub struct SourceParseError(String);

/// Where a scrape run starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Explore,
    Custom { slug: String },
    City { city: String },
}

impl Source {
    pub fn kind(&self) -> &'static str {
        match self {
            Source::Explore => "explore",
            Source::Custom { .. } => "custom",
            Source::City { .. } => "city",
        }
    }

    pub fn listing_url(&self, base_url: &str) -> String {
        let base = base_url.trim_end_matches('/');
        match self {
            Source::Explore => format!("{}/explore", base),
            Source::Custom { slug } => format!("{}/{}", base, slug.trim_matches('/')),
            Source::City { city } => format!("{}/{}", base, city_slug(city)),
        }
    }
}

impl Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Source::Explore => write!(f, "explore"),
            Source::Custom { slug } => write!(f, "custom ({})", slug),
            Source::City { city } => write!(f, "city ({})", city),
        }
    }
}

/// Only the source kind can be parsed; the seed value is attached by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Explore,
    Custom,
    City,
}

impl FromStr for SourceKind {
    type Err = SourceParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "explore" => Ok(SourceKind::Explore),
            "custom" | "slug" => Ok(SourceKind::Custom),
            "city" => Ok(SourceKind::City),
            _ => Err(SourceParseError(s.to_string())),
        }
    }
}

pub(crate) fn city_slug(city: &str) -> String {
    city.trim().to_lowercase().replace([' ', '_'], "-")
}

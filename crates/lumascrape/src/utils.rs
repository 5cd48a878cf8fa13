use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::types::{EventRecord, Field};

/// Case-insensitive keyword match against event name and details.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordFilter {
    keywords: Vec<String>,
}

impl KeywordFilter {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(|k| k.as_ref().trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    /// Parses `"crypto, web3"` style query values.
    pub fn from_comma_list(list: &str) -> Self {
        Self::new(list.split(','))
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn matches(&self, event: &EventRecord) -> bool {
        if self.keywords.is_empty() {
            return true;
        }
        let name = event.event_name().to_lowercase();
        let details = event.event_details().to_lowercase();
        self.keywords
            .iter()
            .any(|k| name.contains(k.as_str()) || details.contains(k.as_str()))
    }

    /// Keeps matching events in their original order.
    pub fn apply(&self, mut events: Vec<EventRecord>) -> Vec<EventRecord> {
        if !self.keywords.is_empty() {
            events.retain(|e| self.matches(e));
        }
        events
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocationCount {
    pub location: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventStats {
    pub total_events: usize,
    pub with_location: usize,
    pub with_organizer: usize,
    pub with_email: usize,
    pub with_social_media: usize,
    pub unique_organizers: usize,
    pub top_locations: Vec<LocationCount>,
}

impl EventStats {
    pub fn from_events(events: &[EventRecord]) -> EventStats {
        let count = |field: Field| events.iter().filter(|e| e.has(field)).count();

        let unique_organizers = events
            .iter()
            .filter(|e| e.has(Field::OrganizerName))
            .map(|e| e.organizer_name().to_lowercase())
            .collect::<HashSet<_>>()
            .len();

        let mut by_location: HashMap<&str, usize> = HashMap::new();
        for event in events.iter().filter(|e| e.has(Field::Location)) {
            *by_location.entry(event.location()).or_default() += 1;
        }
        let mut top_locations: Vec<LocationCount> = by_location
            .into_iter()
            .map(|(location, count)| LocationCount {
                location: location.to_string(),
                count,
            })
            .collect();
        top_locations.sort_by(|a, b| b.count.cmp(&a.count).then(a.location.cmp(&b.location)));
        top_locations.truncate(5);

        EventStats {
            total_events: events.len(),
            with_location: count(Field::Location),
            with_organizer: count(Field::OrganizerName),
            with_email: count(Field::HostEmail),
            with_social_media: count(Field::HostSocialMedia),
            unique_organizers,
            top_locations,
        }
    }
}

impl std::fmt::Display for EventStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\nStatistics:")?;
        writeln!(f, "  Events:              {}", self.total_events)?;
        writeln!(f, "  With location:       {}", self.with_location)?;
        writeln!(f, "  With organizer:      {}", self.with_organizer)?;
        writeln!(f, "  With email:          {}", self.with_email)?;
        writeln!(f, "  With social media:   {}", self.with_social_media)?;
        writeln!(f, "  Unique organizers:   {}", self.unique_organizers)?;
        for top in &self.top_locations {
            writeln!(f, "    {:>3} × {}", top.count, top.location)?;
        }
        Ok(())
    }
}

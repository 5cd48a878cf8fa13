use std::fs;
use std::io::{self, Write};
use std::path::Path;

use chrono::{DateTime, Utc};

use crate::types::{EventRecord, Field};

const CSV_SEPARATOR: char = ',';

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("CSV output is not valid UTF-8")]
    Encoding(#[from] std::string::FromUtf8Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Json => "application/json",
            ExportFormat::Csv => "text/csv; charset=utf-8",
        }
    }

    pub fn render(&self, events: &[EventRecord]) -> Result<String, ExportError> {
        match self {
            ExportFormat::Json => to_json(events),
            ExportFormat::Csv => to_csv(events),
        }
    }
}

/// Pretty-printed JSON array; keys follow [`Field::ALL`].
pub fn to_json(events: &[EventRecord]) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(events)?)
}

pub fn from_json(text: &str) -> Result<Vec<EventRecord>, ExportError> {
    Ok(serde_json::from_str(text)?)
}

/// Header row of field names, then one row per record.
pub fn to_csv(events: &[EventRecord]) -> Result<String, ExportError> {
    let mut buf = Vec::new();
    let header = Field::ALL.map(|f| f.as_str());
    write_row(&mut buf, &header)?;
    for event in events {
        write_row(&mut buf, &event.values())?;
    }
    Ok(String::from_utf8(buf)?)
}

fn needs_quotes(field: &str) -> bool {
    field.contains(CSV_SEPARATOR) || field.contains('"') || field.contains('\n') || field.contains('\r')
}

fn write_row<W: Write>(mut w: W, row: &[&str]) -> io::Result<()> {
    for (i, cell) in row.iter().enumerate() {
        if i > 0 {
            write!(w, "{}", CSV_SEPARATOR)?;
        }
        if needs_quotes(cell) {
            write!(w, "\"{}\"", cell.replace('"', "\"\""))?;
        } else {
            write!(w, "{}", cell)?;
        }
    }
    writeln!(w)
}

pub fn write_export(
    events: &[EventRecord],
    format: ExportFormat,
    path: impl AsRef<Path>,
) -> Result<(), ExportError> {
    let body = format.render(events)?;
    fs::write(path.as_ref(), body)?;
    log::info!(
        "Exported {} events to {}",
        events.len(),
        path.as_ref().display()
    );
    Ok(())
}

/// `{prefix}_{YYYYmmdd_HHMMSS}.{ext}`
pub fn default_filename(prefix: &str, format: ExportFormat, now: DateTime<Utc>) -> String {
    format!(
        "{}_{}.{}",
        prefix,
        now.format("%Y%m%d_%H%M%S"),
        format.extension()
    )
}

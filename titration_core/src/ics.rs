//! iCalendar (RFC 5545) export.
//!
//! Every day entry becomes an all-day `VEVENT`: `DTSTART;VALUE=DATE` on the
//! entry's date and an exclusive `DTEND` on the following day.

use crate::sink::{persist_atomically, DaySink};
use crate::{DayEntry, Result};
use chrono::{DateTime, Days, Utc};
use icalendar::{Calendar, Component, Event, EventLike};
use std::io::Write;
use std::path::PathBuf;
use uuid::Uuid;

/// Writes day entries to an `.ics` file
pub struct IcsSink {
    path: PathBuf,
    calendar_name: String,
}

impl IcsSink {
    pub fn new(path: impl Into<PathBuf>, calendar_name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            calendar_name: calendar_name.into(),
        }
    }
}

impl DaySink for IcsSink {
    fn consume(&mut self, entries: &[DayEntry]) -> Result<()> {
        let calendar = render_calendar(entries, &self.calendar_name, Utc::now());
        persist_atomically(&self.path, |w| {
            w.write_all(calendar.as_bytes())?;
            Ok(())
        })?;
        tracing::info!("Wrote {} events to {:?}", entries.len(), self.path);
        Ok(())
    }
}

/// Render a complete `VCALENDAR` document
///
/// `stamp` is written as every event's `DTSTAMP`.
pub fn render_calendar(entries: &[DayEntry], calendar_name: &str, stamp: DateTime<Utc>) -> String {
    let mut calendar = Calendar::new();
    calendar.name(calendar_name);

    for entry in entries {
        calendar.push(day_event(entry, stamp));
    }

    calendar.done().to_string()
}

fn day_event(entry: &DayEntry, stamp: DateTime<Utc>) -> Event {
    let mut event = Event::new();
    event
        .uid(&format!("{}@titrate", Uuid::new_v4()))
        .timestamp(stamp)
        .starts(entry.date)
        .summary(&entry.title)
        .description(&entry.description)
        .add_property("TRANSP", "TRANSPARENT");

    // A date at the end of the calendar has no successor to end on
    if let Some(end) = entry.date.checked_add_days(Days::new(1)) {
        event.ends(end);
    }

    event.done()
}

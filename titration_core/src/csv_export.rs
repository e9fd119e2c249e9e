//! CSV export of an expanded schedule.

use crate::sink::{persist_atomically, DaySink};
use crate::{DayEntry, Result};
use std::path::PathBuf;

const HEADER: [&str; 4] = ["date", "kind", "title", "description"];

/// A row in the CSV output
#[derive(Debug, serde::Serialize)]
struct CsvRow<'a> {
    date: String,
    kind: &'static str,
    title: &'a str,
    description: &'a str,
}

impl<'a> From<&'a DayEntry> for CsvRow<'a> {
    fn from(entry: &'a DayEntry) -> Self {
        CsvRow {
            date: entry.date.format("%Y-%m-%d").to_string(),
            kind: entry.kind.as_str(),
            title: &entry.title,
            description: &entry.description,
        }
    }
}

/// Writes day entries to a CSV file with a header row
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DaySink for CsvSink {
    fn consume(&mut self, entries: &[DayEntry]) -> Result<()> {
        persist_atomically(&self.path, |w| {
            // Header written by hand so an empty export still carries it
            let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(w);
            writer.write_record(HEADER)?;
            for entry in entries {
                writer.serialize(CsvRow::from(entry))?;
            }
            writer.flush()?;
            Ok(())
        })?;
        tracing::info!("Wrote {} rows to {:?}", entries.len(), self.path);
        Ok(())
    }
}

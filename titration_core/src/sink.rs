//! Day-sequence consumers.
//!
//! The expander hands its ordered, contiguous day entries to a [`DaySink`],
//! which owns serialization and persistence. The locked read and atomic
//! write helpers here are shared by the file sinks and the delay file.

use crate::{DayEntry, Error, Result};
use fs2::FileExt;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Consumer of an expanded schedule
pub trait DaySink {
    /// Persist the entries; they arrive sorted by date with no gaps
    fn consume(&mut self, entries: &[DayEntry]) -> Result<()>;
}

/// In-memory sink, used for previews and tests
impl DaySink for Vec<DayEntry> {
    fn consume(&mut self, entries: &[DayEntry]) -> Result<()> {
        self.extend_from_slice(entries);
        Ok(())
    }
}

/// Write a file by filling a locked temp file next to it and renaming it into
/// place, so readers never observe a half-written export
pub(crate) fn persist_atomically<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut dyn Write) -> Result<()>,
{
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let temp = NamedTempFile::new_in(parent)?;
    temp.as_file().lock_exclusive()?;

    {
        let mut writer = std::io::BufWriter::new(temp.as_file());
        write(&mut writer)?;
        writer.flush()?;
    }

    temp.as_file().sync_all()?;
    temp.as_file().unlock()?;
    temp.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}

/// Read a whole file under a shared lock
///
/// Returns `None` when the file does not exist.
pub(crate) fn read_locked(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }

    let file = File::open(path)?;
    file.lock_shared()?;

    let mut contents = String::new();
    let read = std::io::BufReader::new(&file).read_to_string(&mut contents);
    let unlocked = file.unlock();
    read?;
    unlocked?;

    Ok(Some(contents))
}

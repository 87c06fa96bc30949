//! Saver for the delimited-record encoding.
//!
//! Change logs are append-only on disk too: a save appends the records
//! created in the current session ([`Scroll::new_records`]) to the existing
//! log file and never rewrites what was loaded. Writing a complete new file
//! (metadata first, then every record in insertion order) is only for logs
//! that do not exist yet, e.g. the output of the import generator.

use std::fmt;
use std::io::Write as IoWrite;
use std::path::Path;

use crate::model::ChangeRecord;

use super::store::Scroll;

// ---------------------------------------------------------------------------
// Formatting
// ---------------------------------------------------------------------------

/// Format one record as a delimited-encoding line (without newline).
#[must_use]
pub fn format_record(record: &ChangeRecord) -> String {
    format!(
        "{}, {}, {}, {}, {}, {}",
        record.parent(),
        record.id(),
        record.author(),
        record.timestamp(),
        record.target(),
        record.source()
    )
}

/// Format one metadata entry as a `#META` line (without newline).
#[must_use]
pub fn format_meta(field: &str, value: &str) -> String {
    format!("#META {field}=\"{value}\"")
}

// ---------------------------------------------------------------------------
// Saving
// ---------------------------------------------------------------------------

/// Append this session's new records to an existing log file, in id order.
/// Returns how many records were written.
///
/// # Errors
/// I/O failure opening or writing the file.
pub fn append_new_records(scroll: &Scroll, path: &Path) -> Result<usize, SaveError> {
    let fresh = scroll.new_records();
    if fresh.is_empty() {
        return Ok(0);
    }
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    for record in &fresh {
        writeln!(file, "{}", format_record(record))?;
    }
    tracing::debug!(path = %path.display(), appended = fresh.len(), "saved new records");
    Ok(fresh.len())
}

/// Write a complete log file: metadata entries, then every record in
/// insertion order. Truncates any existing file.
///
/// # Errors
/// I/O failure creating or writing the file.
pub fn write_scroll(scroll: &Scroll, path: &Path) -> Result<(), SaveError> {
    let mut out = String::new();
    for (field, values) in scroll.meta().iter() {
        for value in values {
            out.push_str(&format_meta(field, value));
            out.push('\n');
        }
    }
    for record in scroll.iter() {
        out.push_str(&format_record(record));
        out.push('\n');
    }
    std::fs::write(path, out)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// SaveError
// ---------------------------------------------------------------------------

/// A save failed.
#[derive(Debug)]
pub enum SaveError {
    /// The log file could not be opened or written.
    Io(std::io::Error),
}

impl fmt::Display for SaveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(
                f,
                "cannot write change log: {e}\n  To fix: check file permissions and disk space."
            ),
        }
    }
}

impl std::error::Error for SaveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for SaveError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

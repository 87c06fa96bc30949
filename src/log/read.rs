//! Loader for the delimited-record encoding.
//!
//! One record per line, six comma-separated fields in order:
//!
//! ```text
//! parent, id, author, timestamp, target, source
//! ```
//!
//! The split stops after five commas, so the source field may itself
//! contain commas. Lines beginning with `#` are comments and legal
//! anywhere; `#META name="value"` lines define repeatable metadata entries
//! and are only legal before the first data record. Blank lines are
//! skipped.
//!
//! Loading is a single sequential pass feeding
//! [`Scroll::add_change_event`] in file order, so every record's parent
//! must already have been seen (or be the root sentinel). A violation is a
//! structural error that aborts the load — a partially loaded store cannot
//! be trusted.

use std::fmt;
use std::path::Path;

use regex::Regex;

use crate::model::{ChangeId, ChangeRecord, IdError, parse_timestamp};

use super::store::{Scroll, StoreError};

/// Fields per data record.
const NFIELDS: usize = 6;

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load a change log from a file in the delimited-record encoding.
///
/// # Errors
/// I/O failure, or any [`LoadError`] from [`parse_scroll`].
pub fn load_scroll(path: &Path) -> Result<Scroll, LoadError> {
    let text = std::fs::read_to_string(path)?;
    let scroll = parse_scroll(&text)?;
    tracing::debug!(
        path = %path.display(),
        records = scroll.len(),
        tips = scroll.tips().len(),
        "loaded change log"
    );
    Ok(scroll)
}

/// Parse a complete change log from text in the delimited-record encoding.
///
/// # Errors
/// Any [`LoadError`]; the line number in the error is 1-based.
pub fn parse_scroll(input: &str) -> Result<Scroll, LoadError> {
    // #META dc.author="sjd"
    let meta_re = Regex::new(r#"^#META\s+([^\s=]+)\s*=\s*"([^"]*)""#)
        .unwrap_or_else(|_| unreachable!("static pattern"));

    let mut scroll = Scroll::new();
    for (lineno, line) in input.lines().enumerate() {
        let lineno = lineno + 1;
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }
        if let Some(rest) = line.strip_prefix('#') {
            if rest.starts_with("META") {
                let caps = meta_re.captures(line).ok_or_else(|| LoadError::Meta {
                    line: lineno,
                    text: line.to_owned(),
                })?;
                scroll
                    .add_meta(&caps[1], &caps[2])
                    .map_err(|source| LoadError::Store {
                        line: lineno,
                        source,
                    })?;
            }
            // Plain comments are allowed anywhere.
            continue;
        }
        let record = parse_record_line(line, lineno)?;
        scroll
            .add_change_event(record)
            .map_err(|source| LoadError::Store {
                line: lineno,
                source,
            })?;
    }
    Ok(scroll)
}

/// Parse one data record line.
fn parse_record_line(line: &str, lineno: usize) -> Result<ChangeRecord, LoadError> {
    let fields: Vec<&str> = line.splitn(NFIELDS, ',').map(str::trim).collect();
    if fields.len() != NFIELDS {
        return Err(LoadError::FieldCount {
            line: lineno,
            found: fields.len(),
        });
    }
    let parent = if fields[0].is_empty() {
        ChangeId::root()
    } else {
        ChangeId::new(fields[0]).map_err(|source| LoadError::Id {
            line: lineno,
            source,
        })?
    };
    let id = ChangeId::new(fields[1]).map_err(|source| LoadError::Id {
        line: lineno,
        source,
    })?;
    Ok(ChangeRecord::loaded(
        parent,
        id,
        fields[2],
        parse_timestamp(fields[3]),
        fields[4],
        fields[5],
    ))
}

// ---------------------------------------------------------------------------
// LoadError
// ---------------------------------------------------------------------------

/// Errors raised while loading the delimited-record encoding.
#[derive(Debug)]
pub enum LoadError {
    /// The file could not be read.
    Io(std::io::Error),

    /// A data record did not have exactly six fields.
    FieldCount {
        /// 1-based line number.
        line: usize,
        /// How many fields were found.
        found: usize,
    },

    /// A parent or change id failed validation.
    Id {
        /// 1-based line number.
        line: usize,
        /// The underlying id error.
        source: IdError,
    },

    /// A `#META` line did not match `#META name="value"`.
    Meta {
        /// 1-based line number.
        line: usize,
        /// The malformed line.
        text: String,
    },

    /// The store rejected a record or metadata entry (structural error).
    Store {
        /// 1-based line number.
        line: usize,
        /// The underlying store error.
        source: StoreError,
    },
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "cannot read change log: {e}"),
            Self::FieldCount { line, found } => {
                write!(
                    f,
                    "line {line}: got {found} fields, expected {NFIELDS} (parent, id, author, timestamp, target, source)"
                )
            }
            Self::Id { line, source } => write!(f, "line {line}: {source}"),
            Self::Meta { line, text } => {
                write!(
                    f,
                    "line {line}: malformed metadata record: {text}\n  Expected '#META name=\"value\"'."
                )
            }
            Self::Store { line, source } => write!(f, "line {line}: {source}"),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Id { source, .. } => Some(source),
            Self::Store { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<std::io::Error> for LoadError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"#META dc.author="sjd"
#META dc.title="Example document"
#
0_0_0, c1, sjd, 1629504349, chars:0:0, text:"<p>A new hope.</p>"
c1,    c2, sjd, 1629650250, END:, text:"<p>Documents that resemble files.</p>"
c2,    c3, sjd, 1629650251, match:\bfiles\b, text:"flies"
"#;

    fn id(s: &str) -> ChangeId {
        ChangeId::new(s).unwrap()
    }

    #[test]
    fn parses_the_sample_log() {
        let scroll = parse_scroll(SAMPLE).unwrap();
        assert_eq!(scroll.len(), 3);
        assert_eq!(scroll.meta().get("dc.author").unwrap(), ["sjd".to_owned()]);
        assert_eq!(scroll.tips().len(), 1);
        assert!(scroll.tips().contains(&id("c3")));
    }

    #[test]
    fn loaded_records_are_flagged_loaded() {
        let scroll = parse_scroll(SAMPLE).unwrap();
        assert!(scroll.iter().all(ChangeRecord::was_loaded));
        assert!(scroll.new_records().is_empty());
    }

    #[test]
    fn sample_replays_end_to_end() {
        let scroll = parse_scroll(SAMPLE).unwrap();
        let doc = scroll.reconstruct_document(&id("c3")).unwrap();
        assert_eq!(
            doc,
            "<p>A new hope.</p><p>Documents that resemble flies.</p>"
        );
    }

    #[test]
    fn source_field_may_contain_commas() {
        let log = "0_0_0, c1, sjd, 0, chars:0:0, text:\"one, two, three\"\n";
        let scroll = parse_scroll(log).unwrap();
        assert_eq!(
            scroll.reconstruct_document(&id("c1")).unwrap(),
            "one, two, three"
        );
    }

    #[test]
    fn empty_parent_field_means_root() {
        let log = ", c1, sjd, 0, END:, text:\"x\"\n";
        let scroll = parse_scroll(log).unwrap();
        assert!(scroll.get(&id("c1")).unwrap().parent().is_root());
    }

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let log = "# a comment\n\n0_0_0, c1, sjd, 0, END:, text:\"x\"\n# trailing\n";
        assert_eq!(parse_scroll(log).unwrap().len(), 1);
    }

    #[test]
    fn unparseable_timestamp_gets_sentinel() {
        let log = "0_0_0, c1, sjd, someday, END:, text:\"x\"\n";
        let scroll = parse_scroll(log).unwrap();
        assert_eq!(
            scroll.get(&id("c1")).unwrap().timestamp(),
            crate::model::NULL_EPOCH_SECS
        );
    }

    #[test]
    fn short_record_is_field_count_error() {
        let log = "0_0_0, c1, sjd, 0, END:\n";
        assert!(matches!(
            parse_scroll(log),
            Err(LoadError::FieldCount { line: 1, found: 5 })
        ));
    }

    #[test]
    fn orphan_record_aborts_load_with_line() {
        let log = "0_0_0, c1, sjd, 0, END:, text:\"x\"\nghost, c2, sjd, 0, END:, text:\"y\"\n";
        match parse_scroll(log) {
            Err(LoadError::Store {
                line: 2,
                source: StoreError::OrphanParent { .. },
            }) => {}
            other => panic!("expected orphan at line 2, got {other:?}"),
        }
    }

    #[test]
    fn malformed_meta_is_rejected() {
        let log = "#META not-an-assignment\n";
        assert!(matches!(
            parse_scroll(log),
            Err(LoadError::Meta { line: 1, .. })
        ));
    }

    #[test]
    fn meta_after_data_aborts_load() {
        let log = "0_0_0, c1, sjd, 0, END:, text:\"x\"\n#META dc.title=\"late\"\n";
        match parse_scroll(log) {
            Err(LoadError::Store {
                line: 2,
                source: StoreError::MetaAfterChanges { .. },
            }) => {}
            other => panic!("expected meta-after-changes, got {other:?}"),
        }
    }

    #[test]
    fn load_scroll_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.scroll");
        std::fs::write(&path, SAMPLE).unwrap();
        let scroll = load_scroll(&path).unwrap();
        assert_eq!(scroll.len(), 3);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_scroll(Path::new("/nonexistent/doc.scroll")).unwrap_err();
        assert!(matches!(err, LoadError::Io(_)));
    }
}

//! One-shot import: turn an XML document into a change log.
//!
//! Walks the document's token stream and emits one append per structural
//! token — start tag, text run, CDATA section, end tag — each change based
//! on the previous one, so the result is a topologically valid linear chain
//! that replays back to the serialized document text. Mainly useful for
//! seeding a change log from existing material (and for exercising replay
//! on something bigger than hand-written samples).
//!
//! ```text
//! <p>Hi <b>there</b></p>
//!   → END: text:"<p>"      (root ← c1)
//!   → END: text:"Hi "      (c1 ← c2)
//!   → END: text:"<b>"      (c2 ← c3)
//!   → END: text:"there"    (c3 ← c4)
//!   → END: text:"</b>"     (c4 ← c5)
//!   → END: text:"</p>"     (c5 ← c6)
//! ```
//!
//! Comments, processing instructions and the XML declaration carry no
//! document text and are skipped.

use std::fmt;
use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::log::store::{Scroll, StoreError};
use crate::model::source::quote_literal;
use crate::model::{ChangeId, ChangeRecord, IdError, Minter};

// ---------------------------------------------------------------------------
// Import
// ---------------------------------------------------------------------------

/// Import an XML file as a change log.
///
/// # Errors
/// I/O failure, or any [`ImportError`] from [`import_xml`].
pub fn import_xml_file(
    path: &Path,
    author: &str,
    subseq: u64,
    timestamp: i64,
) -> Result<Scroll, ImportError> {
    let text = std::fs::read_to_string(path)?;
    import_xml(&text, author, subseq, timestamp)
}

/// Convert XML text into a linear chain of change records, stamped with
/// `author` and `timestamp` and fresh sequential ids.
///
/// # Errors
/// Malformed XML, an author unusable as an id component, or (unreachable
/// for a linear chain) a store rejection.
pub fn import_xml(
    input: &str,
    author: &str,
    subseq: u64,
    timestamp: i64,
) -> Result<Scroll, ImportError> {
    let mut minter = Minter::new(author, subseq)?;
    let mut scroll = Scroll::new();
    let mut last = ChangeId::root();
    let mut reader = Reader::from_str(input);

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let text = start_tag(&e, false)?;
                last = append(&mut scroll, &mut minter, &last, author, timestamp, &text)?;
            }
            Event::Empty(e) => {
                let text = start_tag(&e, true)?;
                last = append(&mut scroll, &mut minter, &last, author, timestamp, &text)?;
            }
            Event::End(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                let text = format!("</{name}>");
                last = append(&mut scroll, &mut minter, &last, author, timestamp, &text)?;
            }
            Event::Text(e) => {
                // Whitespace-only runs between tags are layout, not content.
                let raw = String::from_utf8_lossy(e.as_ref()).into_owned();
                if !raw.trim().is_empty() {
                    last = append(&mut scroll, &mut minter, &last, author, timestamp, &raw)?;
                }
            }
            Event::CData(e) => {
                let inner = String::from_utf8_lossy(e.as_ref()).into_owned();
                let text = format!("<![CDATA[{inner}]]>");
                last = append(&mut scroll, &mut minter, &last, author, timestamp, &text)?;
            }
            Event::Decl(_) | Event::Comment(_) | Event::PI(_) | Event::DocType(_) => {}
            Event::Eof => break,
        }
    }
    tracing::debug!(records = scroll.len(), "imported document as change chain");
    Ok(scroll)
}

/// Reconstruct a start tag's text from its parsed form.
fn start_tag(e: &BytesStart<'_>, self_closing: bool) -> Result<String, ImportError> {
    let mut out = String::from("<");
    out.push_str(&String::from_utf8_lossy(e.name().as_ref()));
    for attr in e.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        out.push(' ');
        out.push_str(&String::from_utf8_lossy(attr.key.as_ref()));
        out.push_str("=\"");
        out.push_str(&String::from_utf8_lossy(&attr.value));
        out.push('"');
    }
    out.push_str(if self_closing { "/>" } else { ">" });
    Ok(out)
}

/// Append one text run as a change record and return its id.
fn append(
    scroll: &mut Scroll,
    minter: &mut Minter,
    last: &ChangeId,
    author: &str,
    timestamp: i64,
    text: &str,
) -> Result<ChangeId, ImportError> {
    let id = minter.next_id();
    scroll.add_change_event(ChangeRecord::new(
        last.clone(),
        id.clone(),
        author,
        timestamp,
        "END:",
        format!("text:{}", quote_literal(text)),
    ))?;
    Ok(id)
}

// ---------------------------------------------------------------------------
// ImportError
// ---------------------------------------------------------------------------

/// An import failed.
#[derive(Debug)]
pub enum ImportError {
    /// The input file could not be read.
    Io(std::io::Error),

    /// The input is not well-formed XML.
    Xml(quick_xml::Error),

    /// The configured author is unusable as an id component.
    Id(IdError),

    /// The generated chain was rejected by the store.
    Store(StoreError),
}

impl fmt::Display for ImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "cannot read input document: {e}"),
            Self::Xml(e) => write!(f, "input is not well-formed XML: {e}"),
            Self::Id(e) => write!(f, "cannot mint change ids: {e}"),
            Self::Store(e) => write!(f, "generated chain was rejected: {e}"),
        }
    }
}

impl std::error::Error for ImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Xml(e) => Some(e),
            Self::Id(e) => Some(e),
            Self::Store(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for ImportError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<quick_xml::Error> for ImportError {
    fn from(e: quick_xml::Error) -> Self {
        Self::Xml(e)
    }
}

impl From<IdError> for ImportError {
    fn from(e: IdError) -> Self {
        Self::Id(e)
    }
}

impl From<StoreError> for ImportError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

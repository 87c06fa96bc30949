//! The structural (tag-based) encoding of a change log.
//!
//! Semantically equivalent to the delimited-record encoding: a `<scroll>`
//! document holding metadata entries followed by the change sequence, each
//! change carrying `base`, `chId`, `user` and `date` attributes with the
//! target and source specifications as nested elements:
//!
//! ```xml
//! <scroll>
//!   <meta name="dc.author">sjd</meta>
//!   <change base="0_0_0" chId="sjd_1" user="sjd" date="1629504349">
//!     <target>chars:0:0</target>
//!     <source>text:"&lt;p&gt;A new hope.&lt;/p&gt;"</source>
//!   </change>
//! </scroll>
//! ```
//!
//! Parsing produces the same logical record stream the delimited loader
//! feeds into [`Scroll::add_change_event`], with the same in-order parent
//! requirement.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::model::{ChangeId, ChangeRecord, IdError, parse_timestamp};

use super::store::{Scroll, StoreError};

// ---------------------------------------------------------------------------
// XML document shape
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename = "scroll")]
struct ScrollXml {
    #[serde(rename = "meta", default, skip_serializing_if = "Vec::is_empty")]
    meta: Vec<MetaXml>,

    #[serde(rename = "change", default, skip_serializing_if = "Vec::is_empty")]
    changes: Vec<ChangeXml>,
}

#[derive(Debug, Serialize, Deserialize)]
struct MetaXml {
    #[serde(rename = "@name")]
    name: String,

    #[serde(rename = "$text", default)]
    value: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChangeXml {
    #[serde(rename = "@base")]
    base: String,

    #[serde(rename = "@chId")]
    ch_id: String,

    #[serde(rename = "@user")]
    user: String,

    #[serde(rename = "@date")]
    date: String,

    target: String,

    source: String,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load a change log from a file in the structural encoding.
///
/// # Errors
/// I/O failure, or any [`XmlError`] from [`parse_scroll_xml`].
pub fn load_scroll_xml(path: &Path) -> Result<Scroll, XmlError> {
    let text = std::fs::read_to_string(path)?;
    parse_scroll_xml(&text)
}

/// Parse a change log from text in the structural encoding.
///
/// # Errors
/// Malformed XML, invalid ids, or structural store errors (orphans,
/// duplicates), with the 1-based change index for context.
pub fn parse_scroll_xml(input: &str) -> Result<Scroll, XmlError> {
    let doc: ScrollXml = quick_xml::de::from_str(input)?;
    let mut scroll = Scroll::new();
    for entry in &doc.meta {
        scroll
            .add_meta(&entry.name, entry.value.trim())
            .map_err(|source| XmlError::Store { record: 0, source })?;
    }
    for (i, change) in doc.changes.iter().enumerate() {
        let record = i + 1;
        let parent = if change.base.is_empty() {
            ChangeId::root()
        } else {
            ChangeId::new(&change.base).map_err(|source| XmlError::Id { record, source })?
        };
        let id = ChangeId::new(&change.ch_id).map_err(|source| XmlError::Id { record, source })?;
        scroll
            .add_change_event(ChangeRecord::loaded(
                parent,
                id,
                &change.user,
                parse_timestamp(&change.date),
                change.target.trim(),
                change.source.trim(),
            ))
            .map_err(|source| XmlError::Store { record, source })?;
    }
    Ok(scroll)
}

// ---------------------------------------------------------------------------
// Serializing
// ---------------------------------------------------------------------------

/// Serialize a complete store to the structural encoding.
///
/// # Errors
/// Serialization failure (should not happen for well-formed stores).
pub fn scroll_to_xml(scroll: &Scroll) -> Result<String, XmlError> {
    let doc = ScrollXml {
        meta: scroll
            .meta()
            .iter()
            .flat_map(|(name, values)| {
                values.iter().map(move |v| MetaXml {
                    name: name.to_owned(),
                    value: v.clone(),
                })
            })
            .collect(),
        changes: scroll
            .iter()
            .map(|r| ChangeXml {
                base: r.parent().to_string(),
                ch_id: r.id().to_string(),
                user: r.author().to_owned(),
                date: r.timestamp().to_string(),
                target: r.target().to_owned(),
                source: r.source().to_owned(),
            })
            .collect(),
    };
    let body = quick_xml::se::to_string(&doc)?;
    Ok(format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{body}"))
}

/// Write a complete store to a file in the structural encoding.
///
/// # Errors
/// Serialization or I/O failure.
pub fn write_scroll_xml(scroll: &Scroll, path: &Path) -> Result<(), XmlError> {
    let text = scroll_to_xml(scroll)?;
    std::fs::write(path, text)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// XmlError
// ---------------------------------------------------------------------------

/// Errors raised by the structural encoding.
#[derive(Debug)]
pub enum XmlError {
    /// The file could not be read or written.
    Io(std::io::Error),

    /// The document is not well-formed or does not match the scroll shape.
    Xml(quick_xml::DeError),

    /// A `base` or `chId` attribute failed id validation.
    Id {
        /// 1-based index of the change element.
        record: usize,
        /// The underlying id error.
        source: IdError,
    },

    /// The store rejected a record or metadata entry (structural error).
    Store {
        /// 1-based index of the change element (0 for metadata).
        record: usize,
        /// The underlying store error.
        source: StoreError,
    },
}

impl fmt::Display for XmlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "cannot read or write change log: {e}"),
            Self::Xml(e) => write!(f, "malformed scroll document: {e}"),
            Self::Id { record, source } => write!(f, "change #{record}: {source}"),
            Self::Store { record, source } => {
                if *record == 0 {
                    write!(f, "metadata: {source}")
                } else {
                    write!(f, "change #{record}: {source}")
                }
            }
        }
    }
}

impl std::error::Error for XmlError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Xml(e) => Some(e),
            Self::Id { source, .. } => Some(source),
            Self::Store { source, .. } => Some(source),
        }
    }
}

impl From<std::io::Error> for XmlError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<quick_xml::DeError> for XmlError {
    fn from(e: quick_xml::DeError) -> Self {
        Self::Xml(e)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<scroll>
  <meta name="dc.author">sjd</meta>
  <meta name="dc.title">Example document</meta>
  <change base="0_0_0" chId="c1" user="sjd" date="1629504349">
    <target>chars:0:0</target>
    <source>text:"&lt;p&gt;A new hope.&lt;/p&gt;"</source>
  </change>
  <change base="c1" chId="c2" user="sjd" date="1629650250">
    <target>END:</target>
    <source>text:"&lt;p&gt;More files.&lt;/p&gt;"</source>
  </change>
</scroll>
"#;

    fn id(s: &str) -> ChangeId {
        ChangeId::new(s).unwrap()
    }

    #[test]
    fn parses_the_sample_document() {
        let scroll = parse_scroll_xml(SAMPLE).unwrap();
        assert_eq!(scroll.len(), 2);
        assert_eq!(scroll.meta().get("dc.author").unwrap(), ["sjd".to_owned()]);
        assert!(scroll.tips().contains(&id("c2")));
    }

    #[test]
    fn xml_and_delimited_loads_agree() {
        let xml = parse_scroll_xml(SAMPLE).unwrap();
        let delimited = crate::log::read::parse_scroll(concat!(
            "#META dc.author=\"sjd\"\n",
            "#META dc.title=\"Example document\"\n",
            "0_0_0, c1, sjd, 1629504349, chars:0:0, text:\"<p>A new hope.</p>\"\n",
            "c1, c2, sjd, 1629650250, END:, text:\"<p>More files.</p>\"\n",
        ))
        .unwrap();
        assert_eq!(
            xml.reconstruct_document(&id("c2")).unwrap(),
            delimited.reconstruct_document(&id("c2")).unwrap()
        );
        assert_eq!(xml.meta(), delimited.meta());
    }

    #[test]
    fn reconstructs_from_xml_load() {
        let scroll = parse_scroll_xml(SAMPLE).unwrap();
        assert_eq!(
            scroll.reconstruct_document(&id("c2")).unwrap(),
            "<p>A new hope.</p><p>More files.</p>"
        );
    }

    #[test]
    fn round_trips_through_serializer() {
        let scroll = parse_scroll_xml(SAMPLE).unwrap();
        let text = scroll_to_xml(&scroll).unwrap();
        let back = parse_scroll_xml(&text).unwrap();
        assert_eq!(back.len(), scroll.len());
        assert_eq!(back.meta(), scroll.meta());
        assert_eq!(
            back.reconstruct_document(&id("c2")).unwrap(),
            scroll.reconstruct_document(&id("c2")).unwrap()
        );
    }

    #[test]
    fn orphan_in_xml_aborts_load() {
        let doc = r#"<scroll>
  <change base="ghost" chId="c1" user="sjd" date="0">
    <target>END:</target>
    <source>text:"x"</source>
  </change>
</scroll>"#;
        match parse_scroll_xml(doc) {
            Err(XmlError::Store {
                record: 1,
                source: StoreError::OrphanParent { .. },
            }) => {}
            other => panic!("expected orphan rejection, got {other:?}"),
        }
    }

    #[test]
    fn malformed_xml_is_rejected() {
        assert!(matches!(
            parse_scroll_xml("<scroll><change>"),
            Err(XmlError::Xml(_))
        ));
    }

    #[test]
    fn bad_change_id_is_rejected_with_index() {
        let doc = r#"<scroll>
  <change base="0_0_0" chId="has space" user="sjd" date="0">
    <target>END:</target>
    <source>text:"x"</source>
  </change>
</scroll>"#;
        assert!(matches!(
            parse_scroll_xml(doc),
            Err(XmlError::Id { record: 1, .. })
        ));
    }

    #[test]
    fn file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.xml");
        let scroll = parse_scroll_xml(SAMPLE).unwrap();
        write_scroll_xml(&scroll, &path).unwrap();
        let back = load_scroll_xml(&path).unwrap();
        assert_eq!(back.len(), 2);
    }
}

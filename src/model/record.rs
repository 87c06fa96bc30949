//! Change records — the immutable unit of the log.
//!
//! A [`ChangeRecord`] captures one edit: which version it is based on, its
//! own id, who made it and when, and a target+source pair describing the
//! edit. Records are never modified after construction; correcting a mistake
//! means appending a new record.
//!
//! [`ChangeRecord::apply`] is a pure function from the prior document text
//! to the next one. A resolution failure is reported (with the offending
//! record and the document snapshot) and surfaced as an `Err` — visible in
//! the type, not a sentinel to compare against — so one malformed edit
//! cannot prevent inspecting the rest of the log.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use super::ids::ChangeId;
use super::source::SourceSpec;
use super::target::{ResolveError, TargetSpec, char_to_byte};

/// Timestamp stamped on records whose date could not be parsed at all.
pub const NULL_EPOCH_SECS: i64 = -307_614_600;

// ---------------------------------------------------------------------------
// ChangeRecord
// ---------------------------------------------------------------------------

/// A single change, made to a given prior version, replacing one contiguous
/// (possibly empty) character span of it.
///
/// Target and source are kept in their scheme-prefixed string form; they are
/// parsed and resolved at apply time, against each intermediate document
/// state, so a malformed spec degrades that one replay rather than the load.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChangeRecord {
    parent: ChangeId,
    id: ChangeId,
    author: String,
    timestamp: i64,
    target: String,
    source: String,
    loaded: bool,
}

impl ChangeRecord {
    /// Create a record for a change made in the current session
    /// (`was_loaded() == false`; the save step will append it).
    #[must_use]
    pub fn new(
        parent: ChangeId,
        id: ChangeId,
        author: impl Into<String>,
        timestamp: i64,
        target: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            parent,
            id,
            author: author.into(),
            timestamp,
            target: target.into(),
            source: source.into(),
            loaded: false,
        }
    }

    /// Create a record read from persisted storage
    /// (`was_loaded() == true`; the save step will skip it).
    #[must_use]
    pub fn loaded(
        parent: ChangeId,
        id: ChangeId,
        author: impl Into<String>,
        timestamp: i64,
        target: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        let mut rec = Self::new(parent, id, author, timestamp, target, source);
        rec.loaded = true;
        rec
    }

    /// The version this change is based on (root sentinel for the first).
    #[must_use]
    pub const fn parent(&self) -> &ChangeId {
        &self.parent
    }

    /// This change's own id — also the id of the version it produces.
    #[must_use]
    pub const fn id(&self) -> &ChangeId {
        &self.id
    }

    /// The authoring principal.
    #[must_use]
    pub fn author(&self) -> &str {
        &self.author
    }

    /// Seconds since the Unix epoch ([`NULL_EPOCH_SECS`] if unparseable).
    #[must_use]
    pub const fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// The scheme-prefixed target specification.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// The scheme-prefixed source specification.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Whether this record came from persisted storage (as opposed to being
    /// created in the current session). Decides what a save appends.
    #[must_use]
    pub const fn was_loaded(&self) -> bool {
        self.loaded
    }

    /// Apply this edit to the prior document text, returning the next one.
    ///
    /// Pure: no side effects beyond the returned string and, on failure, an
    /// error event carrying the record and the document snapshot.
    ///
    /// # Errors
    /// Any [`ResolveError`] from the target or source specification.
    pub fn apply(&self, doc: &str) -> Result<String, ResolveError> {
        let result = self.apply_inner(doc);
        if let Err(e) = &result {
            tracing::error!(
                change = %self.id,
                target = %self.target,
                source = %self.source,
                snapshot = doc,
                "edit failed to apply: {e}"
            );
        }
        result
    }

    fn apply_inner(&self, doc: &str) -> Result<String, ResolveError> {
        let (start, end) = TargetSpec::parse(&self.target)?.resolve(doc)?;
        let replacement = SourceSpec::parse(&self.source)?.resolve(doc)?;
        let (b0, b1) = (char_to_byte(doc, start), char_to_byte(doc, end));
        let mut next = String::with_capacity(doc.len() - (b1 - b0) + replacement.len());
        next.push_str(&doc[..b0]);
        next.push_str(&replacement);
        next.push_str(&doc[b1..]);
        Ok(next)
    }
}

// ---------------------------------------------------------------------------
// Timestamp parsing
// ---------------------------------------------------------------------------

/// Parse a record timestamp, accepting several textual encodings.
///
/// Tried in order: integer seconds, fractional seconds, RFC 3339, RFC 2822,
/// `YYYY-MM-DD HH:MM:SS`, bare `YYYY-MM-DD`. Total failure falls back to
/// [`NULL_EPOCH_SECS`] rather than failing the record.
#[must_use]
pub fn parse_timestamp(s: &str) -> i64 {
    let s = s.trim();
    if s.is_empty() {
        return NULL_EPOCH_SECS;
    }
    if let Ok(secs) = s.parse::<i64>() {
        return secs;
    }
    if let Ok(secs) = s.parse::<f64>() {
        if secs.is_finite() {
            #[allow(clippy::cast_possible_truncation)]
            return secs.trunc() as i64;
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.timestamp();
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return dt.timestamp();
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return dt.and_utc().timestamp();
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(dt) = d.and_hms_opt(0, 0, 0) {
            return dt.and_utc().timestamp();
        }
    }
    tracing::warn!(value = s, "unparseable timestamp, using null sentinel");
    NULL_EPOCH_SECS
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

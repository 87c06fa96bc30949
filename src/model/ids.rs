//! Change identifiers.
//!
//! A [`ChangeId`] is the globally-unique token naming one change — and,
//! because a version is identical with the change that created it, one
//! version. Ids are minted once, at record-creation time, and never reused.
//!
//! The canonical string form is `author_sequence[_subsequence]`, with the
//! sequence in lowercase hexadecimal. The subsequence is a discriminator for
//! disconnected authors minting ids without coordination; it is printed only
//! when nonzero. Ids read from a change log are kept verbatim — any
//! non-empty token free of field-separator characters is a legal id, so
//! hand-written logs can use short names like `c1`.
//!
//! The reserved **root sentinel** `0_0_0` means "no prior version". It is a
//! legal parent reference but is never stored as a record's own id.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// String form of the root sentinel.
pub const ROOT_CHANGE_ID: &str = "0_0_0";

// ---------------------------------------------------------------------------
// ChangeId
// ---------------------------------------------------------------------------

/// A validated change identifier.
///
/// Opaque and totally ordered (lexicographically), so listings and saved
/// output are deterministic. Use [`ChangeId::mint`] or a [`Minter`] to
/// construct structured ids; [`ChangeId::new`] accepts any token already
/// present in a log.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChangeId(String);

impl ChangeId {
    /// Create a `ChangeId` from an existing token, validating format.
    ///
    /// # Errors
    /// Returns an error if the token is empty or contains a character that
    /// would corrupt the delimited encoding (comma, quote, whitespace, `#`).
    pub fn new(s: &str) -> Result<Self, IdError> {
        Self::validate(s)?;
        Ok(Self(s.to_owned()))
    }

    /// Mint a structured id: `author_sequence[_subsequence]`, sequence in
    /// lowercase hex, subsequence (decimal) omitted when zero.
    ///
    /// # Errors
    /// Returns an error if the author is empty or contains `_` or a
    /// separator character.
    pub fn mint(author: &str, seq: u64, subseq: u64) -> Result<Self, IdError> {
        if author.is_empty() {
            return Err(IdError {
                value: author.to_owned(),
                reason: "author must not be empty".to_owned(),
            });
        }
        if author.contains('_') {
            return Err(IdError {
                value: author.to_owned(),
                reason: "author must not contain '_' (it separates id components)".to_owned(),
            });
        }
        let s = if subseq == 0 {
            format!("{author}_{seq:x}")
        } else {
            format!("{author}_{seq:x}_{subseq}")
        };
        Self::new(&s)
    }

    /// The root sentinel: the parent reference of a document's first change.
    #[must_use]
    pub fn root() -> Self {
        Self(ROOT_CHANGE_ID.to_owned())
    }

    /// Return `true` if this is the root sentinel.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0 == ROOT_CHANGE_ID
    }

    /// Return the id as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(s: &str) -> Result<(), IdError> {
        if s.is_empty() {
            return Err(IdError {
                value: s.to_owned(),
                reason: "change id must not be empty".to_owned(),
            });
        }
        if let Some(bad) = s
            .chars()
            .find(|c| *c == ',' || *c == '"' || *c == '\'' || *c == '#' || c.is_whitespace())
        {
            return Err(IdError {
                value: s.to_owned(),
                reason: format!("change id must not contain {bad:?}"),
            });
        }
        Ok(())
    }
}

impl fmt::Display for ChangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ChangeId {
    type Err = IdError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ChangeId {
    type Error = IdError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::validate(&s)?;
        Ok(Self(s))
    }
}

impl From<ChangeId> for String {
    fn from(id: ChangeId) -> Self {
        id.0
    }
}

// ---------------------------------------------------------------------------
// Minter
// ---------------------------------------------------------------------------

/// Mints a run of fresh [`ChangeId`]s for one author.
///
/// The sequence increases monotonically within the minter; the subsequence
/// stays fixed. A minter never re-issues an id.
#[derive(Clone, Debug)]
pub struct Minter {
    author: String,
    next_seq: u64,
    subseq: u64,
}

impl Minter {
    /// Create a minter for `author`, starting at sequence 1.
    ///
    /// # Errors
    /// Returns an error if the author is not a legal id component.
    pub fn new(author: &str, subseq: u64) -> Result<Self, IdError> {
        // Validate eagerly so next() can be infallible.
        ChangeId::mint(author, 1, subseq)?;
        Ok(Self {
            author: author.to_owned(),
            next_seq: 1,
            subseq,
        })
    }

    /// Mint the next id.
    pub fn next_id(&mut self) -> ChangeId {
        let seq = self.next_seq;
        self.next_seq += 1;
        // Author was validated in new(); mint cannot fail here.
        ChangeId::mint(&self.author, seq, self.subseq)
            .unwrap_or_else(|_| unreachable!("minter author validated at construction"))
    }

    /// The author this minter stamps ids with.
    #[must_use]
    pub fn author(&self) -> &str {
        &self.author
    }
}

// ---------------------------------------------------------------------------
// IdError
// ---------------------------------------------------------------------------

/// A change id or author failed validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdError {
    /// The offending value.
    pub value: String,
    /// Why it is invalid.
    pub reason: String,
}

impl fmt::Display for IdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid change id '{}': {}", self.value, self.reason)
    }
}

impl std::error::Error for IdError {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mint_formats_hex_sequence() {
        let id = ChangeId::mint("sjd", 26, 0).unwrap();
        assert_eq!(id.as_str(), "sjd_1a");
    }

    #[test]
    fn mint_appends_nonzero_subsequence() {
        let id = ChangeId::mint("sjd", 1, 2).unwrap();
        assert_eq!(id.as_str(), "sjd_1_2");
    }

    #[test]
    fn mint_rejects_underscore_author() {
        assert!(ChangeId::mint("a_b", 1, 0).is_err());
    }

    #[test]
    fn mint_rejects_empty_author() {
        assert!(ChangeId::mint("", 1, 0).is_err());
    }

    #[test]
    fn root_sentinel_round_trips() {
        let root = ChangeId::root();
        assert_eq!(root.as_str(), "0_0_0");
        assert!(root.is_root());
        assert_eq!(ChangeId::new("0_0_0").unwrap(), root);
    }

    #[test]
    fn plain_tokens_are_legal() {
        let id = ChangeId::new("c1").unwrap();
        assert_eq!(id.as_str(), "c1");
        assert!(!id.is_root());
    }

    #[test]
    fn rejects_separator_characters() {
        for bad in ["", "a,b", "a b", "a\"b", "#x", "a\tb"] {
            assert!(ChangeId::new(bad).is_err(), "should reject {bad:?}");
        }
    }

    #[test]
    fn from_str_and_display_round_trip() {
        let id: ChangeId = "sjd_2f_1".parse().unwrap();
        assert_eq!(format!("{id}"), "sjd_2f_1");
    }

    #[test]
    fn ids_are_ordered() {
        let a = ChangeId::new("a_1").unwrap();
        let b = ChangeId::new("b_1").unwrap();
        assert!(a < b);
    }

    #[test]
    fn minter_is_monotonic_and_unique() {
        let mut m = Minter::new("sjd", 0).unwrap();
        let first = m.next_id();
        let second = m.next_id();
        assert_eq!(first.as_str(), "sjd_1");
        assert_eq!(second.as_str(), "sjd_2");
        assert_ne!(first, second);
    }

    #[test]
    fn minter_respects_subsequence() {
        let mut m = Minter::new("kc", 3).unwrap();
        assert_eq!(m.next_id().as_str(), "kc_1_3");
    }

    #[test]
    fn serde_round_trip() {
        let id = ChangeId::mint("sjd", 255, 0).unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"sjd_ff\"");
        let back: ChangeId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn serde_rejects_invalid() {
        let res: Result<ChangeId, _> = serde_json::from_str("\"a,b\"");
        assert!(res.is_err());
    }
}

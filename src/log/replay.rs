//! Replay: reconstructing a document version from its ancestry.
//!
//! The document itself never appears in the log. To produce the text as of
//! change `id`, walk backward from `id` to the root sentinel collecting the
//! linear chain of ancestors, then fold each record's `apply` step over the
//! chain starting from the empty document:
//!
//! ```text
//! reconstruct_document(c3)
//!   ├── path_to_change(c3) → [c1, c2, c3]
//!   ├── "" ──apply c1──→ doc₁ ──apply c2──→ doc₂ ──apply c3──→ doc₃
//!   └── doc₃
//! ```
//!
//! Replay is deterministic for a fixed store state, and bounded by the
//! length of the ancestry chain. A resolution failure aborts that one
//! replay with the offending record and the document snapshot at the point
//! of failure; unrelated chains (and tip listings) are unaffected.

use std::fmt;

use crate::model::{ChangeId, ChangeRecord, ResolveError};

use super::store::Scroll;

impl Scroll {
    /// The ancestry chain of `id`: every ancestor from the oldest (a child
    /// of the root sentinel) through `id` itself, in application order.
    ///
    /// Until merges become first-class this chain is non-branching.
    ///
    /// # Errors
    /// [`ReplayError::UnknownChange`] if `id` is not stored;
    /// [`ReplayError::DanglingParent`] if an ancestor's parent vanished —
    /// unreachable when the store was built through
    /// [`Scroll::add_change_event`], but checked again since a careless
    /// loader may have bypassed insertion-order validation.
    pub fn path_to_change(&self, id: &ChangeId) -> Result<Vec<&ChangeRecord>, ReplayError> {
        let mut cursor = self.get(id).ok_or_else(|| ReplayError::UnknownChange {
            id: id.clone(),
        })?;
        let mut path = vec![cursor];
        while !cursor.parent().is_root() {
            cursor = self
                .get(cursor.parent())
                .ok_or_else(|| ReplayError::DanglingParent {
                    id: cursor.parent().clone(),
                    referenced_from: cursor.id().clone(),
                })?;
            path.push(cursor);
        }
        path.reverse();
        Ok(path)
    }

    /// Reconstruct the full document text as of change `id`.
    ///
    /// Folds `apply` over [`Scroll::path_to_change`], starting from the
    /// empty document.
    ///
    /// # Errors
    /// Any error from the path walk, or [`ReplayError::Apply`] carrying the
    /// failing record's id, the document snapshot at the point of failure,
    /// and the underlying resolution error.
    pub fn reconstruct_document(&self, id: &ChangeId) -> Result<String, ReplayError> {
        let path = self.path_to_change(id)?;
        tracing::debug!(change = %id, chain_len = path.len(), "replaying ancestry chain");
        let mut doc = String::new();
        for record in path {
            match record.apply(&doc) {
                Ok(next) => doc = next,
                Err(source) => {
                    return Err(ReplayError::Apply {
                        id: record.id().clone(),
                        snapshot: doc,
                        source,
                    });
                }
            }
        }
        Ok(doc)
    }
}

// ---------------------------------------------------------------------------
// ReplayError
// ---------------------------------------------------------------------------

/// A replay failed. Fatal for this reconstruction only: the store stays
/// usable for other queries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReplayError {
    /// The requested change id is not in the store.
    UnknownChange {
        /// The id that was requested.
        id: ChangeId,
    },

    /// An ancestor referenced a parent that is not in the store.
    DanglingParent {
        /// The missing parent.
        id: ChangeId,
        /// The record that referenced it.
        referenced_from: ChangeId,
    },

    /// An edit in the chain failed to resolve against the document state
    /// it was replayed onto.
    Apply {
        /// The failing record.
        id: ChangeId,
        /// The document text just before the failing edit.
        snapshot: String,
        /// What went wrong.
        source: ResolveError,
    },
}

impl fmt::Display for ReplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownChange { id } => {
                write!(
                    f,
                    "change '{id}' is not in the store.\n  To fix: list tip versions to see what this log contains."
                )
            }
            Self::DanglingParent {
                id,
                referenced_from,
            } => {
                write!(
                    f,
                    "change '{id}' is referenced from '{referenced_from}' but is not in the store.\n  The log was loaded out of order or truncated."
                )
            }
            Self::Apply {
                id,
                snapshot,
                source,
            } => {
                write!(
                    f,
                    "replay aborted at change '{id}': {source}\n  Document at point of failure ({} chars): {snapshot:?}",
                    snapshot.chars().count()
                )
            }
        }
    }
}

impl std::error::Error for ReplayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Apply { source, .. } => Some(source),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ChangeRecord;

    fn id(s: &str) -> ChangeId {
        ChangeId::new(s).unwrap()
    }

    fn add(scroll: &mut Scroll, parent: &str, this: &str, target: &str, source: &str) {
        let parent = if parent == "root" {
            ChangeId::root()
        } else {
            id(parent)
        };
        scroll
            .add_change_event(ChangeRecord::new(parent, id(this), "sjd", 0, target, source))
            .unwrap();
    }

    fn sample() -> Scroll {
        let mut scroll = Scroll::new();
        add(
            &mut scroll,
            "root",
            "c1",
            "chars:0:0",
            "text:\"<p>A new hope.</p>\"",
        );
        add(
            &mut scroll,
            "c1",
            "c2",
            "END:",
            "text:\"<p>Documents that resemble files.</p>\"",
        );
        add(&mut scroll, "c2", "c3", r"match:\bfiles\b", "text:\"flies\"");
        scroll
    }

    // -- path walking --

    #[test]
    fn path_is_oldest_first() {
        let scroll = sample();
        let path = scroll.path_to_change(&id("c3")).unwrap();
        let names: Vec<&str> = path.iter().map(|r| r.id().as_str()).collect();
        assert_eq!(names, ["c1", "c2", "c3"]);
    }

    #[test]
    fn path_to_root_child_is_single() {
        let scroll = sample();
        let path = scroll.path_to_change(&id("c1")).unwrap();
        assert_eq!(path.len(), 1);
    }

    #[test]
    fn path_to_unknown_change_fails() {
        let scroll = sample();
        assert!(matches!(
            scroll.path_to_change(&id("ghost")),
            Err(ReplayError::UnknownChange { .. })
        ));
    }

    // -- reconstruction --

    #[test]
    fn reconstruct_replays_the_chain() {
        let scroll = sample();
        assert_eq!(
            scroll.reconstruct_document(&id("c3")).unwrap(),
            "<p>A new hope.</p><p>Documents that resemble flies.</p>"
        );
    }

    #[test]
    fn reconstruct_intermediate_version() {
        let scroll = sample();
        assert_eq!(
            scroll.reconstruct_document(&id("c1")).unwrap(),
            "<p>A new hope.</p>"
        );
    }

    #[test]
    fn reconstruct_starts_from_empty_document() {
        let mut scroll = Scroll::new();
        add(&mut scroll, "root", "only", "END:", "text:\"seed\"");
        assert_eq!(scroll.reconstruct_document(&id("only")).unwrap(), "seed");
    }

    #[test]
    fn reconstruct_is_deterministic() {
        let scroll = sample();
        let a = scroll.reconstruct_document(&id("c3")).unwrap();
        let b = scroll.reconstruct_document(&id("c3")).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn forked_branches_reconstruct_independently() {
        let mut scroll = sample();
        add(&mut scroll, "c2", "alt", r"match:\bfiles\b", "text:\"towels\"");
        let main = scroll.reconstruct_document(&id("c3")).unwrap();
        let alt = scroll.reconstruct_document(&id("alt")).unwrap();
        assert!(main.contains("flies"));
        assert!(alt.contains("towels"));
        assert_eq!(scroll.tips().len(), 2);
    }

    // -- failure surfacing --

    #[test]
    fn failed_edit_aborts_with_snapshot() {
        let mut scroll = sample();
        add(&mut scroll, "c3", "bad", "match:never-present", "text:\"x\"");
        add(&mut scroll, "bad", "after", "END:", "text:\"y\"");
        let err = scroll.reconstruct_document(&id("after")).unwrap_err();
        match err {
            ReplayError::Apply { id: failing, snapshot, source } => {
                assert_eq!(failing.as_str(), "bad");
                assert!(snapshot.contains("flies"));
                assert!(matches!(source, ResolveError::NoMatch { .. }));
            }
            other => panic!("expected Apply error, got {other:?}"),
        }
    }

    #[test]
    fn failed_chain_leaves_other_queries_usable() {
        let mut scroll = sample();
        add(&mut scroll, "c3", "bad", "xptr:id(x)", "text:\"x\"");
        assert!(scroll.reconstruct_document(&id("bad")).is_err());
        // The sibling chain and tip queries still work.
        assert!(scroll.reconstruct_document(&id("c3")).is_ok());
        assert_eq!(&scroll.find_all_tip_versions(), scroll.tips());
    }

    #[test]
    fn unknown_scheme_in_chain_is_recoverable_error() {
        let mut scroll = Scroll::new();
        add(&mut scroll, "root", "c1", "weird:stuff", "text:\"x\"");
        let err = scroll.reconstruct_document(&id("c1")).unwrap_err();
        assert!(matches!(
            err,
            ReplayError::Apply {
                source: ResolveError::UnknownScheme { .. },
                ..
            }
        ));
    }
}

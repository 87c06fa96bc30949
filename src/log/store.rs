//! The append-only version store.
//!
//! A [`Scroll`] holds every [`ChangeRecord`] of one document, keyed by
//! change id. Records form a rooted tree under parent references (the root
//! sentinel is the unique implicit root), so history may fork; each branch's
//! current head is a **tip** — a record no other record names as its parent.
//!
//! Storage is an arena: records live in insertion order in a `Vec`, an
//! id→index map provides lookup, and a parent-index→child-indices multimap
//! gives O(1) forward traversal for tooling. The tip set is maintained
//! incrementally on insertion and can be recomputed in full as a
//! consistency check ([`Scroll::find_all_tip_versions`]).
//!
//! The store is strictly append-only within a session: no insertion ever
//! removes or mutates an existing record.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use crate::model::{ChangeId, ChangeRecord};

// ---------------------------------------------------------------------------
// Scroll
// ---------------------------------------------------------------------------

/// An append-only, forkable change log for one document.
#[derive(Clone, Debug, Default)]
pub struct Scroll {
    /// Arena of records, in insertion order.
    records: Vec<ChangeRecord>,
    /// Change id → arena index.
    by_id: HashMap<ChangeId, usize>,
    /// Arena index → indices of records based on it.
    children: Vec<Vec<usize>>,
    /// Indices of records based directly on the root sentinel.
    roots: Vec<usize>,
    /// Incrementally maintained set of tips.
    tips: BTreeSet<ChangeId>,
    /// Log-wide metadata, populated before the first record.
    meta: MetaTable,
}

impl Scroll {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one change record.
    ///
    /// The record's parent must be the root sentinel or already present —
    /// records arrive in an order consistent with their ancestry. A
    /// violation means the log itself is malformed, so it is a structural
    /// (load-fatal) error, as is a duplicate or reserved id.
    ///
    /// # Errors
    /// [`StoreError::OrphanParent`], [`StoreError::DuplicateId`], or
    /// [`StoreError::ReservedId`].
    pub fn add_change_event(&mut self, record: ChangeRecord) -> Result<(), StoreError> {
        if record.id().is_root() {
            return Err(StoreError::ReservedId);
        }
        if self.by_id.contains_key(record.id()) {
            return Err(StoreError::DuplicateId {
                id: record.id().clone(),
            });
        }
        let parent_idx = if record.parent().is_root() {
            None
        } else {
            match self.by_id.get(record.parent()) {
                Some(&idx) => Some(idx),
                None => {
                    return Err(StoreError::OrphanParent {
                        id: record.id().clone(),
                        parent: record.parent().clone(),
                    });
                }
            }
        };

        let idx = self.records.len();
        self.tips.remove(record.parent());
        self.tips.insert(record.id().clone());
        self.by_id.insert(record.id().clone(), idx);
        match parent_idx {
            Some(p) => self.children[p].push(idx),
            None => self.roots.push(idx),
        }
        self.children.push(Vec::new());
        self.records.push(record);
        Ok(())
    }

    /// Record one metadata entry. Fields are repeatable; values accumulate
    /// in insertion order.
    ///
    /// # Errors
    /// [`StoreError::MetaAfterChanges`] once any change record has been
    /// added — the metadata table is parsed once at load time and never
    /// mutated afterwards.
    pub fn add_meta(
        &mut self,
        field: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), StoreError> {
        if !self.records.is_empty() {
            return Err(StoreError::MetaAfterChanges { field: field.into() });
        }
        self.meta.push(field.into(), value.into());
        Ok(())
    }

    /// The log-wide metadata table.
    #[must_use]
    pub const fn meta(&self) -> &MetaTable {
        &self.meta
    }

    /// Look up a record by id.
    #[must_use]
    pub fn get(&self, id: &ChangeId) -> Option<&ChangeRecord> {
        self.by_id.get(id).map(|&idx| &self.records[idx])
    }

    /// Return `true` if `id` names a stored record.
    #[must_use]
    pub fn contains(&self, id: &ChangeId) -> bool {
        self.by_id.contains_key(id)
    }

    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Return `true` if no records have been stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate over records in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &ChangeRecord> {
        self.records.iter()
    }

    /// The incrementally maintained tip set: ids currently unreferenced as
    /// anyone's parent.
    #[must_use]
    pub const fn tips(&self) -> &BTreeSet<ChangeId> {
        &self.tips
    }

    /// Recompute the full tip set from scratch: every stored id, minus every
    /// id that appears as some record's parent.
    ///
    /// Authoritative cross-check for [`Scroll::tips`] after a bulk load.
    #[must_use]
    pub fn find_all_tip_versions(&self) -> BTreeSet<ChangeId> {
        let mut tips: BTreeSet<ChangeId> = self.by_id.keys().cloned().collect();
        for record in &self.records {
            tips.remove(record.parent());
        }
        tips
    }

    /// Records directly based on `id`. `None` if `id` is unknown (the root
    /// sentinel's children are the log's root records).
    #[must_use]
    pub fn children_of(&self, id: &ChangeId) -> Option<Vec<&ChangeRecord>> {
        let indices = if id.is_root() {
            &self.roots
        } else {
            &self.children[*self.by_id.get(id)?]
        };
        Some(indices.iter().map(|&i| &self.records[i]).collect())
    }

    /// All records descended from `id`, in breadth-first order, excluding
    /// `id` itself. `None` if `id` is unknown.
    #[must_use]
    pub fn descendants(&self, id: &ChangeId) -> Option<Vec<&ChangeRecord>> {
        let mut queue: Vec<usize> = if id.is_root() {
            self.roots.clone()
        } else {
            self.children[*self.by_id.get(id)?].clone()
        };
        let mut out = Vec::new();
        let mut cursor = 0;
        while cursor < queue.len() {
            let idx = queue[cursor];
            cursor += 1;
            out.push(&self.records[idx]);
            queue.extend(self.children[idx].iter().copied());
        }
        Some(out)
    }

    /// Records created in this session (`was_loaded() == false`), in id
    /// order — the set an external save collaborator appends to storage.
    #[must_use]
    pub fn new_records(&self) -> Vec<&ChangeRecord> {
        let mut out: Vec<&ChangeRecord> =
            self.records.iter().filter(|r| !r.was_loaded()).collect();
        out.sort_by(|a, b| a.id().cmp(b.id()));
        out
    }
}

impl fmt::Display for Scroll {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "scroll({} records, {} tips, {} meta fields)",
            self.records.len(),
            self.tips.len(),
            self.meta.len()
        )
    }
}

// ---------------------------------------------------------------------------
// MetaTable
// ---------------------------------------------------------------------------

/// The log-wide metadata table: field name → ordered values.
///
/// All fields are repeatable, so each maps to a list in insertion order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MetaTable {
    entries: BTreeMap<String, Vec<String>>,
}

impl MetaTable {
    fn push(&mut self, field: String, value: String) {
        self.entries.entry(field).or_default().push(value);
    }

    /// Values recorded for `field`, in insertion order.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.entries.get(field).map(Vec::as_slice)
    }

    /// Number of distinct fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Return `true` if no metadata was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate `(field, values)` pairs in field order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

// ---------------------------------------------------------------------------
// StoreError
// ---------------------------------------------------------------------------

/// Structural errors: the log cannot be trusted to answer further queries,
/// so these abort the load that produced them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreError {
    /// A record referenced a parent that has never been inserted.
    OrphanParent {
        /// The record being inserted.
        id: ChangeId,
        /// The missing parent it referenced.
        parent: ChangeId,
    },

    /// A record reused an id already present in the store.
    DuplicateId {
        /// The repeated id.
        id: ChangeId,
    },

    /// A record claimed the reserved root sentinel as its own id.
    ReservedId,

    /// A metadata entry arrived after change records had started.
    MetaAfterChanges {
        /// The metadata field that arrived too late.
        field: String,
    },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OrphanParent { id, parent } => {
                write!(
                    f,
                    "record '{id}' is based on '{parent}', which is not in the store.\n  Records must arrive parent-first; the log is malformed or out of order."
                )
            }
            Self::DuplicateId { id } => {
                write!(
                    f,
                    "record id '{id}' is already present.\n  Change ids must be unique across the log."
                )
            }
            Self::ReservedId => {
                write!(
                    f,
                    "the root sentinel names the empty document and cannot be stored as a record"
                )
            }
            Self::MetaAfterChanges { field } => {
                write!(
                    f,
                    "metadata field '{field}' arrived after change records started.\n  Metadata is only legal before the first change record."
                )
            }
        }
    }
}

impl std::error::Error for StoreError {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

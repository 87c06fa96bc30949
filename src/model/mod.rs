//! Core model: change identifiers, change records, and the target/source
//! specification languages.
//!
//! # Modules
//!
//! - [`ids`] — [`ChangeId`](ids::ChangeId) tokens, the root sentinel, and
//!   the [`Minter`](ids::Minter) for stamping fresh ids
//! - [`record`] — the immutable [`ChangeRecord`](record::ChangeRecord) and
//!   its `apply` step
//! - [`target`] — where an edit applies: the [`TargetSpec`](target::TargetSpec)
//!   enum and resolver
//! - [`source`] — what an edit inserts: the [`SourceSpec`](source::SourceSpec)
//!   enum and resolver

pub mod ids;
pub mod record;
pub mod source;
pub mod target;

pub use ids::{ChangeId, IdError, Minter, ROOT_CHANGE_ID};
pub use record::{ChangeRecord, NULL_EPOCH_SECS, parse_timestamp};
pub use source::SourceSpec;
pub use target::{ResolveError, TargetSpec};

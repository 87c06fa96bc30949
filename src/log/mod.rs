//! The change log: storage, replay, and the two on-disk encodings.
//!
//! # Modules
//!
//! - [`store`] — the append-only [`Scroll`](store::Scroll) version store,
//!   tip tracking, and the metadata table
//! - [`replay`] — ancestry walking and document reconstruction
//! - [`read`] / [`write`] — the delimited-record encoding
//! - [`xml`] — the structural (tag-based) encoding

pub mod read;
pub mod replay;
pub mod store;
pub mod write;
pub mod xml;

pub use replay::ReplayError;
pub use store::{MetaTable, Scroll, StoreError};

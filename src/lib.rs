//! palimpsest — an append-only, forkable change-log version space for
//! text documents.
//!
//! A document is not a stored blob but a sequence of recorded edits; any
//! version is derived on demand by replaying the edits that led to it.
//! Because every change names the version it is based on, the version
//! space is a tree: history forks freely, and each branch's head is a tip.
//!
//! The primary interface is the `palimpsest` binary. This lib.rs exposes
//! the core so that integration tests (and embedding tools) can exercise
//! the store, resolvers, and encodings directly without going through the
//! CLI.

pub mod config;
pub mod import;
pub mod log;
pub mod model;
pub mod telemetry;

// Private modules only used by the binary — not re-exported: commands.

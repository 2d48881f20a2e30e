//! An event graph walker ("eg-walker") for collaborative list editing.
//!
//! This crate implements the two halves of the eg-walker approach:
//!
//! 1. A [`CausalGraph`]: a compact, append-only record of operation
//!    identities (`(agent, seq)` pairs), their parent relationships and the
//!    mapping to dense local versions (LVs). The graph answers ancestry,
//!    diff, dominator and traversal queries over run-length compressed
//!    entries.
//! 2. A [`Walker`]: a replay engine which maintains a reconstructed document
//!    view at some version frontier, and which can advance, retreat and merge
//!    that frontier - applying and un-applying operations in causal order to
//!    produce the correct list state under concurrent edits.
//!
//! The element type stored in the list is fully opaque. Equality or ordering
//! of elements is never needed; cloning is only required to materialize
//! snapshots.
//!
//! ```
//! use eg_walker::Walker;
//!
//! let mut doc: Walker<char> = Walker::new();
//! doc.local_insert("seph", 0, 'h').unwrap();
//! doc.local_insert("seph", 1, 'i').unwrap();
//! assert_eq!(doc.get_active_items(), vec!['h', 'i']);
//!
//! let earlier = doc.checkout(&[0]).unwrap();
//! assert_eq!(earlier.snapshot, vec!['h']);
//! ```

pub mod rle;

mod lvrange;
mod frontier;
pub mod causalgraph;
mod operation;
mod oplog;
mod branch;
mod walker;

/// A local version. LVs are assigned densely, in insertion order into the
/// causal graph. The LV of an operation is also its index in the operation
/// log.
pub type LV = usize;

/// An interned agent ID. The mapping from agent names to IDs is local to each
/// causal graph; use [`RawVersion`] to name operations across replicas.
pub type AgentId = u32;

pub use lvrange::LVRange;
pub use frontier::Frontier;
pub use causalgraph::{AddRawResult, CausalGraph, CGError, VersionRelation};
pub use causalgraph::entry::CGEntry;
pub use causalgraph::agent_span::AgentSpan;
pub use causalgraph::raw_ids::RawVersion;
pub use causalgraph::summary::VersionSummary;
pub use operation::{ListOp, ListOpKind};
pub use oplog::ListOpLog;
pub use branch::Branch;
pub use walker::{Walker, WalkerError};

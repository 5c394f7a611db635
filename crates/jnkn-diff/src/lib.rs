//! Changed-artifact computation, blast radius, and risk scoring across two
//! graph snapshots.
//!
//! Grounded on `canopy-core/src/diff.rs`'s `DiffEngine`/`GraphDiff` shape,
//! repurposed: the teacher computes a live-watcher diff between two
//! in-memory snapshots for client broadcast; this crate computes the same
//! kind of added/removed/modified set but feeds it into a downstream-union
//! blast radius and a risk score instead, per spec §4.5.

mod analyzer;
mod risk;
mod types;

pub use analyzer::{blast_radius, compute_changed_nodes, diff};
pub use risk::{score, widest_path_confidence};
pub use types::{
    BlastResult, Category, ChangeKind, ChangedFile, ChangedNode, DiffMeta, ImpactReport, RiskAssessment, RiskLevel,
};

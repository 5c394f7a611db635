//! The `GraphStore` trait: a persistence seam between the extraction
//! pipeline and whatever backend holds the graph between scans.

use std::collections::{BTreeMap, HashSet};

use jnkn_core::{Edge, Graph, Node, ScanMetadata};

use crate::error::StoreError;

/// Summary counts surfaced by `jnkn stats` and the facade's `Repo::stats`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StoreStats {
    pub schema_version: i64,
    pub total_nodes: usize,
    pub total_edges: usize,
    pub tracked_files: usize,
    pub nodes_by_type: BTreeMap<String, usize>,
    pub edges_by_type: BTreeMap<String, usize>,
    pub db_size_bytes: u64,
}

/// Backend-agnostic persistence for the dependency graph. Implementors keep
/// the four relations of the data model in sync: `nodes`, `edges`,
/// `scan_metadata`, `schema_version`.
///
/// Batches passed to `save_nodes_batch`/`save_edges_batch` are already
/// merged (the caller runs them through an in-memory `Graph` first), so a
/// store only needs to upsert by identity, not re-apply `Node::merge_from`/
/// `Edge::merge_from` itself.
pub trait GraphStore {
    /// Upsert a batch of nodes by id. Must be atomic: either every node in
    /// the batch is visible afterward, or none are.
    fn save_nodes_batch(&mut self, nodes: &[Node]) -> Result<(), StoreError>;

    /// Upsert a batch of edges by `(source_id, target_id, type)`.
    fn save_edges_batch(&mut self, edges: &[Edge]) -> Result<(), StoreError>;

    /// Remove every node whose `path` equals `path`, cascading to every
    /// edge incident on one of those nodes. Atomic.
    fn delete_nodes_by_file(&mut self, path: &str) -> Result<(), StoreError>;

    fn get_all_scan_metadata(&self) -> Result<Vec<ScanMetadata>, StoreError>;

    fn save_scan_metadata(&mut self, metadata: &ScanMetadata) -> Result<(), StoreError>;

    /// Ids forward-reachable from `id`, excluding `id` itself.
    fn query_descendants(&self, id: &str, max_depth: Option<u32>) -> Result<HashSet<String>, StoreError>;

    /// Ids that reach `id`, excluding `id` itself.
    fn query_ancestors(&self, id: &str, max_depth: Option<u32>) -> Result<HashSet<String>, StoreError>;

    /// Load the entire graph into memory, e.g. for the stitcher pass or a
    /// full export.
    fn load_graph(&self) -> Result<Graph, StoreError>;

    fn get_stats(&self) -> Result<StoreStats, StoreError>;

    /// Drop every row from every relation, keeping the schema.
    fn clear(&mut self) -> Result<(), StoreError>;

    /// Flush and release any held resources. A no-op for backends that
    /// persist synchronously on every call.
    fn close(&mut self) -> Result<(), StoreError>;
}

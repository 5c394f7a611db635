//! jnkn-core — the typed cross-domain dependency graph: node/edge data
//! types, stable identity, merge semantics, and BFS reachability.

pub mod error;
pub mod graph;
pub mod model;

pub use error::CoreError;
pub use graph::{Graph, GraphDict};
pub use model::{Edge, EdgeType, Node, NodeType, ScanMetadata};

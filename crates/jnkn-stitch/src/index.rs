//! Reverse token index, rebuilt once per stitching pass.
//!
//! Grounded on `canopy-core`'s `SymbolTable` (a `DashMap`-backed
//! qualified-name → id index); generalized here from "exact qualified name"
//! to "token → set of node ids" for the overlap-matching rules.

use dashmap::DashMap;
use jnkn_core::{Graph, NodeType};

pub struct TokenIndex {
    by_token: DashMap<String, Vec<String>>,
}

impl TokenIndex {
    /// Build an index over every node of the given types, keyed by each of
    /// its tokens.
    pub fn build(graph: &Graph, types: &[NodeType]) -> Self {
        let by_token: DashMap<String, Vec<String>> = DashMap::new();
        for node_type in types {
            for node in graph.get_nodes_by_type(*node_type) {
                for token in &node.tokens {
                    by_token.entry(token.clone()).or_default().push(node.id.clone());
                }
            }
        }
        TokenIndex { by_token }
    }

    pub fn ids_for_token(&self, token: &str) -> Vec<String> {
        self.by_token.get(token).map(|v| v.clone()).unwrap_or_default()
    }
}

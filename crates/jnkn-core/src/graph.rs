//! The in-memory dependency graph: a directed multigraph keyed by stable
//! string ids, with content-based merge-on-insert and BFS reachability.

use std::collections::{HashMap, HashSet, VecDeque};

use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};

use crate::model::{Edge, EdgeType, Node, NodeType};

/// The cross-domain dependency graph. Every operation is total except
/// [`Graph::get_node`], which returns `None` — there is no exception-based
/// control flow here (spec §4.1).
pub struct Graph {
    inner: StableDiGraph<Node, Edge>,
    index_by_id: HashMap<String, NodeIndex>,
}

impl std::fmt::Debug for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Graph")
            .field("node_count", &self.inner.node_count())
            .field("edge_count", &self.inner.edge_count())
            .finish()
    }
}

impl Graph {
    pub fn new() -> Self {
        Graph {
            inner: StableDiGraph::new(),
            index_by_id: HashMap::new(),
        }
    }

    /// Insert or merge a node by id (spec §3.1).
    pub fn add_node(&mut self, node: Node) {
        if let Some(&idx) = self.index_by_id.get(&node.id) {
            let existing = self.inner.node_weight_mut(idx).expect("index tracked in index_by_id");
            existing.merge_from(node);
        } else {
            let id = node.id.clone();
            let idx = self.inner.add_node(node);
            self.index_by_id.insert(id, idx);
        }
    }

    /// Insert or merge an edge by `(source_id, target_id, type)` (spec §3.2).
    /// Dangling edges (target not yet present) are permitted: the target is
    /// materialized as an `unknown`-typed placeholder node (spec §3.2).
    pub fn add_edge(&mut self, edge: Edge) {
        let source_idx = self.ensure_node_index(&edge.source_id);
        let target_idx = self.ensure_node_index(&edge.target_id);

        let existing = self
            .inner
            .edges_connecting(source_idx, target_idx)
            .find(|e| e.weight().edge_type == edge.edge_type)
            .map(|e| e.id());

        match existing {
            Some(edge_idx) => {
                let existing_edge = self.inner.edge_weight_mut(edge_idx).expect("edge id from edges_connecting");
                existing_edge.merge_from(edge);
            }
            None => {
                self.inner.add_edge(source_idx, target_idx, edge);
            }
        }
    }

    fn ensure_node_index(&mut self, id: &str) -> NodeIndex {
        if let Some(&idx) = self.index_by_id.get(id) {
            return idx;
        }
        let placeholder = Node::new(id, id, NodeType::Unknown);
        let idx = self.inner.add_node(placeholder);
        self.index_by_id.insert(id.to_string(), idx);
        idx
    }

    pub fn get_node(&self, id: &str) -> Option<&Node> {
        self.index_by_id.get(id).and_then(|&idx| self.inner.node_weight(idx))
    }

    pub fn get_nodes_by_type(&self, node_type: NodeType) -> impl Iterator<Item = &Node> {
        self.inner.node_weights().filter(move |n| n.node_type == node_type)
    }

    pub fn all_nodes(&self) -> impl Iterator<Item = &Node> {
        self.inner.node_weights()
    }

    pub fn all_edges(&self) -> impl Iterator<Item = &Edge> {
        self.inner.edge_weights()
    }

    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    pub fn out_edges(&self, id: &str) -> impl Iterator<Item = &Edge> {
        let idx = self.index_by_id.get(id).copied();
        idx.into_iter()
            .flat_map(move |idx| self.inner.edges_directed(idx, Direction::Outgoing))
            .map(|e| e.weight())
    }

    pub fn in_edges(&self, id: &str) -> impl Iterator<Item = &Edge> {
        let idx = self.index_by_id.get(id).copied();
        idx.into_iter()
            .flat_map(move |idx| self.inner.edges_directed(idx, Direction::Incoming))
            .map(|e| e.weight())
    }

    /// Remove a node and every edge incident to it. Used by the incremental
    /// store to cascade-delete a file's contribution before re-parsing.
    pub fn remove_node(&mut self, id: &str) -> Option<Node> {
        let idx = self.index_by_id.remove(id)?;
        self.inner.remove_node(idx)
    }

    /// Remove a single edge by `(source_id, target_id, type)`, leaving both
    /// endpoint nodes and every other incident edge untouched. Used to drop
    /// edges that fall below a confidence threshold after stitching.
    pub fn remove_edge(&mut self, source_id: &str, target_id: &str, edge_type: EdgeType) -> Option<Edge> {
        let source_idx = *self.index_by_id.get(source_id)?;
        let target_idx = *self.index_by_id.get(target_id)?;
        let edge_idx = self
            .inner
            .edges_connecting(source_idx, target_idx)
            .find(|e| e.weight().edge_type == edge_type)
            .map(|e| e.id())?;
        self.inner.remove_edge(edge_idx)
    }

    /// Forward-reachable set from `id` under all edge types, excluding `id`
    /// itself. `max_depth = None` means unbounded (spec §4.1).
    pub fn downstream(&self, id: &str, max_depth: Option<u32>) -> HashSet<String> {
        self.reachable(id, Direction::Outgoing, max_depth)
    }

    /// Reverse-reachable set from `id`, excluding `id` itself.
    pub fn upstream(&self, id: &str, max_depth: Option<u32>) -> HashSet<String> {
        self.reachable(id, Direction::Incoming, max_depth)
    }

    fn reachable(&self, id: &str, dir: Direction, max_depth: Option<u32>) -> HashSet<String> {
        let mut visited = HashSet::new();
        let Some(&start) = self.index_by_id.get(id) else {
            return visited;
        };

        let mut queue = VecDeque::new();
        queue.push_back((start, 0u32));
        let mut seen_idx = HashSet::new();
        seen_idx.insert(start);

        while let Some((idx, depth)) = queue.pop_front() {
            if let Some(limit) = max_depth {
                if depth >= limit {
                    continue;
                }
            }
            for edge in self.inner.edges_directed(idx, dir) {
                let next = match dir {
                    Direction::Outgoing => edge.target(),
                    Direction::Incoming => edge.source(),
                };
                if seen_idx.insert(next) {
                    if let Some(node) = self.inner.node_weight(next) {
                        visited.insert(node.id.clone());
                    }
                    queue.push_back((next, depth + 1));
                }
            }
        }

        visited
    }

    /// Case-insensitive substring search over `name` and `id` (spec §4.1),
    /// used by the artifact resolver to expand user-typed fragments.
    pub fn find_nodes(&self, substring: &str) -> Vec<String> {
        let needle = substring.to_lowercase();
        self.inner
            .node_weights()
            .filter(|n| n.id.to_lowercase().contains(&needle) || n.name.to_lowercase().contains(&needle))
            .map(|n| n.id.clone())
            .collect()
    }

    pub fn to_dict(&self) -> GraphDict {
        GraphDict {
            nodes: self.inner.node_weights().cloned().collect(),
            edges: self.inner.edge_weights().cloned().collect(),
        }
    }

    pub fn from_dict(dict: GraphDict) -> Self {
        let mut graph = Graph::new();
        for node in dict.nodes {
            graph.add_node(node);
        }
        for edge in dict.edges {
            graph.add_edge(edge);
        }
        graph
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

/// Stable serialization form used for the JSON store backend and tests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphDict {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Edge, EdgeType, Node, NodeType};

    fn env_node(name: &str) -> Node {
        Node::new(format!("env:{name}"), name, NodeType::EnvVar)
    }

    #[test]
    fn add_node_merges_by_id() {
        let mut g = Graph::new();
        g.add_node(Node::new("file://a.py", "a.py", NodeType::CodeFile));
        g.add_node(Node::new("file://a.py", "a.py", NodeType::CodeFile).with_path("/repo/a.py"));
        assert_eq!(g.node_count(), 1);
        assert_eq!(g.get_node("file://a.py").unwrap().path.as_deref(), Some("/repo/a.py"));
    }

    #[test]
    fn add_edge_merges_by_triple_and_keeps_higher_confidence() {
        let mut g = Graph::new();
        g.add_edge(Edge::new("infra:a", "env:A", EdgeType::Provides, 0.6));
        g.add_edge(Edge::new("infra:a", "env:A", EdgeType::Provides, 1.0));
        assert_eq!(g.edge_count(), 1);
        assert_eq!(g.out_edges("infra:a").next().unwrap().confidence, 1.0);
    }

    #[test]
    fn dangling_edge_materializes_unknown_placeholder() {
        let mut g = Graph::new();
        g.add_edge(Edge::observed("file://a.py", "env:MISSING", EdgeType::Reads));
        let placeholder = g.get_node("env:MISSING").unwrap();
        assert_eq!(placeholder.node_type, NodeType::Unknown);
    }

    #[test]
    fn downstream_excludes_self_and_respects_depth() {
        let mut g = Graph::new();
        g.add_node(Node::new("a", "a", NodeType::CodeFile));
        g.add_edge(Edge::observed("a", "b", EdgeType::Imports));
        g.add_edge(Edge::observed("b", "c", EdgeType::Imports));

        let unbounded = g.downstream("a", None);
        assert_eq!(unbounded, HashSet::from(["b".to_string(), "c".to_string()]));

        let limited = g.downstream("a", Some(1));
        assert_eq!(limited, HashSet::from(["b".to_string()]));
    }

    #[test]
    fn downstream_terminates_on_cycles() {
        let mut g = Graph::new();
        g.add_edge(Edge::observed("a", "b", EdgeType::DependsOn));
        g.add_edge(Edge::observed("b", "a", EdgeType::DependsOn));
        let reached = g.downstream("a", None);
        assert_eq!(reached, HashSet::from(["b".to_string()]));
    }

    #[test]
    fn remove_edge_drops_only_the_matching_edge() {
        let mut g = Graph::new();
        g.add_edge(Edge::observed("a", "b", EdgeType::Imports));
        g.add_edge(Edge::observed("a", "b", EdgeType::DependsOn));
        g.add_edge(Edge::observed("a", "c", EdgeType::Imports));

        let removed = g.remove_edge("a", "b", EdgeType::Imports);
        assert!(removed.is_some());

        assert!(g.get_node("a").is_some());
        assert!(g.get_node("b").is_some());
        let remaining: Vec<_> = g.all_edges().map(|e| (e.source_id.as_str(), e.target_id.as_str(), e.edge_type)).collect();
        assert!(remaining.contains(&("a", "b", EdgeType::DependsOn)));
        assert!(remaining.contains(&("a", "c", EdgeType::Imports)));
        assert_eq!(remaining.len(), 2);
    }

    #[test]
    fn upstream_is_reverse_of_downstream() {
        let mut g = Graph::new();
        g.add_edge(Edge::observed("main.py", "app.py", EdgeType::Imports));
        g.add_edge(Edge::observed("app.py", "config.py", EdgeType::Imports));
        g.add_edge(Edge::observed("config.py", "env:DB_HOST", EdgeType::Reads));

        let up = g.upstream("env:DB_HOST", None);
        assert_eq!(
            up,
            HashSet::from(["main.py".to_string(), "app.py".to_string(), "config.py".to_string()])
        );
    }

    #[test]
    fn find_nodes_is_case_insensitive_substring() {
        let mut g = Graph::new();
        g.add_node(env_node("PAYMENT_DB_HOST"));
        g.add_node(env_node("OTHER"));
        let hits = g.find_nodes("payment");
        assert_eq!(hits, vec!["env:PAYMENT_DB_HOST".to_string()]);
    }

    #[test]
    fn round_trip_to_dict_from_dict() {
        let mut g = Graph::new();
        g.add_node(env_node("DB_HOST"));
        g.add_edge(Edge::observed("file://a.py", "env:DB_HOST", EdgeType::Reads));

        let dict = g.to_dict();
        let restored = Graph::from_dict(dict);

        assert_eq!(restored.node_count(), g.node_count());
        assert_eq!(restored.edge_count(), g.edge_count());
        assert_eq!(restored.get_node("env:DB_HOST").unwrap().name, "DB_HOST");
    }

    #[test]
    fn merge_idempotence() {
        let mut once = Graph::new();
        once.add_node(env_node("DB_HOST"));
        once.add_edge(Edge::observed("file://a.py", "env:DB_HOST", EdgeType::Reads));

        let mut twice = Graph::new();
        for _ in 0..2 {
            twice.add_node(env_node("DB_HOST"));
            twice.add_edge(Edge::observed("file://a.py", "env:DB_HOST", EdgeType::Reads));
        }

        assert_eq!(once.node_count(), twice.node_count());
        assert_eq!(once.edge_count(), twice.edge_count());
    }
}

//! Node and edge data types for the cross-domain dependency graph.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What kind of artifact a node represents. Closed set — dispatch on this,
/// never on the producing parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    CodeFile,
    CodeEntity,
    EnvVar,
    InfraResource,
    ConfigKey,
    DataAsset,
    Job,
    Unknown,
}

/// A single vertex in the graph. `id` is the canonical identity: two nodes
/// with the same `id` denote the same artifact and are merged, never
/// duplicated (see [`Node::merge_from`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tokens: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, Value>,
}

impl Node {
    // Well-known metadata keys (spec §3.1/§3.2). Parsers attach semantics
    // through these; nothing introspects a parser's own fields.
    pub const LINE: &'static str = "line";
    pub const SOURCE: &'static str = "source";
    pub const IS_PUBLIC: &'static str = "is_public";
    pub const CHANGE_TYPE: &'static str = "change_type";
    pub const INFERRED: &'static str = "inferred";
    pub const CONFIDENCE: &'static str = "confidence";
    pub const NAMESPACE: &'static str = "namespace";
    pub const VIRTUAL: &'static str = "virtual";
    pub const PARSE_ERROR: &'static str = "parse_error";

    pub fn new(id: impl Into<String>, name: impl Into<String>, node_type: NodeType) -> Self {
        Node {
            id: id.into(),
            name: name.into(),
            node_type,
            path: None,
            language: None,
            file_hash: None,
            tokens: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Merge another observation of the same id into this node, per spec §3.1:
    /// metadata is shallow-merged, later `path`/`file_hash` overwrite earlier,
    /// and `tokens` from the more specific extractor (the incoming one) win
    /// when non-empty.
    pub fn merge_from(&mut self, other: Node) {
        // A node can be first materialized as an `Unknown` placeholder by an
        // edge referencing an id not yet seen (`Graph::ensure_node_index`);
        // the real typed observation, whenever it arrives, must win.
        if self.node_type == NodeType::Unknown && other.node_type != NodeType::Unknown {
            self.node_type = other.node_type;
        }
        // Likewise a placeholder's name defaults to its id.
        if self.name.is_empty() || self.name == self.id {
            self.name = other.name.clone();
        }
        if other.path.is_some() {
            self.path = other.path;
        }
        if other.file_hash.is_some() {
            self.file_hash = other.file_hash;
        }
        if other.language.is_some() {
            self.language = other.language;
        }
        if !other.tokens.is_empty() {
            self.tokens = other.tokens;
        }
        for (k, v) in other.metadata {
            self.metadata.insert(k, v);
        }
    }
}

/// The kind of relationship an edge asserts. Closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeType {
    Imports,
    Reads,
    Writes,
    Provides,
    Provisions,
    Contains,
    DependsOn,
}

/// A directed, labeled, confidence-scored relation between two node ids.
/// Identity is `(source_id, target_id, type)`; re-ingesting the same triple
/// merges rather than duplicates (see [`Edge::merge_from`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub source_id: String,
    pub target_id: String,
    #[serde(rename = "type")]
    pub edge_type: EdgeType,
    pub confidence: f32,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, Value>,
}

impl Edge {
    pub const LINE: &'static str = "line";
    pub const PATTERN: &'static str = "pattern";
    pub const SOURCE: &'static str = "source";
    pub const VIA: &'static str = "via";
    pub const EXPLANATION: &'static str = "explanation";
    pub const MATCHED_TOKENS: &'static str = "matched_tokens";

    pub fn new(
        source_id: impl Into<String>,
        target_id: impl Into<String>,
        edge_type: EdgeType,
        confidence: f32,
    ) -> Self {
        Edge {
            source_id: source_id.into(),
            target_id: target_id.into(),
            edge_type,
            confidence: confidence.clamp(0.0, 1.0),
            metadata: BTreeMap::new(),
        }
    }

    pub fn observed(
        source_id: impl Into<String>,
        target_id: impl Into<String>,
        edge_type: EdgeType,
    ) -> Self {
        Edge::new(source_id, target_id, edge_type, 1.0)
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn identity(&self) -> (&str, &str, EdgeType) {
        (&self.source_id, &self.target_id, self.edge_type)
    }

    /// Merge per spec §3.2: higher-confidence edge wins outright (not
    /// averaged); on a tie, metadata is shallow-merged into the winner.
    pub fn merge_from(&mut self, other: Edge) {
        use std::cmp::Ordering;
        match other.confidence.partial_cmp(&self.confidence).unwrap_or(Ordering::Equal) {
            Ordering::Greater => {
                let mut merged = other;
                for (k, v) in std::mem::take(&mut self.metadata) {
                    merged.metadata.entry(k).or_insert(v);
                }
                *self = merged;
            }
            Ordering::Equal => {
                for (k, v) in other.metadata {
                    self.metadata.entry(k).or_insert(v);
                }
            }
            Ordering::Less => {}
        }
    }
}

/// Per-file bookkeeping for incremental re-scan (spec §3.3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanMetadata {
    pub path: String,
    pub file_hash: String,
    pub last_scanned: chrono::DateTime<chrono::Utc>,
    pub node_count: u64,
    pub edge_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_merge_prefers_higher_confidence() {
        let mut observed = Edge::new("a", "b", EdgeType::Provides, 1.0);
        let inferred = Edge::new("a", "b", EdgeType::Provides, 0.6)
            .with_metadata("explanation", "token overlap");
        observed.merge_from(inferred);
        assert_eq!(observed.confidence, 1.0);
        assert!(observed.metadata.is_empty());
    }

    #[test]
    fn edge_merge_discards_lower_confidence_observation() {
        let mut inferred = Edge::new("a", "b", EdgeType::Provides, 0.6);
        let observed = Edge::new("a", "b", EdgeType::Provides, 1.0);
        inferred.merge_from(observed);
        assert_eq!(inferred.confidence, 1.0);
    }

    #[test]
    fn node_merge_keeps_later_path_and_hash() {
        let mut a = Node::new("file://a.py", "a.py", NodeType::CodeFile);
        let mut b = Node::new("file://a.py", "a.py", NodeType::CodeFile).with_path("/repo/a.py");
        b.file_hash = Some("deadbeef".into());
        a.merge_from(b);
        assert_eq!(a.path.as_deref(), Some("/repo/a.py"));
        assert_eq!(a.file_hash.as_deref(), Some("deadbeef"));
    }

    #[test]
    fn node_merge_upgrades_unknown_placeholder_to_the_real_type() {
        let mut placeholder = Node::new("data:model:stg_orders", "data:model:stg_orders", NodeType::Unknown);
        let real = Node::new("data:model:stg_orders", "stg_orders", NodeType::DataAsset);
        placeholder.merge_from(real);
        assert_eq!(placeholder.node_type, NodeType::DataAsset);
        assert_eq!(placeholder.name, "stg_orders");
    }

    #[test]
    fn node_merge_does_not_downgrade_an_already_typed_node() {
        let mut typed = Node::new("data:model:orders", "orders", NodeType::DataAsset);
        let other = Node::new("data:model:orders", "orders", NodeType::DataAsset);
        typed.merge_from(other);
        assert_eq!(typed.node_type, NodeType::DataAsset);
    }
}

//! Per-file extraction state shared by a parser's sub-extractors.
//!
//! Grounded on `examples/original_source/src/jnkn/parsing/base.py`'s
//! `ExtractionContext` (filtered from the retrieval pack, reconstructed
//! from its call sites across `*/extractors/*.py`): a thin bag of
//! file identity plus factory helpers so no extractor hand-rolls a
//! `Node`/`Edge` literal, and a `seen` set so a lower-priority extractor
//! never re-reports what a higher-priority one already found.

use std::collections::HashSet;
use std::path::Path;

use jnkn_core::{Edge, EdgeType, Node, NodeType};

pub struct ExtractionContext<'a> {
    pub path: &'a Path,
    pub text: &'a str,
    pub file_id: String,
    seen: HashSet<String>,
}

impl<'a> ExtractionContext<'a> {
    pub fn new(path: &'a Path, text: &'a str, file_id: impl Into<String>) -> Self {
        ExtractionContext {
            path,
            text,
            file_id: file_id.into(),
            seen: HashSet::new(),
        }
    }

    /// Records `key` as handled. Returns `false` if a higher-priority
    /// extractor already claimed it, in which case the caller should skip.
    pub fn mark_seen(&mut self, key: &str) -> bool {
        self.seen.insert(key.to_string())
    }

    /// 1-based line number for a byte offset into `self.text`.
    pub fn line_number(&self, byte_offset: usize) -> u32 {
        self.text[..byte_offset.min(self.text.len())].matches('\n').count() as u32 + 1
    }

    pub fn path_str(&self) -> String {
        self.path.to_string_lossy().replace('\\', "/")
    }

    pub fn create_env_var_node(&self, name: &str, line: u32, source: &str) -> Node {
        let tokens = jnkn_stitch::tokenize(name);
        Node::new(format!("env:{name}"), name, NodeType::EnvVar)
            .with_path(self.path_str())
            .with_metadata(Node::LINE, line)
            .with_metadata(Node::SOURCE, source)
            .tap_tokens(tokens)
    }

    pub fn create_infra_node(&self, id: &str, name: &str, line: u32, infra_type: &str) -> Node {
        Node::new(id, name, NodeType::InfraResource)
            .with_path(self.path_str())
            .with_metadata(Node::LINE, line)
            .with_metadata("infra_type", infra_type)
            .tap_tokens(jnkn_stitch::tokenize(name))
    }

    pub fn create_config_node(&self, id: &str, name: &str, line: u32, config_type: &str) -> Node {
        Node::new(id, name, NodeType::ConfigKey)
            .with_path(self.path_str())
            .with_metadata(Node::LINE, line)
            .with_metadata("config_type", config_type)
            .tap_tokens(jnkn_stitch::tokenize(name))
    }

    pub fn create_data_asset_node(&self, id: &str, name: &str, asset_type: &str) -> Node {
        Node::new(id, name, NodeType::DataAsset)
            .with_path(self.path_str())
            .with_metadata("asset_type", asset_type)
            .tap_tokens(jnkn_stitch::tokenize(name))
    }

    pub fn create_reads_edge(&self, target_id: &str, line: u32, pattern: &str) -> Edge {
        Edge::observed(self.file_id.clone(), target_id, EdgeType::Reads)
            .with_metadata(Edge::LINE, line)
            .with_metadata(Edge::PATTERN, pattern)
    }

    pub fn create_contains_edge(&self, target_id: &str) -> Edge {
        Edge::observed(self.file_id.clone(), target_id, EdgeType::Contains)
    }

    pub fn create_imports_edge(&self, target_id: &str, line: u32, kind: &str) -> Edge {
        Edge::observed(self.file_id.clone(), target_id, EdgeType::Imports)
            .with_metadata(Edge::LINE, line)
            .with_metadata(Edge::VIA, kind)
    }

    pub fn create_provisions_edge(&self, target_id: &str) -> Edge {
        Edge::observed(self.file_id.clone(), target_id, EdgeType::Provisions)
    }
}

/// Small extension trait so node-building call sites can stay one chain
/// (`Node::new(...).with_path(...).tap_tokens(...)`) without `jnkn-core`
/// itself knowing about tokenization, which belongs to the stitcher's
/// vocabulary, not the core model.
trait TapTokens {
    fn tap_tokens(self, tokens: Vec<String>) -> Self;
}

impl TapTokens for Node {
    fn tap_tokens(mut self, tokens: Vec<String>) -> Self {
        self.tokens = tokens;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mark_seen_is_first_write_wins() {
        let path = Path::new("a.py");
        let mut ctx = ExtractionContext::new(path, "", "file://a.py");
        assert!(ctx.mark_seen("DB_HOST"));
        assert!(!ctx.mark_seen("DB_HOST"));
    }

    #[test]
    fn line_number_counts_preceding_newlines() {
        let path = Path::new("a.py");
        let text = "a\nb\nc";
        let ctx = ExtractionContext::new(path, text, "file://a.py");
        assert_eq!(ctx.line_number(0), 1);
        assert_eq!(ctx.line_number(2), 2);
        assert_eq!(ctx.line_number(4), 3);
    }
}

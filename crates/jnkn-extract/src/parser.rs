//! The per-file-format parser contract.

use jnkn_core::{Edge, Node};

use crate::context::ExtractionContext;

/// A single node or edge surfaced by a parser. Conceptually the "lazy
/// sequence of heterogeneous node|edge values" a Python generator would
/// yield; materialized as a `Vec` here since a parser's output for one
/// file is small and Rust has no stable `yield`.
pub enum ParseItem {
    Node(Node),
    Edge(Edge),
}

impl ParseItem {
    pub fn node(node: Node) -> Self {
        ParseItem::Node(node)
    }

    pub fn edge(edge: Edge) -> Self {
        ParseItem::Edge(edge)
    }
}

/// One file-format's worth of extraction logic. The dispatcher runs every
/// parser whose `can_parse` returns true for a given file and merges their
/// output; several parsers may legitimately claim the same file (e.g. a
/// `.json` file could be a Terraform plan or an OpenLineage event).
pub trait Parser: Send + Sync {
    fn name(&self) -> &'static str;

    /// Cheap sniff: extension check plus (optionally) a content-shape
    /// sniff, mirroring each extractor's own `can_extract` in the
    /// original implementation.
    fn can_parse(&self, ctx: &ExtractionContext) -> bool;

    /// Parse one file. Never panics on malformed input: on a decode or
    /// parse failure, returns a `CodeFile` node alone with
    /// `metadata.parse_error = true` and nothing else.
    fn parse(&self, ctx: &mut ExtractionContext) -> Vec<ParseItem>;
}

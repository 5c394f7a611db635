//! Fan a single file out to every parser that claims it, and seed the
//! `CodeFile` node every parser's edges key off of.
//!
//! Grounded on `canopy-indexer/src/coordinator.rs`'s intended role (a
//! `todo!()` stub in the teacher) — implemented here for real.

use sha2::{Digest, Sha256};

use jnkn_core::{Node, NodeType};

use crate::context::ExtractionContext;
use crate::parser::{ParseItem, Parser};

pub struct Dispatcher {
    parsers: Vec<Box<dyn Parser>>,
}

impl Dispatcher {
    pub fn new(parsers: Vec<Box<dyn Parser>>) -> Self {
        Dispatcher { parsers }
    }

    /// Run every parser that claims `path` and return the file's `CodeFile`
    /// node plus everything every matching parser produced. A decode
    /// failure (non-UTF8 content) yields the bare file node with
    /// `parse_error` set and nothing else — the same recovery every
    /// individual parser's own decode failure takes.
    pub fn dispatch(&self, path: &std::path::Path, bytes: &[u8]) -> Vec<ParseItem> {
        let file_id = format!("file://{}", path.to_string_lossy().replace('\\', "/"));
        let file_hash = format!("{:x}", Sha256::digest(bytes));

        let Ok(text) = std::str::from_utf8(bytes) else {
            let node = Node::new(file_id, path.to_string_lossy(), NodeType::CodeFile)
                .with_path(path.to_string_lossy())
                .with_metadata(Node::PARSE_ERROR, true);
            return vec![ParseItem::node(node)];
        };

        let mut items = Vec::new();
        let mut file_node = Node::new(file_id.clone(), path.to_string_lossy(), NodeType::CodeFile)
            .with_path(path.to_string_lossy());
        file_node.file_hash = Some(file_hash);
        items.push(ParseItem::node(file_node));

        for parser in &self.parsers {
            let mut ctx = ExtractionContext::new(path, text, file_id.clone());
            if !parser.can_parse(&ctx) {
                continue;
            }
            tracing::debug!(parser = parser.name(), path = %path.display(), "running parser");
            items.extend(parser.parse(&mut ctx));
        }

        items
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::languages::python::PythonParser;
    use std::path::Path;

    #[test]
    fn emits_file_node_with_hash_even_when_no_parser_matches() {
        let dispatcher = Dispatcher::new(vec![]);
        let items = dispatcher.dispatch(Path::new("README.md"), b"# hello");
        assert_eq!(items.len(), 1);
        match &items[0] {
            ParseItem::Node(n) => assert_eq!(n.node_type, NodeType::CodeFile),
            _ => panic!("expected a node"),
        }
    }

    #[test]
    fn non_utf8_content_yields_only_a_parse_error_node() {
        let dispatcher = Dispatcher::new(vec![Box::new(PythonParser)]);
        let items = dispatcher.dispatch(Path::new("a.py"), &[0xff, 0xfe, 0x00]);
        assert_eq!(items.len(), 1);
        match &items[0] {
            ParseItem::Node(n) => assert_eq!(n.metadata.get(Node::PARSE_ERROR).unwrap(), &serde_json::json!(true)),
            _ => panic!("expected a node"),
        }
    }

    #[test]
    fn matching_parser_contributes_items_after_the_file_node() {
        let dispatcher = Dispatcher::new(vec![Box::new(PythonParser)]);
        let items = dispatcher.dispatch(Path::new("a.py"), b"db = os.getenv(\"DB_HOST\")");
        assert!(items.len() > 1);
    }
}

//! Artifact identifier resolution: exact id, then unique substring match,
//! then a structured ambiguity error. Grounded on
//! `canopy-core/src/graph.rs`'s `find_node_by_name`/`find_node_by_qualified`
//! pair, generalized to substring matching against `Graph::find_nodes`
//! (spec §6: "the resolver expands substrings by calling `find_nodes`,
//! preferring exact matches, then unique prefix matches, then failing with
//! a clear 'ambiguous' error enumerating candidates").

use jnkn_core::Graph;

use crate::error::JnknError;

/// Resolve a user-supplied artifact identifier or fragment to exactly one
/// node id.
pub fn resolve(graph: &Graph, query: &str) -> Result<String, JnknError> {
    if graph.get_node(query).is_some() {
        return Ok(query.to_string());
    }

    let candidates = graph.find_nodes(query);
    match candidates.len() {
        0 => Err(JnknError::Ambiguous { query: query.to_string(), candidates }),
        1 => Ok(candidates.into_iter().next().expect("len checked above")),
        _ => {
            if let Some(unique_prefix) = unique_prefix_match(&candidates, query) {
                return Ok(unique_prefix);
            }
            Err(JnknError::Ambiguous { query: query.to_string(), candidates })
        }
    }
}

/// Resolve every entry in `queries`, short-circuiting on the first failure.
pub fn resolve_many(graph: &Graph, queries: &[String]) -> Result<Vec<String>, JnknError> {
    queries.iter().map(|q| resolve(graph, q)).collect()
}

fn unique_prefix_match(candidates: &[String], query: &str) -> Option<String> {
    let needle = query.to_lowercase();
    let prefix_hits: Vec<&String> = candidates.iter().filter(|id| id.to_lowercase().starts_with(&needle)).collect();
    match prefix_hits.as_slice() {
        [only] => Some((*only).clone()),
        _ => None,
    }
}

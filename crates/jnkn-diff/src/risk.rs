//! Risk scoring: how much confidence to place in a computed blast radius,
//! and how urgent a review it warrants.
//!
//! `widest_path_confidence` answers "the lowest-confidence edge on any path
//! from a changed node to any impacted node" (spec §4.5 step 5) as a
//! multi-source widest-path search: for each impacted node, find the path
//! from any changed node that maximizes the minimum edge confidence along
//! it (the strongest evidence chain reaching that node), then take the
//! worst of those per-node bests. Grounded on the teacher's
//! `Graph::ancestors` BFS shape in `canopy-core/src/graph.rs` (queue +
//! visited-set over `out_edges`), generalized from "visited: bool" to
//! "visited: best bottleneck so far" so it answers a weighted question in
//! one pass instead of a second unweighted traversal.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use jnkn_core::Graph;

use crate::types::RiskLevel;

struct Frontier {
    bottleneck: f32,
    id: String,
}

impl PartialEq for Frontier {
    fn eq(&self, other: &Self) -> bool {
        self.bottleneck == other.bottleneck
    }
}
impl Eq for Frontier {}
impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        self.bottleneck.total_cmp(&other.bottleneck)
    }
}

/// Widest-path bottleneck confidence from any of `sources` to any of
/// `targets`, minimized over targets. `None` if no source reaches any
/// target.
pub fn widest_path_confidence<'a>(
    graph: &Graph,
    sources: &[String],
    targets: impl Iterator<Item = &'a String>,
) -> Option<f32> {
    if sources.is_empty() {
        return None;
    }
    let target_set: HashSet<&str> = targets.map(|s| s.as_str()).collect();
    if target_set.is_empty() {
        return None;
    }

    let mut best: HashMap<String, f32> = HashMap::new();
    let mut heap = BinaryHeap::new();
    for source in sources {
        if best.insert(source.clone(), 1.0).is_none() {
            heap.push(Frontier { bottleneck: 1.0, id: source.clone() });
        }
    }

    while let Some(Frontier { bottleneck, id }) = heap.pop() {
        if best.get(&id).is_some_and(|&b| b > bottleneck) {
            continue;
        }
        for edge in graph.out_edges(&id) {
            let candidate = bottleneck.min(edge.confidence);
            let improved = best.get(&edge.target_id).is_none_or(|&existing| candidate > existing);
            if improved {
                best.insert(edge.target_id.clone(), candidate);
                heap.push(Frontier { bottleneck: candidate, id: edge.target_id.clone() });
            }
        }
    }

    target_set
        .into_iter()
        .filter_map(|t| best.get(t).copied())
        .reduce(f32::min)
}

/// Impacted-count bucket, data-asset presence, critical-path presence, and
/// weak-evidence-path presence combine into a single ordinal risk level.
/// A low `min_path_confidence` raises risk rather than lowering it: it
/// means the computed blast radius rests on an inferred (stitcher) edge
/// rather than a directly observed one, so the true impact is less certain
/// and merits closer review, not less.
pub fn score(total_impacted_count: usize, has_data_asset: bool, has_critical_path: bool, min_path_confidence: Option<f32>) -> RiskLevel {
    let mut points = match total_impacted_count {
        0..=5 => 0,
        6..=20 => 1,
        21..=100 => 2,
        _ => 3,
    };
    if has_data_asset {
        points += 1;
    }
    if has_critical_path {
        points += 2;
    }
    if min_path_confidence.is_some_and(|c| c < 0.5) {
        points += 1;
    }

    match points {
        0 => RiskLevel::Low,
        1..=2 => RiskLevel::Medium,
        3..=4 => RiskLevel::High,
        _ => RiskLevel::Critical,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jnkn_core::{Edge, EdgeType, Node, NodeType};

    fn chain_graph() -> Graph {
        let mut g = Graph::new();
        g.add_node(Node::new("a", "a", NodeType::CodeFile));
        g.add_edge(Edge::new("a", "b", EdgeType::Imports, 1.0));
        g.add_edge(Edge::new("b", "c", EdgeType::DependsOn, 0.4));
        g
    }

    #[test]
    fn widest_path_confidence_is_the_bottleneck_on_the_only_path() {
        let g = chain_graph();
        let targets = vec!["c".to_string()];
        let confidence = widest_path_confidence(&g, &["a".to_string()], targets.iter());
        assert_eq!(confidence, Some(0.4));
    }

    #[test]
    fn widest_path_confidence_prefers_the_stronger_of_two_paths() {
        let mut g = Graph::new();
        g.add_edge(Edge::new("a", "b", EdgeType::Imports, 0.3));
        g.add_edge(Edge::new("a", "c", EdgeType::Imports, 1.0));
        g.add_edge(Edge::new("c", "b", EdgeType::Imports, 0.9));

        let targets = vec!["b".to_string()];
        let confidence = widest_path_confidence(&g, &["a".to_string()], targets.iter());
        assert_eq!(confidence, Some(0.9));
    }

    #[test]
    fn unreachable_target_yields_none() {
        let g = chain_graph();
        let targets = vec!["zzz".to_string()];
        assert_eq!(widest_path_confidence(&g, &["a".to_string()], targets.iter()), None);
    }

    #[test]
    fn score_escalates_with_critical_path_and_weak_confidence() {
        assert_eq!(score(2, false, false, None), RiskLevel::Low);
        assert_eq!(score(10, true, false, Some(0.9)), RiskLevel::Medium);
        assert_eq!(score(10, true, true, Some(0.3)), RiskLevel::Critical);
    }
}

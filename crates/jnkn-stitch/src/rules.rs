//! The mandated stitching rules (spec §4.3), reconstructed from
//! `examples/original_source/tests/unit/core/test_stitching.py` (the
//! `jnkn.core.stitching` module it exercises was filtered out of the
//! retrieval pack) plus spec.md's formulas.

use std::collections::HashMap;

use jnkn_core::{Edge, EdgeType, Graph, Node, NodeType};

use crate::index::TokenIndex;
use crate::overlap::{significant_token_overlap, MatchConfig};

/// A single stitching rule: a pure function of the graph (and config) to a
/// set of new edges. Rules never mutate the graph themselves — the caller
/// (`Stitcher::run`) folds the results back in under the standard merge
/// rule (spec §4.3's "Output").
pub trait StitchRule: Send + Sync {
    fn name(&self) -> &'static str;
    fn apply(&self, graph: &Graph, config: &MatchConfig) -> Vec<Edge>;
}

fn sorted_nodes(graph: &Graph, node_type: NodeType) -> Vec<&Node> {
    let mut nodes: Vec<&Node> = graph.get_nodes_by_type(node_type).collect();
    nodes.sort_by(|a, b| a.id.cmp(&b.id));
    nodes
}

fn candidate_ids(index: &TokenIndex, tokens: &[String]) -> Vec<String> {
    let mut ids: Vec<String> = tokens
        .iter()
        .flat_map(|t| index.ids_for_token(t))
        .collect();
    ids.sort();
    ids.dedup();
    ids
}

/// Rule 1: `infra_resource --provides--> env_var` when their tokens
/// significantly overlap.
pub struct EnvVarToInfra;

impl StitchRule for EnvVarToInfra {
    fn name(&self) -> &'static str {
        "env_to_infra"
    }

    fn apply(&self, graph: &Graph, config: &MatchConfig) -> Vec<Edge> {
        let infra_index = TokenIndex::build(graph, &[NodeType::InfraResource]);
        let mut edges = Vec::new();

        for env in sorted_nodes(graph, NodeType::EnvVar) {
            for infra_id in candidate_ids(&infra_index, &env.tokens) {
                let Some(infra) = graph.get_node(&infra_id) else { continue };
                let (common, score) = significant_token_overlap(&infra.tokens, &env.tokens, config);
                if common.len() < config.min_overlap_tokens || score < config.min_confidence {
                    continue;
                }
                edges.push(
                    Edge::new(infra.id.clone(), env.id.clone(), EdgeType::Provides, score)
                        .with_metadata(Edge::MATCHED_TOKENS, common),
                );
            }
        }

        edges
    }
}

/// Rule 2: symmetric of (1) for `config_key` producers (Terraform outputs,
/// locals, etc.).
pub struct InfraToConfig;

impl StitchRule for InfraToConfig {
    fn name(&self) -> &'static str {
        "infra_to_config"
    }

    fn apply(&self, graph: &Graph, config: &MatchConfig) -> Vec<Edge> {
        let infra_index = TokenIndex::build(graph, &[NodeType::InfraResource]);
        let mut edges = Vec::new();

        for key in sorted_nodes(graph, NodeType::ConfigKey) {
            for infra_id in candidate_ids(&infra_index, &key.tokens) {
                let Some(infra) = graph.get_node(&infra_id) else { continue };
                let (common, score) = significant_token_overlap(&infra.tokens, &key.tokens, config);
                if common.len() < config.min_overlap_tokens || score < config.min_confidence {
                    continue;
                }
                edges.push(
                    Edge::new(infra.id.clone(), key.id.clone(), EdgeType::Provides, score)
                        .with_metadata(Edge::MATCHED_TOKENS, common),
                );
            }
        }

        edges
    }
}

/// Rank used to orient `InfraToInfra` hierarchy edges: higher rank is the
/// container, lower rank is the contained resource.
fn hierarchy_rank(infra_type: &str) -> i32 {
    const RANKS: &[(&str, i32)] = &[
        ("vpc", 100),
        ("network", 100),
        ("subnet", 80),
        ("security_group", 60),
        ("cluster", 60),
        ("instance", 40),
        ("db_instance", 40),
        ("function", 40),
        ("bucket", 20),
    ];
    RANKS
        .iter()
        .find(|(needle, _)| infra_type.contains(needle))
        .map(|(_, rank)| *rank)
        .unwrap_or(0)
}

fn infra_type_of(node: &Node) -> &str {
    // id shape: infra:<type>.<name> (or infra:local.<n> / infra:output:<n> / infra:module.<n>)
    node.id
        .strip_prefix("infra:")
        .and_then(|rest| rest.split(['.', ':']).next())
        .unwrap_or("")
}

/// Rule 3: hierarchy edges between infrastructure resources. Direction
/// follows [`hierarchy_rank`]: higher rank depends on nothing, lower rank
/// `depends_on` the higher-rank container.
pub struct InfraToInfra;

impl InfraToInfra {
    /// Orient a candidate pair; returns `(source, target)` for the
    /// `depends_on` edge: lower-rank resource depends on higher-rank one.
    pub fn determine_direction<'a>(&self, a: &'a Node, b: &'a Node) -> (&'a Node, &'a Node) {
        if hierarchy_rank(infra_type_of(a)) >= hierarchy_rank(infra_type_of(b)) {
            (b, a)
        } else {
            (a, b)
        }
    }
}

impl StitchRule for InfraToInfra {
    fn name(&self) -> &'static str {
        "infra_to_infra"
    }

    fn apply(&self, graph: &Graph, config: &MatchConfig) -> Vec<Edge> {
        let nodes = sorted_nodes(graph, NodeType::InfraResource);
        let mut edges = Vec::new();

        for i in 0..nodes.len() {
            for j in (i + 1)..nodes.len() {
                let a = nodes[i];
                let b = nodes[j];
                let rank_a = hierarchy_rank(infra_type_of(a));
                let rank_b = hierarchy_rank(infra_type_of(b));
                if rank_a == rank_b {
                    continue;
                }
                let (lower, higher) = self.determine_direction(a, b);
                let (common, score) = significant_token_overlap(&lower.tokens, &higher.tokens, config);
                if common.len() < config.min_overlap_tokens || score < config.min_confidence {
                    continue;
                }
                edges.push(
                    Edge::new(lower.id.clone(), higher.id.clone(), EdgeType::DependsOn, score)
                        .with_metadata(Edge::MATCHED_TOKENS, common),
                );
            }
        }

        edges
    }
}

/// Rule 4: equivalence between `data_asset` nodes that share a bare name
/// across namespaces, at a fixed tunable confidence.
pub struct DataAssetAliasing {
    pub confidence: f32,
}

impl Default for DataAssetAliasing {
    fn default() -> Self {
        DataAssetAliasing { confidence: 0.6 }
    }
}

impl StitchRule for DataAssetAliasing {
    fn name(&self) -> &'static str {
        "data_alias"
    }

    fn apply(&self, graph: &Graph, config: &MatchConfig) -> Vec<Edge> {
        if self.confidence < config.min_confidence {
            return Vec::new();
        }

        let mut by_name: HashMap<&str, Vec<&Node>> = HashMap::new();
        let assets = sorted_nodes(graph, NodeType::DataAsset);
        for asset in &assets {
            by_name.entry(asset.name.as_str()).or_default().push(asset);
        }

        let mut edges = Vec::new();
        for group in by_name.values() {
            if group.len() < 2 {
                continue;
            }
            for i in 0..group.len() {
                for j in (i + 1)..group.len() {
                    edges.push(Edge::new(
                        group[i].id.clone(),
                        group[j].id.clone(),
                        EdgeType::DependsOn,
                        self.confidence,
                    ));
                }
            }
        }

        edges
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jnkn_core::Node;

    fn infra(id: &str, name: &str, tokens: &[&str]) -> Node {
        let mut n = Node::new(id, name, NodeType::InfraResource);
        n.tokens = tokens.iter().map(|s| s.to_string()).collect();
        n
    }

    fn env_var(id: &str, name: &str, tokens: &[&str]) -> Node {
        let mut n = Node::new(id, name, NodeType::EnvVar);
        n.tokens = tokens.iter().map(|s| s.to_string()).collect();
        n
    }

    #[test]
    fn env_to_infra_emits_provides_edge_on_overlap() {
        let mut g = Graph::new();
        g.add_node(env_var("env:PAYMENT_DB_HOST", "PAYMENT_DB_HOST", &["payment", "db", "host"]));
        g.add_node(infra(
            "infra:aws_db_instance.payment_db_host",
            "payment_db_host",
            &["payment", "db", "host"],
        ));

        let edges = EnvVarToInfra.apply(&g, &MatchConfig::default());
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].source_id, "infra:aws_db_instance.payment_db_host");
        assert_eq!(edges[0].target_id, "env:PAYMENT_DB_HOST");
        assert!(edges[0].confidence >= 0.8);
    }

    #[test]
    fn env_to_infra_skips_unrelated_names() {
        let mut g = Graph::new();
        g.add_node(env_var("env:PAYMENT_DB_HOST", "PAYMENT_DB_HOST", &["payment", "db", "host"]));
        g.add_node(infra("infra:aws_db_instance.unrelated_name", "unrelated_name", &["unrelated", "name"]));

        let edges = EnvVarToInfra.apply(&g, &MatchConfig::default());
        assert!(edges.is_empty());
    }

    #[test]
    fn infra_to_infra_orients_vpc_above_subnet() {
        let vpc = infra("infra:aws_vpc.main", "main-vpc", &["main", "vpc"]);
        let subnet = infra("infra:aws_subnet.main", "main-subnet", &["main", "subnet"]);
        let (src, tgt) = InfraToInfra.determine_direction(&vpc, &subnet);
        assert_eq!(src.id, subnet.id);
        assert_eq!(tgt.id, vpc.id);
    }

    #[test]
    fn data_asset_aliasing_links_same_name_across_namespaces() {
        let mut g = Graph::new();
        g.add_node(Node::new("data:raw/orders", "orders", NodeType::DataAsset));
        g.add_node(Node::new("data:curated/orders", "orders", NodeType::DataAsset));

        let edges = DataAssetAliasing::default().apply(&g, &MatchConfig::default());
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].confidence, 0.6);
    }
}

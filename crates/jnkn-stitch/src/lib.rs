//! Cross-domain edge discovery: infers edges a single-file parser can never
//! see (an env var read by code and an infrastructure resource that
//! provisions it; a Terraform output threading into a config key; the same
//! data asset under two namespaces) by matching tokens across node names.

mod index;
mod overlap;
mod rules;
mod tokenize;

pub use index::TokenIndex;
pub use overlap::{significant_token_overlap, MatchConfig};
pub use rules::{DataAssetAliasing, EnvVarToInfra, InfraToConfig, InfraToInfra, StitchRule};
pub use tokenize::{normalize, tokenize};

use jnkn_core::Graph;
use tracing::debug;

/// Runs the mandated rules, in declared order, and folds their edges back
/// into the graph under the usual merge semantics. Deterministic: rule
/// order is fixed and every rule iterates candidates in lexicographic id
/// order, so two runs over the same graph and config produce identical
/// output, including metadata (spec §4.3).
pub struct Stitcher {
    config: MatchConfig,
    rules: Vec<Box<dyn StitchRule>>,
}

impl Stitcher {
    pub fn new(config: MatchConfig) -> Self {
        let rules: Vec<Box<dyn StitchRule>> = vec![
            Box::new(EnvVarToInfra),
            Box::new(InfraToConfig),
            Box::new(InfraToInfra),
            Box::new(DataAssetAliasing::default()),
        ];
        Stitcher { config, rules }
    }

    /// Run every enabled rule over `graph` and merge the resulting edges
    /// into it in place. Returns the number of edges proposed (including
    /// ones that lost to an already-higher-confidence edge during merge).
    pub fn run(&self, graph: &mut Graph) -> usize {
        let mut proposed = 0;

        for rule in &self.rules {
            if !self.config.rule_enabled(rule.name()) {
                debug!(rule = rule.name(), "rule disabled, skipping");
                continue;
            }

            let edges = rule.apply(graph, &self.config);
            debug!(rule = rule.name(), count = edges.len(), "rule produced edges");
            proposed += edges.len();
            for edge in edges {
                graph.add_edge(edge);
            }
        }

        proposed
    }
}

impl Default for Stitcher {
    fn default() -> Self {
        Stitcher::new(MatchConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jnkn_core::{Edge, EdgeType, Node, NodeType};

    #[test]
    fn run_is_deterministic_across_repeated_invocations() {
        let build = || {
            let mut g = Graph::new();
            let mut env = Node::new("env:PAYMENT_DB_HOST", "PAYMENT_DB_HOST", NodeType::EnvVar);
            env.tokens = vec!["payment".into(), "db".into(), "host".into()];
            g.add_node(env);
            let mut infra = Node::new(
                "infra:aws_db_instance.payment_db_host",
                "payment_db_host",
                NodeType::InfraResource,
            );
            infra.tokens = vec!["payment".into(), "db".into(), "host".into()];
            g.add_node(infra);
            g
        };

        let mut a = build();
        let mut b = build();
        Stitcher::default().run(&mut a);
        Stitcher::default().run(&mut b);

        let a_edges: Vec<&Edge> = a.all_edges().collect();
        let b_edges: Vec<&Edge> = b.all_edges().collect();
        assert_eq!(a_edges.len(), b_edges.len());
        assert_eq!(a_edges.len(), 1);
    }

    #[test]
    fn stitched_edge_loses_to_existing_higher_confidence_parser_edge() {
        let mut g = Graph::new();
        let mut env = Node::new("env:PAYMENT_DB_HOST", "PAYMENT_DB_HOST", NodeType::EnvVar);
        env.tokens = vec!["payment".into(), "db".into(), "host".into()];
        g.add_node(env);
        let mut infra = Node::new(
            "infra:aws_db_instance.payment_db_host",
            "payment_db_host",
            NodeType::InfraResource,
        );
        infra.tokens = vec!["payment".into(), "db".into(), "host".into()];
        g.add_node(infra);

        g.add_edge(Edge::observed(
            "infra:aws_db_instance.payment_db_host",
            "env:PAYMENT_DB_HOST",
            EdgeType::Provides,
        ));

        Stitcher::default().run(&mut g);

        let edge = g
            .out_edges("infra:aws_db_instance.payment_db_host")
            .find(|e| e.target_id == "env:PAYMENT_DB_HOST")
            .unwrap();
        assert_eq!(edge.confidence, 1.0);
    }

    #[test]
    fn disabled_rule_produces_no_edges() {
        let mut config = MatchConfig::default();
        config.enabled_rules.clear();
        let mut g = Graph::new();
        g.add_node(Node::new("data:raw/orders", "orders", NodeType::DataAsset));
        g.add_node(Node::new("data:curated/orders", "orders", NodeType::DataAsset));

        let proposed = Stitcher::new(config).run(&mut g);
        assert_eq!(proposed, 0);
        assert_eq!(g.edge_count(), 0);
    }
}

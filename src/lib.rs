//! `jnkn`: a cross-domain impact-analysis engine. Ingests a polyglot
//! repository — application code, infrastructure-as-code, data-pipeline
//! manifests, lineage events — into one typed dependency graph, stitches
//! cross-domain edges inference can't observe directly, and answers
//! blast-radius and change-impact queries over the result.
//!
//! [`Repo`] is the entry point: open a repository root, `scan` it
//! incrementally, then query `blast`/`diff`/`stats` against the persisted
//! graph.

pub mod config;
pub mod error;
pub mod repo;
pub mod resolve;

pub use config::{Config, ConfigError, RiskConfig, ScanConfig, StitcherConfig};
pub use error::JnknError;
pub use repo::{Repo, ScanStats};

pub use jnkn_core::{Edge, EdgeType, Graph, Node, NodeType, ScanMetadata};
pub use jnkn_diff::{BlastResult, Category, ChangeKind, ChangedFile, ImpactReport, RiskAssessment, RiskLevel};
pub use jnkn_store::StoreStats;

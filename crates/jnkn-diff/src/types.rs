//! Shared types for changed-artifact computation, blast radius, and risk.

use std::collections::BTreeMap;

use serde::Serialize;

/// How a file changed between the base and head revisions, as supplied by
/// the caller's VCS adapter (this crate never invokes a VCS itself).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Added,
    Removed,
    Modified,
}

/// One entry of the caller-supplied changed-file list.
#[derive(Debug, Clone)]
pub struct ChangedFile {
    pub path: String,
    pub kind: ChangeKind,
}

impl ChangedFile {
    pub fn new(path: impl Into<String>, kind: ChangeKind) -> Self {
        ChangedFile { path: path.into(), kind }
    }
}

/// Id-prefix category bucket used for blast-radius and diff reporting.
/// Consistent with a node's `NodeType` (spec invariant: "prefix of id is
/// consistent with type"), so this categorizes by `NodeType` directly
/// rather than re-parsing the id string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Data,
    Code,
    Config,
    Infra,
    Other,
}

impl Category {
    pub fn of(node_type: jnkn_core::NodeType) -> Category {
        use jnkn_core::NodeType::*;
        match node_type {
            DataAsset => Category::Data,
            CodeFile | CodeEntity => Category::Code,
            EnvVar | ConfigKey => Category::Config,
            InfraResource => Category::Infra,
            Job | Unknown => Category::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

/// A single changed node, stamped with why it's considered changed.
#[derive(Debug, Clone, Serialize)]
pub struct ChangedNode {
    pub id: String,
    pub change_type: ChangeKind,
}

/// Result of `blast_radius`: every artifact transitively affected by a set
/// of source artifacts.
#[derive(Debug, Clone, Serialize)]
pub struct BlastResult {
    pub source_artifacts: Vec<String>,
    pub total_impacted_count: usize,
    pub impacted_artifacts: Vec<String>,
    pub breakdown: BTreeMap<Category, usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RiskAssessment {
    pub level: RiskLevel,
    pub total_impacted_count: usize,
    pub impacted_data_assets: usize,
    pub critical_path_hits: usize,
    /// Widest-path (maximum bottleneck) confidence from any changed node to
    /// the least-confidently-reached impacted node; `None` when nothing was
    /// impacted.
    pub min_path_confidence: Option<f32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiffMeta {
    pub base_ref: String,
    pub head_ref: String,
    pub changed_file_count: usize,
}

/// Output of `diff`: `{meta, risk, changes, impacted_by_category}` per the
/// documented query surface.
#[derive(Debug, Clone, Serialize)]
pub struct ImpactReport {
    pub meta: DiffMeta,
    pub risk: RiskAssessment,
    pub changes: Vec<ChangedNode>,
    pub impacted_by_category: BTreeMap<Category, Vec<String>>,
}

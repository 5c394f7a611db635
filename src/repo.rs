//! The library's single entry point: opens a repository's `.jnkn/`
//! directory, runs the incremental scan/stitch pipeline, and answers
//! blast-radius and diff queries against the persisted graph.
//!
//! `.jnkn/` is a direct rename of `canopy-core/src/cache.rs`'s `.canopy/`
//! convention (`cache_dir`/`ensure_cache_dir`) — same per-repo sidecar
//! directory, now holding a real store instead of a marker file.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::Serialize;
use sha2::{Digest, Sha256};

use jnkn_core::{Graph, ScanMetadata};
use jnkn_diff::{BlastResult, ChangedFile, ImpactReport};
use jnkn_extract::{Dispatcher, ParseItem};
use jnkn_store::{GraphStore, SqliteStore, StoreStats};

use crate::config::Config;
use crate::error::JnknError;
use crate::resolve;

/// Directory every `Repo` keeps its state under, relative to the repo root.
pub const STATE_DIR: &str = ".jnkn";
const DB_FILE: &str = "jnkn.db";
const CONFIG_FILE: &str = "config.yaml";

pub fn state_dir(root: &Path) -> PathBuf {
    root.join(STATE_DIR)
}

fn ensure_state_dir(root: &Path) -> Result<PathBuf, JnknError> {
    let dir = state_dir(root);
    std::fs::create_dir_all(&dir).map_err(|source| crate::config::ConfigError::Io { path: dir.clone(), source })?;
    Ok(dir)
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct ScanStats {
    pub files_considered: usize,
    pub files_parsed: usize,
    pub files_skipped_unchanged: usize,
    pub files_deleted: usize,
    pub nodes_total: usize,
    pub edges_total: usize,
    pub parse_errors: usize,
    pub stitched_edges_proposed: usize,
}

pub struct Repo {
    root: PathBuf,
    config: Config,
    store: SqliteStore,
}

impl Repo {
    /// Open (creating if absent) the `.jnkn/` store and config under
    /// `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, JnknError> {
        let root = root.into();
        let state_dir = ensure_state_dir(&root)?;

        let config_path = state_dir.join(CONFIG_FILE);
        let config = if config_path.exists() {
            Config::load(&config_path)?
        } else {
            Config::default()
        };

        let store = SqliteStore::open(state_dir.join(DB_FILE))?;

        Ok(Repo { root, config, store })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run an incremental scan: unchanged files (by content hash) are
    /// skipped; changed or removed files have their prior contribution
    /// deleted first (spec §4.2's "changed → delete-and-rescan"); new and
    /// changed files are parsed and merged, then the stitcher runs over the
    /// resulting graph.
    pub async fn scan(&mut self) -> Result<ScanStats, JnknError> {
        tracing::info!("Scanning repository: {}", self.root.display());
        let walk_options = jnkn_extract::WalkOptions {
            include: self.config.scan.include.clone(),
            exclude: self.config.scan.exclude.clone(),
        };
        let walker = jnkn_extract::Walker::new(self.root.clone(), &walk_options);
        let files = walker.walk();
        tracing::debug!("Walked {} candidate files", files.len());

        let stored_metadata: HashMap<String, ScanMetadata> =
            self.store.get_all_scan_metadata()?.into_iter().map(|m| (m.path.clone(), m)).collect();

        let mut seen_paths: HashSet<String> = HashSet::new();
        let mut to_parse: Vec<(PathBuf, Vec<u8>)> = Vec::new();
        let mut hashes: HashMap<String, String> = HashMap::new();
        let mut files_skipped_unchanged = 0usize;
        let mut files_deleted = 0usize;

        for (path, bytes) in files {
            let rel = path.to_string_lossy().replace('\\', "/");
            seen_paths.insert(rel.clone());
            let hash = format!("{:x}", Sha256::digest(&bytes));

            let unchanged = stored_metadata.get(&rel).is_some_and(|m| m.file_hash == hash);
            if unchanged {
                tracing::debug!("Unchanged, skipping: {}", rel);
                files_skipped_unchanged += 1;
                continue;
            }
            if stored_metadata.contains_key(&rel) {
                tracing::debug!("Changed, deleting prior nodes: {}", rel);
                self.store.delete_nodes_by_file(&rel)?;
                files_deleted += 1;
            }
            hashes.insert(rel, hash);
            to_parse.push((path, bytes));
        }

        for path in stored_metadata.keys().filter(|p| !seen_paths.contains(*p)) {
            tracing::debug!("Removed from filesystem, deleting prior nodes: {}", path);
            self.store.delete_nodes_by_file(path)?;
            files_deleted += 1;
        }

        let files_parsed = to_parse.len();
        let dispatcher = Arc::new(jnkn_extract::default_dispatcher());
        let mut graph = self.store.load_graph()?;
        let per_file_counts = count_contributions_as_parsed(&dispatcher, &to_parse);

        let outcome = jnkn_extract::scan_files(to_parse, dispatcher, |batch_graph| {
            // Every flush upserts the whole accumulated graph: SQLite
            // upserts are idempotent by id/triple, so repeated writes of
            // the same node/edge are harmless, and this avoids a second
            // bookkeeping structure just to compute the delta since the
            // last flush.
            let dict = batch_graph.to_dict();
            if let Err(err) = self.store.save_nodes_batch(&dict.nodes) {
                tracing::warn!("Batch flush failed to persist nodes: {}", err);
            }
            if let Err(err) = self.store.save_edges_batch(&dict.edges) {
                tracing::warn!("Batch flush failed to persist edges: {}", err);
            }
        })
        .await;

        for node in outcome.graph.all_nodes() {
            graph.add_node(node.clone());
        }
        for edge in outcome.graph.all_edges() {
            graph.add_edge(edge.clone());
        }

        let stitcher = jnkn_stitch::Stitcher::new(self.config.match_config());
        let stitched_edges_proposed = stitcher.run(&mut graph);
        tracing::debug!("Stitcher proposed {} edges", stitched_edges_proposed);
        drop_edges_below_confidence(&mut graph, self.config.scan.min_confidence);

        let dict = graph.to_dict();
        self.store.save_nodes_batch(&dict.nodes)?;
        self.store.save_edges_batch(&dict.edges)?;

        for (path, count) in per_file_counts {
            let Some(hash) = hashes.get(&path) else { continue };
            self.store.save_scan_metadata(&ScanMetadata {
                path: path.clone(),
                file_hash: hash.clone(),
                last_scanned: chrono::Utc::now(),
                node_count: count.0,
                edge_count: count.1,
            })?;
        }

        let stats = self.store.get_stats()?;
        tracing::info!(
            "Scan complete: {} parsed, {} unchanged, {} deleted, {} nodes, {} edges",
            files_parsed,
            files_skipped_unchanged,
            files_deleted,
            stats.total_nodes,
            stats.total_edges
        );
        Ok(ScanStats {
            files_considered: seen_paths.len(),
            files_parsed,
            files_skipped_unchanged,
            files_deleted,
            nodes_total: stats.total_nodes,
            edges_total: stats.total_edges,
            parse_errors: outcome.parse_errors,
            stitched_edges_proposed,
        })
    }

    /// Blast radius of `artifact_ids` over the persisted graph. Each id may
    /// be a full id or a substring the resolver expands.
    pub fn blast(&self, artifact_ids: &[String], max_depth: Option<u32>) -> Result<BlastResult, JnknError> {
        let graph = self.store.load_graph()?;
        let resolved = resolve::resolve_many(&graph, artifact_ids)?;
        Ok(jnkn_diff::blast_radius(&graph, &resolved, max_depth))
    }

    /// Diff two already-loaded graph snapshots (this crate never invokes a
    /// VCS itself — see spec's Non-goals — so `base`/`head` are supplied by
    /// the caller, e.g. two `Repo::graph()` snapshots from different
    /// checkouts).
    pub fn diff(
        &self,
        base: &Graph,
        head: &Graph,
        base_ref: &str,
        head_ref: &str,
        changed_files: &[ChangedFile],
        max_depth: Option<u32>,
    ) -> Result<ImpactReport, JnknError> {
        let critical_paths = build_glob_set(&self.config.risk.critical_paths);
        Ok(jnkn_diff::diff(base, head, base_ref, head_ref, changed_files, max_depth, &critical_paths))
    }

    /// The full persisted graph, e.g. to use as one side of `diff`.
    pub fn graph(&self) -> Result<Graph, JnknError> {
        Ok(self.store.load_graph()?)
    }

    pub fn stats(&self) -> Result<StoreStats, JnknError> {
        Ok(self.store.get_stats()?)
    }

    pub fn clear(&mut self) -> Result<(), JnknError> {
        Ok(self.store.clear()?)
    }
}

fn build_glob_set(patterns: &[String]) -> GlobSet {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        if let Ok(glob) = Glob::new(pattern) {
            builder.add(glob);
        }
    }
    builder.build().unwrap_or_else(|_| GlobSetBuilder::new().build().unwrap())
}

fn drop_edges_below_confidence(graph: &mut Graph, min_confidence: f32) {
    let to_drop: Vec<_> = graph
        .all_edges()
        .filter(|e| e.confidence < min_confidence)
        .map(|e| (e.source_id.clone(), e.target_id.clone(), e.edge_type))
        .collect();
    for (source, target, edge_type) in to_drop {
        graph.remove_edge(&source, &target, edge_type);
    }
}

/// Dispatch each to-be-parsed file once, just to attribute a node/edge
/// count to its path for `scan_metadata` — the real merge happens
/// concurrently in `scan_files`, so this is a second, single-threaded pass
/// purely for bookkeeping.
fn count_contributions_as_parsed(dispatcher: &Dispatcher, files: &[(PathBuf, Vec<u8>)]) -> Vec<(String, (u64, u64))> {
    files
        .iter()
        .map(|(path, bytes)| {
            let rel = path.to_string_lossy().replace('\\', "/");
            let items = dispatcher.dispatch(path, bytes);
            let (nodes, edges) = items.iter().fold((0u64, 0u64), |(n, e), item| match item {
                ParseItem::Node(_) => (n + 1, e),
                ParseItem::Edge(_) => (n, e + 1),
            });
            (rel, (nodes, edges))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scan_is_idempotent_on_an_unchanged_repo() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("app.py"), b"db = os.getenv(\"DATABASE_URL\")\n").unwrap();

        let mut repo = Repo::open(dir.path()).unwrap();
        let first = repo.scan().await.unwrap();
        assert_eq!(first.files_parsed, 1);
        assert_eq!(first.files_skipped_unchanged, 0);

        let second = repo.scan().await.unwrap();
        assert_eq!(second.files_parsed, 0);
        assert_eq!(second.files_skipped_unchanged, 1);
        assert_eq!(second.nodes_total, first.nodes_total);
    }

    #[tokio::test]
    async fn changed_file_is_rescanned_and_removed_file_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.py");
        std::fs::write(&path, b"db = os.getenv(\"DATABASE_URL\")\n").unwrap();

        let mut repo = Repo::open(dir.path()).unwrap();
        repo.scan().await.unwrap();

        std::fs::write(&path, b"cache = os.getenv(\"CACHE_URL\")\n").unwrap();
        let second = repo.scan().await.unwrap();
        assert_eq!(second.files_deleted, 1);
        assert_eq!(second.files_parsed, 1);

        let graph = repo.graph().unwrap();
        assert!(graph.get_node("env:CACHE_URL").is_some());
        assert!(graph.get_node("env:DATABASE_URL").is_none());

        std::fs::remove_file(&path).unwrap();
        let third = repo.scan().await.unwrap();
        assert_eq!(third.files_deleted, 1);
        assert_eq!(repo.graph().unwrap().get_node("env:CACHE_URL"), None);
    }

    #[tokio::test]
    async fn blast_resolves_a_substring_artifact_id() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("app.py"), b"db = os.getenv(\"DATABASE_URL\")\n").unwrap();

        let mut repo = Repo::open(dir.path()).unwrap();
        repo.scan().await.unwrap();

        let result = repo.blast(&["DATABASE_URL".to_string()], None).unwrap();
        assert_eq!(result.source_artifacts, vec!["env:DATABASE_URL".to_string()]);
    }
}

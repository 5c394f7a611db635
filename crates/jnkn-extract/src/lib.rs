//! Polyglot repository walker, dispatcher, and per-format extractors.
//!
//! Pipeline shape: `walker` → `dispatcher` → per-format `parsers` → `merge`
//! into a `jnkn_core::Graph`. Grounded on `canopy-indexer/src/parser_pool.rs`'s
//! worker-pool-over-a-channel shape (there: one `tree-sitter` parser per
//! worker thread; here: one extraction pipeline per `rayon` task), feeding a
//! single merger task that drains a bounded `tokio::sync::mpsc` channel and
//! calls `Graph::add_node`/`add_edge` sequentially.

pub mod context;
pub mod data;
pub mod dispatcher;
pub mod infra;
pub mod languages;
pub mod lineage;
pub mod parser;
pub mod validation;
pub mod walker;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use jnkn_core::{Graph, Node};

pub use dispatcher::Dispatcher;
pub use parser::{ParseItem, Parser};
pub use walker::{WalkOptions, Walker};

/// Edges merged between flushes before `on_batch` is invoked, even if the
/// 50ms timer hasn't fired yet.
const BATCH_EDGE_THRESHOLD: usize = 1_000;
/// Upper bound on how long a caller waits to see merged edges, even under
/// low scan throughput.
const BATCH_FLUSH_INTERVAL: Duration = Duration::from_millis(50);

/// The full parser roster, one per recognized file format. Several parsers
/// may legitimately claim the same file (a `.py` file can be both a
/// `PythonParser` and a `PySparkParser` match; a `.json` file could be a
/// Terraform plan or an OpenLineage event) — the dispatcher runs every
/// match and merges their output.
pub fn default_dispatcher() -> Dispatcher {
    Dispatcher::new(vec![
        Box::new(languages::python::PythonParser),
        Box::new(languages::javascript::JavaScriptParser),
        Box::new(languages::go::GoParser),
        Box::new(languages::java::JavaParser),
        Box::new(infra::terraform::TerraformParser),
        Box::new(infra::terraform_plan::TerraformPlanParser),
        Box::new(infra::kubernetes::KubernetesParser),
        Box::new(data::dbt::DbtSqlParser),
        Box::new(data::dbt::DbtManifestParser),
        Box::new(data::pyspark::PySparkParser),
        Box::new(lineage::openlineage::OpenLineageParser),
    ])
}

/// Result of a full repository scan.
pub struct ScanOutcome {
    pub graph: Graph,
    pub files_scanned: usize,
    pub parse_errors: usize,
}

/// Walk `root`, dispatch every file to every matching parser on its own
/// `rayon` task, and merge the results into a single `Graph` on one merger
/// task. `on_batch` is invoked every [`BATCH_EDGE_THRESHOLD`] edges merged
/// or [`BATCH_FLUSH_INTERVAL`] elapsed, whichever comes first, so a caller
/// (typically the store layer) can persist incrementally instead of
/// waiting for the whole scan to finish.
pub async fn scan_repository(
    root: impl Into<PathBuf>,
    walk_options: &WalkOptions,
    dispatcher: Arc<Dispatcher>,
    on_batch: impl FnMut(&Graph),
) -> ScanOutcome {
    let walker = Walker::new(root.into(), walk_options);
    let files = walker.walk();
    scan_files(files, dispatcher, on_batch).await
}

/// Same pipeline as [`scan_repository`], but over an explicit file list
/// instead of a fresh walk. Lets a caller (the facade's incremental
/// scanner) decide which files actually need re-parsing — e.g. skipping
/// ones whose content hash hasn't changed since the last scan — while
/// still getting the same bounded-channel concurrency and batch flushing.
pub async fn scan_files(
    files: Vec<(PathBuf, Vec<u8>)>,
    dispatcher: Arc<Dispatcher>,
    mut on_batch: impl FnMut(&Graph),
) -> ScanOutcome {
    let files_scanned = files.len();

    let (tx, mut rx) = tokio::sync::mpsc::channel::<Vec<ParseItem>>(256);

    for (path, bytes) in files {
        let tx = tx.clone();
        let dispatcher = Arc::clone(&dispatcher);
        rayon::spawn(move || {
            let items = dispatcher.dispatch(&path, &bytes);
            let _ = tx.blocking_send(items);
        });
    }
    drop(tx);

    let mut graph = Graph::new();
    let mut parse_errors = 0usize;
    let mut edges_since_flush = 0usize;
    let mut ticker = tokio::time::interval(BATCH_FLUSH_INTERVAL);

    loop {
        tokio::select! {
            received = rx.recv() => {
                let Some(items) = received else { break };
                for item in items {
                    match item {
                        ParseItem::Node(node) => {
                            if node.metadata.get(Node::PARSE_ERROR).is_some() {
                                parse_errors += 1;
                            }
                            graph.add_node(node);
                        }
                        ParseItem::Edge(edge) => {
                            graph.add_edge(edge);
                            edges_since_flush += 1;
                        }
                    }
                }
                if edges_since_flush >= BATCH_EDGE_THRESHOLD {
                    on_batch(&graph);
                    edges_since_flush = 0;
                }
            }
            _ = ticker.tick() => {
                if edges_since_flush > 0 {
                    on_batch(&graph);
                    edges_since_flush = 0;
                }
            }
        }
    }

    if edges_since_flush > 0 {
        on_batch(&graph);
    }

    ScanOutcome { graph, files_scanned, parse_errors }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[tokio::test]
    async fn scans_a_small_polyglot_repo_into_one_graph() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("app.py"), b"db = os.getenv(\"DATABASE_URL\")\n").unwrap();
        fs::write(
            dir.path().join("main.tf"),
            b"resource \"aws_db_instance\" \"db\" {\n  identifier = \"db\"\n}\n",
        )
        .unwrap();

        let dispatcher = Arc::new(default_dispatcher());
        let mut batches = 0;
        let outcome = scan_repository(dir.path(), &WalkOptions::default(), dispatcher, |_graph| {
            batches += 1;
        })
        .await;

        assert_eq!(outcome.files_scanned, 2);
        assert_eq!(outcome.parse_errors, 0);
        assert!(outcome.graph.get_node("env:DATABASE_URL").is_some());
        assert!(outcome.graph.get_node("infra:aws_db_instance.db").is_some());
    }
}

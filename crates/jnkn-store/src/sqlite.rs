//! SQLite-backed `GraphStore`: a single `.jnkn/jnkn.db` file holding the
//! four relations of the data model, with recursive-CTE traversal so
//! `query_descendants`/`query_ancestors` don't need the whole graph loaded
//! into memory.
//!
//! Grounded on `josongsong-semantica-codegraph`'s choice of `rusqlite`
//! (`bundled`) for an embedded single-file graph store — the teacher has no
//! SQL backend of its own, only the JSON cache-marker completed in
//! [`crate::json`].

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension};

use jnkn_core::{Edge, EdgeType, Graph, GraphDict, Node, NodeType, ScanMetadata};

use crate::error::StoreError;
use crate::traits::{GraphStore, StoreStats};

/// Current on-disk schema version. Bump and add a migration branch in
/// `open` when the relations change shape.
const SCHEMA_VERSION: i64 = 1;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS nodes (
    id          TEXT PRIMARY KEY,
    type        TEXT NOT NULL,
    name        TEXT NOT NULL,
    path        TEXT,
    language    TEXT,
    file_hash   TEXT,
    tokens      BLOB NOT NULL,
    metadata    BLOB NOT NULL
);

CREATE TABLE IF NOT EXISTS edges (
    source_id   TEXT NOT NULL,
    target_id   TEXT NOT NULL,
    type        TEXT NOT NULL,
    confidence  REAL NOT NULL,
    metadata    BLOB NOT NULL,
    PRIMARY KEY (source_id, target_id, type),
    FOREIGN KEY (source_id) REFERENCES nodes(id) ON DELETE CASCADE,
    FOREIGN KEY (target_id) REFERENCES nodes(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS scan_metadata (
    path         TEXT PRIMARY KEY,
    file_hash    TEXT NOT NULL,
    last_scanned TEXT NOT NULL,
    node_count   INTEGER NOT NULL,
    edge_count   INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_nodes_path ON nodes(path);
CREATE INDEX IF NOT EXISTS idx_edges_target ON edges(target_id);
"#;

pub struct SqliteStore {
    conn: Connection,
    path: PathBuf,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "foreign_keys", true)?;
        conn.execute_batch(SCHEMA_SQL)?;

        let found: Option<i64> = conn.query_row("SELECT version FROM schema_version LIMIT 1", [], |row| row.get(0)).optional()?;
        match found {
            None => {
                conn.execute("INSERT INTO schema_version (version) VALUES (?1)", params![SCHEMA_VERSION])?;
            }
            Some(v) if v == SCHEMA_VERSION => {}
            Some(v) if v > SCHEMA_VERSION => {
                return Err(StoreError::SchemaMismatch { path, found: v, expected: SCHEMA_VERSION });
            }
            Some(_older) => {
                // No migrations defined yet; the only version that has ever
                // shipped is 1.
                conn.execute("UPDATE schema_version SET version = ?1", params![SCHEMA_VERSION])?;
            }
        }

        tracing::debug!(path = %path.display(), "opened sqlite store");
        Ok(SqliteStore { conn, path })
    }

    fn schema_version(&self) -> Result<i64, StoreError> {
        Ok(self.conn.query_row("SELECT version FROM schema_version LIMIT 1", [], |row| row.get(0))?)
    }
}

fn node_type_str(t: NodeType) -> &'static str {
    match t {
        NodeType::CodeFile => "code_file",
        NodeType::CodeEntity => "code_entity",
        NodeType::EnvVar => "env_var",
        NodeType::InfraResource => "infra_resource",
        NodeType::ConfigKey => "config_key",
        NodeType::DataAsset => "data_asset",
        NodeType::Job => "job",
        NodeType::Unknown => "unknown",
    }
}

fn node_type_from_str(s: &str) -> Result<NodeType, StoreError> {
    Ok(match s {
        "code_file" => NodeType::CodeFile,
        "code_entity" => NodeType::CodeEntity,
        "env_var" => NodeType::EnvVar,
        "infra_resource" => NodeType::InfraResource,
        "config_key" => NodeType::ConfigKey,
        "data_asset" => NodeType::DataAsset,
        "job" => NodeType::Job,
        "unknown" => NodeType::Unknown,
        other => return Err(StoreError::Corrupted(format!("unknown node type {other:?}"))),
    })
}

fn edge_type_str(t: EdgeType) -> &'static str {
    match t {
        EdgeType::Imports => "imports",
        EdgeType::Reads => "reads",
        EdgeType::Writes => "writes",
        EdgeType::Provides => "provides",
        EdgeType::Provisions => "provisions",
        EdgeType::Contains => "contains",
        EdgeType::DependsOn => "depends_on",
    }
}

fn edge_type_from_str(s: &str) -> Result<EdgeType, StoreError> {
    Ok(match s {
        "imports" => EdgeType::Imports,
        "reads" => EdgeType::Reads,
        "writes" => EdgeType::Writes,
        "provides" => EdgeType::Provides,
        "provisions" => EdgeType::Provisions,
        "contains" => EdgeType::Contains,
        "depends_on" => EdgeType::DependsOn,
        other => return Err(StoreError::Corrupted(format!("unknown edge type {other:?}"))),
    })
}

fn row_to_node(row: &rusqlite::Row) -> rusqlite::Result<Result<Node, StoreError>> {
    let id: String = row.get(0)?;
    let type_str: String = row.get(1)?;
    let name: String = row.get(2)?;
    let path: Option<String> = row.get(3)?;
    let language: Option<String> = row.get(4)?;
    let file_hash: Option<String> = row.get(5)?;
    let tokens_blob: Vec<u8> = row.get(6)?;
    let metadata_blob: Vec<u8> = row.get(7)?;

    let node = (|| -> Result<Node, StoreError> {
        let node_type = node_type_from_str(&type_str)?;
        let tokens: Vec<String> = serde_json::from_slice(&tokens_blob)?;
        let metadata: BTreeMap<String, serde_json::Value> = serde_json::from_slice(&metadata_blob)?;
        Ok(Node {
            id,
            name,
            node_type,
            path,
            language,
            file_hash,
            tokens,
            metadata,
        })
    })();
    Ok(node)
}

fn row_to_edge(row: &rusqlite::Row) -> rusqlite::Result<Result<Edge, StoreError>> {
    let source_id: String = row.get(0)?;
    let target_id: String = row.get(1)?;
    let type_str: String = row.get(2)?;
    let confidence: f64 = row.get(3)?;
    let metadata_blob: Vec<u8> = row.get(4)?;

    let edge = (|| -> Result<Edge, StoreError> {
        let edge_type = edge_type_from_str(&type_str)?;
        let metadata: BTreeMap<String, serde_json::Value> = serde_json::from_slice(&metadata_blob)?;
        Ok(Edge { source_id, target_id, edge_type, confidence: confidence as f32, metadata })
    })();
    Ok(edge)
}

impl GraphStore for SqliteStore {
    fn save_nodes_batch(&mut self, nodes: &[Node]) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO nodes (id, type, name, path, language, file_hash, tokens, metadata)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(id) DO UPDATE SET
                    type = excluded.type, name = excluded.name, path = excluded.path,
                    language = excluded.language, file_hash = excluded.file_hash,
                    tokens = excluded.tokens, metadata = excluded.metadata",
            )?;
            for node in nodes {
                let tokens_blob = serde_json::to_vec(&node.tokens)?;
                let metadata_blob = serde_json::to_vec(&node.metadata)?;
                stmt.execute(params![
                    node.id,
                    node_type_str(node.node_type),
                    node.name,
                    node.path,
                    node.language,
                    node.file_hash,
                    tokens_blob,
                    metadata_blob,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn save_edges_batch(&mut self, edges: &[Edge]) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO edges (source_id, target_id, type, confidence, metadata)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(source_id, target_id, type) DO UPDATE SET
                    confidence = excluded.confidence, metadata = excluded.metadata",
            )?;
            for edge in edges {
                let metadata_blob = serde_json::to_vec(&edge.metadata)?;
                stmt.execute(params![
                    edge.source_id,
                    edge.target_id,
                    edge_type_str(edge.edge_type),
                    edge.confidence as f64,
                    metadata_blob,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn delete_nodes_by_file(&mut self, path: &str) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM nodes WHERE path = ?1", params![path])?;
        tx.commit()?;
        Ok(())
    }

    fn get_all_scan_metadata(&self) -> Result<Vec<ScanMetadata>, StoreError> {
        let mut stmt = self.conn.prepare("SELECT path, file_hash, last_scanned, node_count, edge_count FROM scan_metadata")?;
        let rows = stmt.query_map([], |row| {
            let path: String = row.get(0)?;
            let file_hash: String = row.get(1)?;
            let last_scanned: String = row.get(2)?;
            let node_count: i64 = row.get(3)?;
            let edge_count: i64 = row.get(4)?;
            Ok((path, file_hash, last_scanned, node_count, edge_count))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (path, file_hash, last_scanned, node_count, edge_count) = row?;
            let last_scanned = chrono::DateTime::parse_from_rfc3339(&last_scanned)
                .map_err(|e| StoreError::Corrupted(format!("bad last_scanned timestamp: {e}")))?
                .with_timezone(&chrono::Utc);
            out.push(ScanMetadata {
                path,
                file_hash,
                last_scanned,
                node_count: node_count as u64,
                edge_count: edge_count as u64,
            });
        }
        Ok(out)
    }

    fn save_scan_metadata(&mut self, metadata: &ScanMetadata) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO scan_metadata (path, file_hash, last_scanned, node_count, edge_count)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(path) DO UPDATE SET
                file_hash = excluded.file_hash, last_scanned = excluded.last_scanned,
                node_count = excluded.node_count, edge_count = excluded.edge_count",
            params![
                metadata.path,
                metadata.file_hash,
                metadata.last_scanned.to_rfc3339(),
                metadata.node_count as i64,
                metadata.edge_count as i64,
            ],
        )?;
        Ok(())
    }

    fn query_descendants(&self, id: &str, max_depth: Option<u32>) -> Result<HashSet<String>, StoreError> {
        traverse(&self.conn, id, max_depth, Direction::Forward)
    }

    fn query_ancestors(&self, id: &str, max_depth: Option<u32>) -> Result<HashSet<String>, StoreError> {
        traverse(&self.conn, id, max_depth, Direction::Backward)
    }

    fn load_graph(&self) -> Result<Graph, StoreError> {
        let mut node_stmt = self.conn.prepare("SELECT id, type, name, path, language, file_hash, tokens, metadata FROM nodes")?;
        let nodes: Vec<Node> = node_stmt
            .query_map([], row_to_node)?
            .collect::<rusqlite::Result<Vec<_>>>()?
            .into_iter()
            .collect::<Result<Vec<_>, _>>()?;

        let mut edge_stmt = self.conn.prepare("SELECT source_id, target_id, type, confidence, metadata FROM edges")?;
        let edges: Vec<Edge> = edge_stmt
            .query_map([], row_to_edge)?
            .collect::<rusqlite::Result<Vec<_>>>()?
            .into_iter()
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Graph::from_dict(GraphDict { nodes, edges }))
    }

    fn get_stats(&self) -> Result<StoreStats, StoreError> {
        let total_nodes: i64 = self.conn.query_row("SELECT COUNT(*) FROM nodes", [], |r| r.get(0))?;
        let total_edges: i64 = self.conn.query_row("SELECT COUNT(*) FROM edges", [], |r| r.get(0))?;
        let tracked_files: i64 = self.conn.query_row("SELECT COUNT(*) FROM scan_metadata", [], |r| r.get(0))?;

        let mut nodes_by_type = BTreeMap::new();
        let mut stmt = self.conn.prepare("SELECT type, COUNT(*) FROM nodes GROUP BY type")?;
        for row in stmt.query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)?)))? {
            let (t, count) = row?;
            nodes_by_type.insert(t, count as usize);
        }

        let mut edges_by_type = BTreeMap::new();
        let mut stmt = self.conn.prepare("SELECT type, COUNT(*) FROM edges GROUP BY type")?;
        for row in stmt.query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)?)))? {
            let (t, count) = row?;
            edges_by_type.insert(t, count as usize);
        }

        let db_size_bytes = std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0);

        Ok(StoreStats {
            schema_version: self.schema_version()?,
            total_nodes: total_nodes as usize,
            total_edges: total_edges as usize,
            tracked_files: tracked_files as usize,
            nodes_by_type,
            edges_by_type,
            db_size_bytes,
        })
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM edges", [])?;
        tx.execute("DELETE FROM nodes", [])?;
        tx.execute("DELETE FROM scan_metadata", [])?;
        tx.commit()?;
        self.conn.execute("VACUUM", [])?;
        Ok(())
    }

    fn close(&mut self) -> Result<(), StoreError> {
        self.conn.execute("PRAGMA optimize", [])?;
        Ok(())
    }
}

enum Direction {
    Forward,
    Backward,
}

fn traverse(conn: &Connection, id: &str, max_depth: Option<u32>, dir: Direction) -> Result<HashSet<String>, StoreError> {
    let (from_col, to_col) = match dir {
        Direction::Forward => ("source_id", "target_id"),
        Direction::Backward => ("target_id", "source_id"),
    };
    let depth_limit = max_depth.map(|d| d as i64).unwrap_or(-1);

    // `visited` tracks every id already on this walk's path, independent of
    // `depth`: without it, a cycle makes `(id, depth)` distinct forever
    // (depth keeps incrementing) and the recursion never terminates when
    // `max_depth` is None. `char(30)` (record separator) delimits ids in
    // the path string; it's not a character any stored id is expected to
    // contain.
    let sql = format!(
        "WITH RECURSIVE walk(id, depth, visited) AS (
            SELECT {to_col}, 1, char(30) || {from_col} || char(30) || {to_col} || char(30)
            FROM edges WHERE {from_col} = ?1
            UNION ALL
            SELECT e.{to_col}, w.depth + 1, w.visited || e.{to_col} || char(30)
            FROM edges e JOIN walk w ON e.{from_col} = w.id
            WHERE (?2 < 0 OR w.depth < ?2)
              AND instr(w.visited, char(30) || e.{to_col} || char(30)) = 0
        )
        SELECT DISTINCT id FROM walk"
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![id, depth_limit], |row| row.get::<_, String>(0))?;
    let mut out = HashSet::new();
    for row in rows {
        out.insert(row?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, node_type: NodeType) -> Node {
        Node::new(id, id, node_type)
    }

    #[test]
    fn save_and_reload_round_trips_the_graph() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = SqliteStore::open(dir.path().join("jnkn.db")).unwrap();

        store.save_nodes_batch(&[node("file://a.py", NodeType::CodeFile), node("env:DB_HOST", NodeType::EnvVar)]).unwrap();
        store.save_edges_batch(&[Edge::observed("file://a.py", "env:DB_HOST", EdgeType::Reads)]).unwrap();

        let graph = store.load_graph().unwrap();
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn upsert_overwrites_rather_than_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = SqliteStore::open(dir.path().join("jnkn.db")).unwrap();
        store.save_nodes_batch(&[node("file://a.py", NodeType::CodeFile)]).unwrap();
        store.save_nodes_batch(&[node("file://a.py", NodeType::CodeFile).with_path("/repo/a.py")]).unwrap();

        let stats = store.get_stats().unwrap();
        assert_eq!(stats.total_nodes, 1);
    }

    #[test]
    fn delete_nodes_by_file_cascades_to_edges() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = SqliteStore::open(dir.path().join("jnkn.db")).unwrap();

        let mut a = node("file://a.py", NodeType::CodeFile);
        a.path = Some("/repo/a.py".into());
        store.save_nodes_batch(&[a, node("env:DB_HOST", NodeType::EnvVar)]).unwrap();
        store.save_edges_batch(&[Edge::observed("file://a.py", "env:DB_HOST", EdgeType::Reads)]).unwrap();

        store.delete_nodes_by_file("/repo/a.py").unwrap();

        let stats = store.get_stats().unwrap();
        assert_eq!(stats.total_edges, 0);
        assert_eq!(stats.total_nodes, 1);
    }

    #[test]
    fn query_descendants_respects_depth_limit() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = SqliteStore::open(dir.path().join("jnkn.db")).unwrap();
        store
            .save_nodes_batch(&[node("a", NodeType::CodeFile), node("b", NodeType::CodeFile), node("c", NodeType::CodeFile)])
            .unwrap();
        store
            .save_edges_batch(&[
                Edge::observed("a", "b", EdgeType::Imports),
                Edge::observed("b", "c", EdgeType::Imports),
            ])
            .unwrap();

        let unbounded = store.query_descendants("a", None).unwrap();
        assert_eq!(unbounded, HashSet::from(["b".to_string(), "c".to_string()]));

        let limited = store.query_descendants("a", Some(1)).unwrap();
        assert_eq!(limited, HashSet::from(["b".to_string()]));
    }

    #[test]
    fn query_descendants_terminates_on_a_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = SqliteStore::open(dir.path().join("jnkn.db")).unwrap();
        store
            .save_nodes_batch(&[node("a", NodeType::CodeFile), node("b", NodeType::CodeFile), node("c", NodeType::CodeFile)])
            .unwrap();
        store
            .save_edges_batch(&[
                Edge::observed("a", "b", EdgeType::Imports),
                Edge::observed("b", "c", EdgeType::Imports),
                Edge::observed("c", "a", EdgeType::Imports),
            ])
            .unwrap();

        let descendants = store.query_descendants("a", None).unwrap();
        assert_eq!(descendants, HashSet::from(["b".to_string(), "c".to_string()]));

        let ancestors = store.query_ancestors("a", None).unwrap();
        assert_eq!(ancestors, HashSet::from(["b".to_string(), "c".to_string()]));
    }

    #[test]
    fn query_ancestors_is_reverse_of_descendants() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = SqliteStore::open(dir.path().join("jnkn.db")).unwrap();
        store
            .save_edges_batch(&[
                Edge::observed("main.py", "app.py", EdgeType::Imports),
                Edge::observed("app.py", "env:DB_HOST", EdgeType::Reads),
            ])
            .unwrap();

        let up = store.query_ancestors("env:DB_HOST", None).unwrap();
        assert_eq!(up, HashSet::from(["main.py".to_string(), "app.py".to_string()]));
    }

    #[test]
    fn reopening_an_existing_store_preserves_data() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("jnkn.db");
        {
            let mut store = SqliteStore::open(&db_path).unwrap();
            store.save_nodes_batch(&[node("file://a.py", NodeType::CodeFile)]).unwrap();
        }
        let store = SqliteStore::open(&db_path).unwrap();
        assert_eq!(store.get_stats().unwrap().total_nodes, 1);
    }
}

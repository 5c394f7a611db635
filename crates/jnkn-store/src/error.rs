//! Store error type.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store schema version mismatch: found {found}, expected {expected} (path: {path})")]
    SchemaMismatch { path: PathBuf, found: i64, expected: i64 },

    #[error("store data is corrupted: {0}")]
    Corrupted(String),

    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store SQL error: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("store JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

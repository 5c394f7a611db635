//! Closed top-level error kinds surfaced by `Repo`'s public methods.

use thiserror::Error;

pub use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum JnknError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] jnkn_store::StoreError),

    /// A parser failed on a specific file. This never actually escapes a
    /// `Repo` method in practice — a parse failure is recovered locally by
    /// the dispatcher (the file node is emitted with `parse_error: true`
    /// and retried on the next scan) — but the variant is kept so the
    /// error enum matches the documented closed set.
    #[error("parse error: {0}")]
    Parse(String),

    #[error("ambiguous artifact identifier {query:?}: candidates {candidates:?}")]
    Ambiguous { query: String, candidates: Vec<String> },

    #[error("operation cancelled")]
    Cancelled,
}

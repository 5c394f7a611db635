//! Errors raised by the graph model itself (distinct from the closed error
//! kinds of the pipeline/store/facade — see `jnkn::JnknError`).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("malformed graph document: {0}")]
    InvalidDocument(String),
}

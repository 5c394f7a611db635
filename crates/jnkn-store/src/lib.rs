//! Persistent backends for the dependency graph: a `rusqlite`-backed
//! `SqliteStore` for incremental, queryable storage, and a single-document
//! `JsonStore` for small repos and portability. Both implement the same
//! [`GraphStore`] trait so the facade crate can pick a backend without the
//! rest of the pipeline caring which one is in use.

pub mod error;
pub mod json;
pub mod sqlite;
pub mod traits;

pub use error::StoreError;
pub use json::JsonStore;
pub use sqlite::SqliteStore;
pub use traits::{GraphStore, StoreStats};

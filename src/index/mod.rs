//! Per-application tantivy indices and the store that owns them.
//!
//! Each application name maps to one index directory under a configured
//! root; the directory name doubles as the application name. The store
//! opens indices lazily, caches the handles, and can resolve a set of
//! application names to a combined handle queried as a logical union.

pub mod document;
pub mod schema;
pub mod store;

pub use document::{document_to_view, record_to_document};
pub use schema::LogSchema;
pub use store::{AppIndex, IndexStore, MultiHandle};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Tantivy error: {0}")]
    Tantivy(#[from] tantivy::TantivyError),

    #[error("Invalid application name: {0}")]
    InvalidAppName(String),

    #[error("Malformed stored document: {0}")]
    MalformedDocument(String),
}

pub type IndexResult<T> = Result<T, IndexError>;

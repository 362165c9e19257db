//! Search over one or more application indices.
//!
//! A declarative [`SearchConfiguration`] is compiled into a tantivy boolean
//! query by [`query`], executed by [`LogSearcher`] with an ascending
//! `log_time` sort, and mapped back to typed [`crate::model::LogView`]s.

pub mod config;
pub mod query;
pub mod searcher;

pub use config::{SearchConfiguration, SearchMethod, WantAll};
pub use searcher::{LogSearcher, MonitorQuery};

use thiserror::Error;

use crate::index::IndexError;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Invalid search configuration: {0}")]
    Validation(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    #[error("Tantivy error: {0}")]
    Tantivy(#[from] tantivy::TantivyError),
}

pub type SearchResult<T> = Result<T, SearchError>;

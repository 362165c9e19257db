use miette::Diagnostic;
use thiserror::Error;

use crate::alert::AlertError;
use crate::index::IndexError;
use crate::search::SearchError;

/// Crate-level error type with miette diagnostics for user-facing callers.
///
/// Subsystems keep their own narrow error enums; this type aggregates them
/// at the API boundary.
#[derive(Error, Debug, Diagnostic)]
pub enum AppError {
    #[error("IO error: {0}")]
    #[diagnostic(code(logvault::io_error))]
    Io(#[from] std::io::Error),

    #[error("Validation error: {0}")]
    #[diagnostic(
        code(logvault::validation_error),
        help("Check that the search configuration has at least one active filter or a want-all mode")
    )]
    Validation(String),

    #[error("Index error: {0}")]
    #[diagnostic(code(logvault::index_error))]
    Index(#[from] IndexError),

    #[error("Search error: {0}")]
    #[diagnostic(
        code(logvault::search_error),
        help("Try simplifying the query or checking the index status")
    )]
    Search(#[from] SearchError),

    #[error("Alert compilation error: {0}")]
    #[diagnostic(
        code(logvault::alert_error),
        help("Check the rule's field names, operators and values")
    )]
    Alert(#[from] AlertError),

    #[error("Configuration error: {0}")]
    #[diagnostic(code(logvault::config_error))]
    Config(String),

    #[error("Not found: {0}")]
    #[diagnostic(code(logvault::not_found))]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, AppError>;

//! Declarative search configuration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{SearchError, SearchResult};
use crate::model::LogLevel;

/// How the `query` string is interpreted.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SearchMethod {
    /// The query string is handed verbatim to the text engine, scoped to
    /// the configured fields.
    FreeText,
    /// Each active filter becomes a sub-clause; clauses are ANDed.
    #[default]
    Structured,
}

/// Bypass every filter and return all records of the given kind.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum WantAll {
    Log,
    Exception,
}

/// A validated, declarative description of one search.
///
/// Construction is cheap; [`SearchConfiguration::validate`] must pass
/// before execution. An unfiltered configuration without a want-all mode is
/// invalid rather than silently empty.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct SearchConfiguration {
    /// Fields the free-text query is scoped to (schema names or the
    /// original `Text` / `SourceFileName` spellings). Empty means `text`.
    pub fields: Vec<String>,
    pub method: SearchMethod,
    pub query: Option<String>,
    pub date_start: Option<DateTime<Utc>>,
    pub date_end: Option<DateTime<Utc>>,
    pub monitor_id: Option<String>,
    /// Level names; a record matches when its level bitset intersects any
    /// requested level.
    pub log_levels: Vec<String>,
    pub group_depth: Option<u32>,
    pub max_result: usize,
    pub want_all: Option<WantAll>,
}

impl SearchConfiguration {
    pub fn new(max_result: usize) -> Self {
        Self {
            max_result,
            ..Default::default()
        }
    }

    pub fn with_fields(mut self, fields: &[&str]) -> Self {
        self.fields = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn with_method(mut self, method: SearchMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_date_range(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.date_start = Some(start);
        self.date_end = Some(end);
        self
    }

    pub fn with_monitor_id(mut self, monitor_id: impl Into<String>) -> Self {
        self.monitor_id = Some(monitor_id.into());
        self
    }

    pub fn with_log_levels(mut self, levels: &[&str]) -> Self {
        self.log_levels = levels.iter().map(|l| l.to_string()).collect();
        self
    }

    pub fn with_group_depth(mut self, depth: u32) -> Self {
        self.group_depth = Some(depth);
        self
    }

    /// Switch to want-all mode: every filter is bypassed and all records
    /// of the given kind match.
    pub fn search_all(mut self, want: WantAll) -> Self {
        self.want_all = Some(want);
        self
    }

    /// Whether any filter clause is active.
    pub fn has_filters(&self) -> bool {
        self.query.as_deref().is_some_and(|q| !q.trim().is_empty())
            || (self.date_start.is_some() && self.date_end.is_some())
            || self.monitor_id.is_some()
            || !self.log_levels.is_empty()
            || self.group_depth.is_some()
    }

    /// Check the configuration before compilation. Errors, never silently
    /// empty results.
    pub fn validate(&self) -> SearchResult<()> {
        if self.max_result == 0 {
            return Err(SearchError::Validation(
                "max_result must be greater than zero".into(),
            ));
        }
        if self.want_all.is_none() && !self.has_filters() {
            return Err(SearchError::Validation(
                "configuration has neither a filter nor a want-all mode".into(),
            ));
        }
        if let (Some(start), Some(end)) = (self.date_start, self.date_end) {
            if start > end {
                return Err(SearchError::Validation(format!(
                    "date range is inverted: {start} > {end}"
                )));
            }
        }
        for name in &self.log_levels {
            if LogLevel::parse_name(name).is_none() {
                return Err(SearchError::Validation(format!(
                    "unknown log level `{name}`"
                )));
            }
        }
        Ok(())
    }
}

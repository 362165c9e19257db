//! Aggregate counts over the index store.
//!
//! Counts are computed with want-all queries against single-application
//! indices and are never cached; a `-1` sentinel distinguishes "no such
//! application" from "zero matches".

use std::collections::HashMap;
use std::sync::Arc;

use tantivy::collector::Count;
use tracing::debug;

use crate::index::IndexStore;
use crate::search::{query, SearchConfiguration, SearchResult, WantAll};

/// Sentinel returned by per-application counts for an unknown application.
pub const UNKNOWN_APP_COUNT: i64 = -1;

pub struct StatisticsService {
    store: Arc<IndexStore>,
    max_scan: usize,
}

impl StatisticsService {
    pub fn new(store: Arc<IndexStore>) -> Self {
        Self {
            store,
            // Count collectors ignore the result cap, but the want-all
            // configuration still has to pass validation.
            max_scan: usize::MAX,
        }
    }

    fn count_want_all(&self, app_name: &str, want: WantAll) -> SearchResult<usize> {
        let app_index = self.store.open(app_name)?;
        let config = SearchConfiguration::new(self.max_scan).search_all(want);
        config.validate()?;
        let compiled = query::compile(&config, app_index.index(), app_index.schema())?;
        let count = app_index.searcher().search(&*compiled, &Count)?;
        debug!(app_name, ?want, count, "Statistics count");
        Ok(count)
    }

    /// Number of log records indexed for `app_name`, or `-1` when no such
    /// application exists. A valid but empty application yields `0`.
    pub fn log_count(&self, app_name: &str) -> SearchResult<i64> {
        if !self.store.is_application(app_name) {
            return Ok(UNKNOWN_APP_COUNT);
        }
        Ok(self.count_want_all(app_name, WantAll::Log)? as i64)
    }

    /// Number of records carrying an exception for `app_name`, or `-1`
    /// when no such application exists.
    pub fn exception_count(&self, app_name: &str) -> SearchResult<i64> {
        if !self.store.is_application(app_name) {
            return Ok(UNKNOWN_APP_COUNT);
        }
        Ok(self.count_want_all(app_name, WantAll::Exception)? as i64)
    }

    /// Total log records across every indexed application.
    pub fn total_log_count(&self) -> SearchResult<u64> {
        let mut total = 0u64;
        for app_name in self.store.application_names() {
            total += self.count_want_all(&app_name, WantAll::Log)? as u64;
        }
        Ok(total)
    }

    /// Total exception-carrying records across every indexed application.
    pub fn total_exception_count(&self) -> SearchResult<u64> {
        let mut total = 0u64;
        for app_name in self.store.application_names() {
            total += self.count_want_all(&app_name, WantAll::Exception)? as u64;
        }
        Ok(total)
    }

    pub fn application_names(&self) -> Vec<String> {
        self.store.application_names()
    }

    pub fn application_count(&self) -> usize {
        self.store.application_names().len()
    }

    /// Per-application log counts, the UI's breakdown endpoint.
    pub fn logs_by_app_name(&self) -> SearchResult<HashMap<String, u64>> {
        let mut counts = HashMap::new();
        for app_name in self.store.application_names() {
            let count = self.count_want_all(&app_name, WantAll::Log)? as u64;
            counts.insert(app_name, count);
        }
        Ok(counts)
    }

    /// Per-application exception counts.
    pub fn exceptions_by_app_name(&self) -> SearchResult<HashMap<String, u64>> {
        let mut counts = HashMap::new();
        for app_name in self.store.application_names() {
            let count = self.count_want_all(&app_name, WantAll::Exception)? as u64;
            counts.insert(app_name, count);
        }
        Ok(counts)
    }
}

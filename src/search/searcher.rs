//! Query execution: typed result reconstruction, group truncation and the
//! adaptive time-window search.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use tantivy::collector::TopDocs;
use tantivy::{Order, TantivyDocument};
use tracing::{debug, info, warn};

use super::config::{SearchConfiguration, SearchMethod};
use super::{query, SearchError, SearchResult};
use crate::config::EngineConfig;
use crate::index::{document_to_view, IndexError, MultiHandle};
use crate::model::{LogType, LogView};

/// Result-set ceiling applied when no [`EngineConfig`] is given.
const DEFAULT_MAX_SEARCH: usize = 1_000;

/// Upper bound of the adaptive window, in seconds (7 days).
const WINDOW_CAP_SECS: f64 = 604_800.0;
/// Hard bound on adaptive iterations; the geometric resizing converges far
/// earlier in practice.
const WINDOW_MAX_ITERATIONS: u32 = 64;

/// Filter set reused across the iterations of an adaptive window search.
#[derive(Clone, Debug, Default)]
pub struct MonitorQuery {
    pub monitor_id: Option<String>,
    pub fields: Vec<String>,
    pub log_levels: Vec<String>,
    pub query: Option<String>,
    pub group_depth: Option<u32>,
}

impl MonitorQuery {
    pub fn for_monitor(monitor_id: impl Into<String>) -> Self {
        Self {
            monitor_id: Some(monitor_id.into()),
            ..Default::default()
        }
    }

    fn configuration(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        max_result: usize,
    ) -> SearchConfiguration {
        SearchConfiguration {
            fields: self.fields.clone(),
            method: SearchMethod::Structured,
            query: self.query.clone(),
            date_start: Some(start),
            date_end: Some(end),
            monitor_id: self.monitor_id.clone(),
            log_levels: self.log_levels.clone(),
            group_depth: self.group_depth,
            max_result,
            want_all: None,
        }
    }
}

/// Executes compiled queries against a combined index handle.
///
/// Read-only: the only state is the engine-level result-set ceiling; the
/// only side effect of any search is the index handle caching done by the
/// store.
pub struct LogSearcher {
    max_search: usize,
}

impl Default for LogSearcher {
    fn default() -> Self {
        Self::new()
    }
}

impl LogSearcher {
    pub fn new() -> Self {
        Self {
            max_search: DEFAULT_MAX_SEARCH,
        }
    }

    /// Build a searcher whose result-set ceiling comes from a validated
    /// [`EngineConfig`].
    pub fn with_config(config: &EngineConfig) -> Self {
        Self {
            max_search: config.max_search,
        }
    }

    /// Run `config` against every index of `handle`, merge the per-index
    /// results preserving ascending `log_time` order and apply group
    /// truncation when requested. The requested `max_result` is clamped to
    /// the engine's `max_search` ceiling.
    pub fn search(
        &self,
        handle: &MultiHandle,
        config: &SearchConfiguration,
    ) -> SearchResult<Vec<LogView>> {
        config.validate()?;
        let limit = config.max_result.min(self.max_search);

        let mut merged: Vec<LogView> = Vec::new();
        for app_index in handle.indices() {
            let compiled = query::compile(config, app_index.index(), app_index.schema())?;
            let searcher = app_index.searcher();
            let collector =
                TopDocs::with_limit(limit).order_by_fast_field::<i64>("log_time", Order::Asc);
            let top_docs = searcher.search(&*compiled, &collector)?;

            for (_log_time, doc_address) in top_docs {
                let doc: TantivyDocument = searcher.doc(doc_address)?;
                merged.push(document_to_view(app_index.schema(), &doc)?);
            }
        }

        // Stable sort keeps each index's collector order for duplicate
        // timestamps, which makes repeated queries deterministic.
        merged.sort_by_key(|view| view.log_time());
        merged.truncate(limit);

        let truncate_group =
            config.want_all.is_none() && config.group_depth.is_some_and(|d| d > 0);
        let results = if truncate_group {
            take_while_inclusive(merged, |view| view.log_type() != LogType::CloseGroup)
        } else {
            merged
        };

        info!(
            apps = ?handle.app_names(),
            results = results.len(),
            truncated = truncate_group,
            "Search completed"
        );
        Ok(results)
    }

    /// Filtered search over an explicit date range, the building block of
    /// the adaptive window algorithm.
    pub fn logs_with_filters(
        &self,
        handle: &MultiHandle,
        monitor_query: &MonitorQuery,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        max_result: usize,
    ) -> SearchResult<Vec<LogView>> {
        self.search(handle, &monitor_query.configuration(start, end, max_result))
    }

    /// Adaptive time-window search: the `count + 1` entries ending exactly
    /// at `at` (boundary inclusive), discovered without knowing log density
    /// in advance.
    ///
    /// The window starts at one second and is resized geometrically: grown
    /// by 1.5 while too few entries are found, halved while too many. The
    /// search stops at a fixed point (the boundary entry sits exactly at
    /// `at`, or the boundary repeats across consecutive iterations) or once
    /// the window reaches the seven-day cap, whichever comes first.
    pub fn logs_before(
        &self,
        handle: &MultiHandle,
        monitor_query: &MonitorQuery,
        at: DateTime<Utc>,
        count: usize,
    ) -> SearchResult<Vec<LogView>> {
        if count == 0 {
            return Err(SearchError::Validation("count must be positive".into()));
        }

        let mut window_secs: f64 = 1.0;
        let mut previous_boundary: Option<DateTime<Utc>> = None;
        let mut last = Vec::new();

        for iteration in 0..WINDOW_MAX_ITERATIONS {
            let start = at - duration_from_secs(window_secs);
            let logs = self.logs_with_filters(handle, monitor_query, start, at, count + 1)?;

            let boundary = logs.get(count).map(|view| view.log_time());
            debug!(
                iteration,
                window_secs,
                found = logs.len(),
                boundary = ?boundary,
                "Adaptive window iteration"
            );

            if let Some(boundary_time) = boundary {
                if boundary_time == at || previous_boundary == Some(boundary_time) {
                    return Ok(logs);
                }
            }
            if window_secs >= WINDOW_CAP_SECS {
                return Ok(logs);
            }

            if logs.len() < count + 1 {
                window_secs = (window_secs * 1.5).min(WINDOW_CAP_SECS);
            } else {
                window_secs /= 2.0;
            }
            previous_boundary = boundary;
            last = logs;
        }

        warn!(at = %at, count, "Adaptive window did not converge, returning last result");
        Ok(last)
    }

    /// The `count` entries on each side of `at`, as disjoint halves.
    ///
    /// Both halves share `at` as their boundary entry; each half drops it,
    /// so together they cover up to `2 * count` entries around `at`.
    pub fn logs_around(
        &self,
        handle: &MultiHandle,
        monitor_query: &MonitorQuery,
        at: DateTime<Utc>,
        count: usize,
    ) -> SearchResult<(Vec<LogView>, Vec<LogView>)> {
        let mut before = self.logs_before(handle, monitor_query, at, count)?;
        before.pop();

        let mut after =
            self.logs_with_filters(handle, monitor_query, at, Utc::now(), count + 1)?;
        if !after.is_empty() {
            after.remove(0);
        }

        Ok((before, after))
    }

    /// Distinct monitor ids across every index of the handle, sorted.
    pub fn monitor_ids(&self, handle: &MultiHandle) -> SearchResult<Vec<String>> {
        let mut ids = BTreeSet::new();
        for app_index in handle.indices() {
            let searcher = app_index.searcher();
            let field = app_index.schema().monitor_id;
            for segment in searcher.segment_readers() {
                let inverted = segment.inverted_index(field)?;
                let mut stream = inverted.terms().stream().map_err(IndexError::Io)?;
                while stream.advance() {
                    if let Ok(id) = std::str::from_utf8(stream.key()) {
                        ids.insert(id.to_string());
                    }
                }
            }
        }
        Ok(ids.into_iter().collect())
    }
}

fn duration_from_secs(secs: f64) -> Duration {
    Duration::microseconds((secs * 1_000_000.0) as i64)
}

/// Take elements while the predicate holds, plus the first element for
/// which it fails.
fn take_while_inclusive<T>(items: Vec<T>, mut predicate: impl FnMut(&T) -> bool) -> Vec<T> {
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        let keep_going = predicate(&item);
        out.push(item);
        if !keep_going {
            break;
        }
    }
    out
}

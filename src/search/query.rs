//! Compilation of a [`SearchConfiguration`] into a tantivy query.
//!
//! Clause construction is a pure data transformation over tantivy's typed
//! query nodes; no string concatenation. Execution and sorting live in
//! [`super::searcher`].

use std::ops::Bound;

use tantivy::query::{AllQuery, BooleanQuery, Occur, Query, QueryParser, RangeQuery, TermQuery};
use tantivy::schema::IndexRecordOption;
use tantivy::{Index, Term};

use super::config::{SearchConfiguration, SearchMethod, WantAll};
use super::{SearchError, SearchResult};
use crate::index::LogSchema;

/// Resolve the configured projection fields to text-searchable tantivy
/// fields, falling back to `text` when none resolve.
fn text_fields(config: &SearchConfiguration, schema: &LogSchema) -> Vec<tantivy::schema::Field> {
    let fields: Vec<_> = config
        .fields
        .iter()
        .filter_map(|name| schema.text_field(name))
        .collect();
    if fields.is_empty() {
        vec![schema.text]
    } else {
        fields
    }
}

fn parse_text_clause(
    query_str: &str,
    config: &SearchConfiguration,
    index: &Index,
    schema: &LogSchema,
) -> SearchResult<Box<dyn Query>> {
    let parser = QueryParser::for_index(index, text_fields(config, schema));
    parser
        .parse_query(query_str)
        .map_err(|e| SearchError::Query(format!("cannot parse `{query_str}`: {e}")))
}

fn exact_term(field: tantivy::schema::Field, value: &str) -> Box<dyn Query> {
    Box::new(TermQuery::new(
        Term::from_field_text(field, value),
        IndexRecordOption::Basic,
    ))
}

/// Compile `config` into the native query for one application index.
///
/// The caller is responsible for having validated the configuration; the
/// result sort (ascending `log_time`, stable tie-break) is applied at
/// collection time by the searcher.
pub fn compile(
    config: &SearchConfiguration,
    index: &Index,
    schema: &LogSchema,
) -> SearchResult<Box<dyn Query>> {
    // Want-all bypasses every filter below.
    match config.want_all {
        Some(WantAll::Log) => return Ok(Box::new(AllQuery)),
        Some(WantAll::Exception) => return Ok(exact_term(schema.has_exception, "true")),
        None => {}
    }

    if config.method == SearchMethod::FreeText {
        let query_str = config
            .query
            .as_deref()
            .filter(|q| !q.trim().is_empty())
            .ok_or_else(|| SearchError::Query("free-text search without a query".into()))?;
        return parse_text_clause(query_str, config, index, schema);
    }

    let mut clauses: Vec<(Occur, Box<dyn Query>)> = Vec::new();

    if let (Some(start), Some(end)) = (config.date_start, config.date_end) {
        let lower = Bound::Included(Term::from_field_i64(
            schema.log_time,
            start.timestamp_micros(),
        ));
        let upper = Bound::Included(Term::from_field_i64(
            schema.log_time,
            end.timestamp_micros(),
        ));
        clauses.push((Occur::Must, Box::new(RangeQuery::new(lower, upper))));
    }

    if let Some(monitor_id) = &config.monitor_id {
        clauses.push((Occur::Must, exact_term(schema.monitor_id, monitor_id)));
    }

    if !config.log_levels.is_empty() {
        // A record stores one token per set level bit, so "bitset
        // intersects any requested level" is an OR of exact terms.
        let level_clauses: Vec<(Occur, Box<dyn Query>)> = config
            .log_levels
            .iter()
            .map(|name| (Occur::Should, exact_term(schema.log_level, name)))
            .collect();
        clauses.push((Occur::Must, Box::new(BooleanQuery::new(level_clauses))));
    }

    if let Some(depth) = config.group_depth {
        clauses.push((
            Occur::Must,
            Box::new(TermQuery::new(
                Term::from_field_u64(schema.group_depth, u64::from(depth)),
                IndexRecordOption::Basic,
            )),
        ));
    }

    if let Some(query_str) = config.query.as_deref().filter(|q| !q.trim().is_empty()) {
        clauses.push((
            Occur::Must,
            parse_text_clause(query_str, config, index, schema)?,
        ));
    }

    if clauses.is_empty() {
        // validate() rejects this before execution; kept as a guard for
        // direct callers of the compiler.
        return Err(SearchError::Query(
            "no active clause in structured query".into(),
        ));
    }

    Ok(Box::new(BooleanQuery::new(clauses)))
}

//! End-to-end tests over a real on-disk index: indexing, structured and
//! free-text search, statistics, and the adaptive time-window algorithm.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use once_cell::sync::Lazy;
use tempfile::TempDir;

use logvault::config::EngineConfig;
use logvault::index::IndexStore;
use logvault::model::{ExceptionData, LogLevel, LogRecord, LogType, LogView};
use logvault::search::{
    LogSearcher, MonitorQuery, SearchConfiguration, SearchError, SearchMethod, WantAll,
};
use logvault::stats::StatisticsService;

static TRACING: Lazy<()> = Lazy::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
});

const APP: &str = "fixture-app";
const MONITOR_A: &str = "monitor-a";
const MONITOR_B: &str = "monitor-b";

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

fn line(
    monitor: &str,
    at: DateTime<Utc>,
    level: LogLevel,
    text: &str,
    depth: u32,
) -> LogRecord {
    let mut record = LogRecord::line(APP, monitor, at, level, text);
    record.group_depth = depth;
    record.source_file_name = "fixture.rs".into();
    record.line_number = 7;
    record
}

fn marker(monitor: &str, at: DateTime<Utc>, log_type: LogType, depth: u32) -> LogRecord {
    let mut record = LogRecord::line(APP, monitor, at, LogLevel::INFO, "");
    record.log_type = log_type;
    record.group_depth = depth;
    record
}

/// Builds the fixture index:
/// - monitor-a: one record per second for 100 seconds (fixed density),
///   including one fatal record with an aggregated exception
/// - monitor-b: a depth-1 group `[Open, Line, Line, Close]` followed by a
///   second group's first line, all at depth 1 except the open marker
fn build_fixture() -> (TempDir, Arc<IndexStore>, usize) {
    Lazy::force(&TRACING);
    let tmp = TempDir::new().unwrap();
    let store = Arc::new(IndexStore::new(tmp.path()));
    let index = store.open(APP).unwrap();
    let base = base_time();
    let mut total = 0usize;

    for i in 0..100i64 {
        let at = base + Duration::seconds(i);
        let record = match i {
            0 => line(MONITOR_A, at, LogLevel::INFO, "Hello world", 0),
            1 => line(MONITOR_A, at, LogLevel::ERROR, "CriticalError", 0),
            7 => {
                let mut fatal = line(MONITOR_A, at, LogLevel::FATAL, "giving up", 0);
                let mut root = ExceptionData::new("Aggregate exceptions list", "at main");
                for n in 1..=3 {
                    root.aggregated
                        .push(ExceptionData::new(format!("inner-{n}"), format!("trace-{n}")));
                }
                fatal.exception = Some(root);
                fatal
            }
            _ => line(MONITOR_A, at, LogLevel::INFO, &format!("tick {i}"), 0),
        };
        index.index_record(&record).unwrap();
        total += 1;
    }

    let group_base = base + Duration::seconds(200);
    let group_records = vec![
        marker(MONITOR_B, group_base, LogType::OpenGroup, 0),
        line(MONITOR_B, group_base + Duration::seconds(1), LogLevel::INFO, "inside 1", 1),
        line(MONITOR_B, group_base + Duration::seconds(2), LogLevel::INFO, "inside 2", 1),
        marker(MONITOR_B, group_base + Duration::seconds(3), LogType::CloseGroup, 1),
        line(MONITOR_B, group_base + Duration::seconds(4), LogLevel::INFO, "next group", 1),
    ];
    for record in &group_records {
        index.index_record(record).unwrap();
        total += 1;
    }

    index.commit().unwrap();
    (tmp, store, total)
}

#[test]
fn full_text_search_finds_exact_lines() {
    let (_tmp, store, _total) = build_fixture();
    let handle = store.resolve(&[APP]).unwrap().unwrap();
    let searcher = LogSearcher::new();

    let config = SearchConfiguration::new(10)
        .with_method(SearchMethod::FreeText)
        .with_fields(&["Text"])
        .with_query("\"Hello world\"");
    let results = searcher.search(&handle, &config).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].log_type(), LogType::Line);
    match &results[0] {
        LogView::Line { text, log_level, .. } => {
            assert_eq!(text, "Hello world");
            assert!(log_level.contains(LogLevel::INFO));
        }
        other => panic!("expected line, got {other:?}"),
    }

    let config = config.with_query("CriticalError");
    let results = searcher.search(&handle, &config).unwrap();
    assert_eq!(results.len(), 1);
    match &results[0] {
        LogView::Line { text, log_level, .. } => {
            assert_eq!(text, "CriticalError");
            assert!(log_level.contains(LogLevel::ERROR));
        }
        other => panic!("expected line, got {other:?}"),
    }
}

#[test]
fn want_all_log_is_count_stable() {
    let (_tmp, store, total) = build_fixture();
    let handle = store.resolve(&[APP]).unwrap().unwrap();
    let searcher = LogSearcher::new();

    let config = SearchConfiguration::new(1_000).search_all(WantAll::Log);
    let first = searcher.search(&handle, &config).unwrap();
    let second = searcher.search(&handle, &config).unwrap();
    assert_eq!(first.len(), total);
    assert_eq!(second.len(), total);
}

#[test]
fn results_are_ascending_by_log_time() {
    let (_tmp, store, _total) = build_fixture();
    let handle = store.resolve(&[APP]).unwrap().unwrap();
    let searcher = LogSearcher::new();

    let config = SearchConfiguration::new(1_000).search_all(WantAll::Log);
    let results = searcher.search(&handle, &config).unwrap();
    assert!(results.windows(2).all(|w| w[0].log_time() <= w[1].log_time()));
}

#[test]
fn date_range_returns_only_records_within_bounds() {
    let (_tmp, store, _total) = build_fixture();
    let handle = store.resolve(&[APP]).unwrap().unwrap();
    let searcher = LogSearcher::new();

    let start = base_time() + Duration::seconds(10);
    let end = base_time() + Duration::seconds(20);
    let config = SearchConfiguration::new(1_000).with_date_range(start, end);
    let results = searcher.search(&handle, &config).unwrap();

    assert_eq!(results.len(), 11); // inclusive bounds
    assert!(results
        .iter()
        .all(|v| v.log_time() >= start && v.log_time() <= end));

    // An out-of-history range is empty, not an error.
    let config = SearchConfiguration::new(1_000)
        .with_date_range(base_time() - Duration::days(30), base_time() - Duration::days(29));
    assert!(searcher.search(&handle, &config).unwrap().is_empty());
}

#[test]
fn monitor_and_level_filters_combine() {
    let (_tmp, store, _total) = build_fixture();
    let handle = store.resolve(&[APP]).unwrap().unwrap();
    let searcher = LogSearcher::new();

    let config = SearchConfiguration::new(1_000)
        .with_monitor_id(MONITOR_A)
        .with_log_levels(&["Fatal"]);
    let results = searcher.search(&handle, &config).unwrap();
    assert_eq!(results.len(), 1);
    assert!(results[0].log_level().contains(LogLevel::FATAL));

    // Unknown monitor id: empty result, not an error.
    let config = SearchConfiguration::new(1_000).with_monitor_id("no-such-monitor");
    assert!(searcher.search(&handle, &config).unwrap().is_empty());
}

#[test]
fn invalid_configuration_errors_instead_of_returning_empty() {
    let (_tmp, store, _total) = build_fixture();
    let handle = store.resolve(&[APP]).unwrap().unwrap();
    let searcher = LogSearcher::new();

    let err = searcher
        .search(&handle, &SearchConfiguration::new(10))
        .unwrap_err();
    assert!(matches!(err, SearchError::Validation(_)));

    let err = searcher
        .search(&handle, &SearchConfiguration::new(0).search_all(WantAll::Log))
        .unwrap_err();
    assert!(matches!(err, SearchError::Validation(_)));
}

#[test]
fn resolve_with_unknown_name_is_none_never_partial() {
    let (_tmp, store, _total) = build_fixture();
    assert!(store.resolve(&[APP, "ghost-app"]).unwrap().is_none());
    assert!(store.resolve(&[APP]).unwrap().is_some());
}

#[test]
fn group_truncation_stops_at_first_close_group_inclusive() {
    let (_tmp, store, _total) = build_fixture();
    let handle = store.resolve(&[APP]).unwrap().unwrap();
    let searcher = LogSearcher::new();

    // Depth-1 matches in monitor-b arrive as [Line, Line, CloseGroup, Line];
    // truncation reconstructs one complete group: the first three.
    let config = SearchConfiguration::new(1_000)
        .with_monitor_id(MONITOR_B)
        .with_group_depth(1);
    let results = searcher.search(&handle, &config).unwrap();

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].log_type(), LogType::Line);
    assert_eq!(results[1].log_type(), LogType::Line);
    assert_eq!(results[2].log_type(), LogType::CloseGroup);
}

#[test]
fn want_all_exception_round_trips_aggregated_exceptions() {
    let (_tmp, store, _total) = build_fixture();
    let handle = store.resolve(&[APP]).unwrap().unwrap();
    let searcher = LogSearcher::new();

    let config = SearchConfiguration::new(10).search_all(WantAll::Exception);
    let results = searcher.search(&handle, &config).unwrap();
    assert_eq!(results.len(), 1);

    let exception = results[0].exception().expect("exception payload");
    assert!(exception.message.contains("Aggregate exceptions list"));
    assert_eq!(exception.aggregated.len(), 3);
    for inner in &exception.aggregated {
        assert!(!inner.message.is_empty());
        assert!(!inner.stack_trace.is_empty());
    }
    assert!(results[0].log_level().contains(LogLevel::FATAL));
}

#[test]
fn monitor_ids_are_listed_across_the_handle() {
    let (_tmp, store, _total) = build_fixture();
    let handle = store.resolve(&[APP]).unwrap().unwrap();
    let searcher = LogSearcher::new();

    let ids = searcher.monitor_ids(&handle).unwrap();
    assert_eq!(ids, vec![MONITOR_A.to_string(), MONITOR_B.to_string()]);
}

#[test]
fn adaptive_window_converges_on_fixed_density() {
    let (_tmp, store, _total) = build_fixture();
    let handle = store.resolve(&[APP]).unwrap().unwrap();
    let searcher = LogSearcher::new();

    let at = base_time() + Duration::seconds(50);
    let monitor_query = MonitorQuery::for_monitor(MONITOR_A);

    let logs = searcher
        .logs_before(&handle, &monitor_query, at, 5)
        .unwrap();
    assert_eq!(logs.len(), 6);
    // Boundary entry sits exactly at the reference timestamp.
    assert_eq!(logs[5].log_time(), at);
    // The five entries before it are the previous five seconds, ascending.
    for (i, view) in logs.iter().take(5).enumerate() {
        assert_eq!(view.log_time(), at - Duration::seconds(5 - i as i64));
    }

    // Re-running reproduces the same result set.
    let again = searcher
        .logs_before(&handle, &monitor_query, at, 5)
        .unwrap();
    let times: Vec<_> = logs.iter().map(|v| v.log_time()).collect();
    let again_times: Vec<_> = again.iter().map(|v| v.log_time()).collect();
    assert_eq!(times, again_times);
}

#[test]
fn adaptive_window_terminates_when_history_is_too_small() {
    let (_tmp, store, _total) = build_fixture();
    let handle = store.resolve(&[APP]).unwrap().unwrap();
    let searcher = LogSearcher::new();

    // Far more entries requested than the monitor's whole history holds:
    // the window grows to the cap and returns what exists.
    let at = base_time() + Duration::seconds(300);
    let monitor_query = MonitorQuery::for_monitor(MONITOR_B);
    let logs = searcher
        .logs_before(&handle, &monitor_query, at, 50)
        .unwrap();
    assert_eq!(logs.len(), 5);
}

#[test]
fn logs_around_halves_are_disjoint() {
    let (_tmp, store, _total) = build_fixture();
    let handle = store.resolve(&[APP]).unwrap().unwrap();
    let searcher = LogSearcher::new();

    let at = base_time() + Duration::seconds(50);
    let monitor_query = MonitorQuery::for_monitor(MONITOR_A);
    let (before, after) = searcher
        .logs_around(&handle, &monitor_query, at, 3)
        .unwrap();

    assert_eq!(before.len(), 3);
    assert_eq!(after.len(), 3);
    assert!(before.iter().all(|v| v.log_time() < at));
    assert!(after.iter().all(|v| v.log_time() > at));
}

#[test]
fn statistics_report_counts_and_sentinels() {
    let (_tmp, store, total) = build_fixture();
    let stats = StatisticsService::new(store);

    assert_eq!(stats.total_log_count().unwrap(), total as u64);
    assert_eq!(stats.total_exception_count().unwrap(), 1);
    assert_eq!(stats.application_names(), vec![APP.to_string()]);
    assert_eq!(stats.log_count(APP).unwrap(), total as i64);
    assert_eq!(stats.log_count("badappname").unwrap(), -1);
    assert_eq!(stats.exception_count("badappname").unwrap(), -1);
}

#[test]
fn records_appended_after_commit_become_visible() {
    let (_tmp, store, total) = build_fixture();
    let handle = store.resolve(&[APP]).unwrap().unwrap();
    let searcher = LogSearcher::new();
    let config = SearchConfiguration::new(1_000).search_all(WantAll::Log);

    assert_eq!(searcher.search(&handle, &config).unwrap().len(), total);

    let index = store.open(APP).unwrap();
    let record = line(
        MONITOR_A,
        base_time() + Duration::seconds(500),
        LogLevel::WARN,
        "late arrival",
        0,
    );
    index.index_record(&record).unwrap();
    index.commit().unwrap();

    assert_eq!(searcher.search(&handle, &config).unwrap().len(), total + 1);
}

#[test]
fn concurrent_first_opens_share_one_handle() {
    let tmp = TempDir::new().unwrap();
    let store = Arc::new(IndexStore::new(tmp.path()));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let store = Arc::clone(&store);
            std::thread::spawn(move || store.open("same-app").unwrap())
        })
        .collect();

    let opened: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    for other in &opened[1..] {
        assert!(Arc::ptr_eq(&opened[0], other));
    }
}

#[test]
fn engine_config_drives_store_root_and_search_ceiling() {
    let (tmp, fixture_store, total) = build_fixture();
    // Release the fixture's writer lock before reopening the directory.
    drop(fixture_store);

    let mut engine = EngineConfig::new(tmp.path());
    engine.max_search = 3;
    engine.validate().unwrap();

    let store = IndexStore::with_config(&engine);
    let handle = store.resolve(&[APP]).unwrap().unwrap();
    let searcher = LogSearcher::with_config(&engine);

    let config = SearchConfiguration::new(1_000).search_all(WantAll::Log);
    let results = searcher.search(&handle, &config).unwrap();
    assert_eq!(results.len(), 3);
    assert!(total > 3);

    // The default ceiling is far above the fixture size.
    let unconfigured = LogSearcher::new();
    assert_eq!(unconfigured.search(&handle, &config).unwrap().len(), total);
}

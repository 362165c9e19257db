//! Conversions between [`LogRecord`]/[`LogView`] and stored tantivy documents.

use tantivy::schema::Value;
use tantivy::TantivyDocument;

use super::schema::LogSchema;
use super::{IndexError, IndexResult};
use crate::model::{ExceptionData, LogLevel, LogRecord, LogType, LogView};

use chrono::{DateTime, Utc};

/// Build the indexable document for one record.
///
/// The level bitset is written as one raw token per set flag so that a
/// level filter compiles to plain term clauses; tags likewise.
pub fn record_to_document(schema: &LogSchema, record: &LogRecord) -> IndexResult<TantivyDocument> {
    let mut doc = TantivyDocument::default();

    doc.add_text(schema.log_type, record.log_type.to_string());
    doc.add_text(schema.app_name, &record.app_name);
    doc.add_text(schema.monitor_id, &record.monitor_id);
    doc.add_i64(schema.log_time, record.log_time.timestamp_micros());
    if let Some(prev) = record.previous_log_time {
        doc.add_i64(schema.previous_log_time, prev.timestamp_micros());
    }
    if let Some(prev_type) = record.previous_entry_type {
        doc.add_text(schema.previous_entry_type, prev_type.to_string());
    }
    doc.add_u64(schema.group_depth, u64::from(record.group_depth));
    for name in record.log_level.names() {
        doc.add_text(schema.log_level, name);
    }
    doc.add_text(schema.text, &record.text);
    doc.add_text(schema.source_file_name, &record.source_file_name);
    doc.add_u64(schema.line_number, u64::from(record.line_number));
    for tag in &record.tags {
        doc.add_text(schema.tags, tag);
    }
    if let Some(exception) = &record.exception {
        let payload = serde_json::to_string(exception)
            .map_err(|e| IndexError::MalformedDocument(format!("exception payload: {e}")))?;
        doc.add_text(schema.exception, payload);
        doc.add_text(schema.has_exception, "true");
    }

    Ok(doc)
}

fn micros_to_datetime(micros: i64) -> IndexResult<DateTime<Utc>> {
    DateTime::from_timestamp_micros(micros)
        .ok_or_else(|| IndexError::MalformedDocument(format!("timestamp out of range: {micros}")))
}

fn stored_level(schema: &LogSchema, doc: &TantivyDocument) -> LogLevel {
    let mut level = LogLevel::empty();
    for value in doc.get_all(schema.log_level) {
        if let Some(name) = value.as_str() {
            if let Some(flag) = LogLevel::parse_name(name) {
                level |= flag;
            }
        }
    }
    level
}

/// Reconstruct the typed view from a stored document. Line records carry
/// the full projection; group markers only structural fields.
pub fn document_to_view(schema: &LogSchema, doc: &TantivyDocument) -> IndexResult<LogView> {
    let log_type: LogType = doc
        .get_first(schema.log_type)
        .and_then(|v| v.as_str())
        .ok_or_else(|| IndexError::MalformedDocument("missing log_type".into()))?
        .parse()
        .map_err(IndexError::MalformedDocument)?;

    let log_time = micros_to_datetime(
        doc.get_first(schema.log_time)
            .and_then(|v| v.as_i64())
            .ok_or_else(|| IndexError::MalformedDocument("missing log_time".into()))?,
    )?;
    let log_level = stored_level(schema, doc);
    let group_depth = doc
        .get_first(schema.group_depth)
        .and_then(|v| v.as_u64())
        .unwrap_or(0) as u32;
    let app_name = doc
        .get_first(schema.app_name)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    let monitor_id = doc
        .get_first(schema.monitor_id)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();

    match log_type {
        LogType::OpenGroup => Ok(LogView::OpenGroup {
            log_time,
            log_level,
            group_depth,
            app_name,
            monitor_id,
        }),
        LogType::CloseGroup => Ok(LogView::CloseGroup {
            log_time,
            log_level,
            group_depth,
            app_name,
            monitor_id,
        }),
        LogType::Line => {
            let previous_log_time = doc
                .get_first(schema.previous_log_time)
                .and_then(|v| v.as_i64())
                .map(micros_to_datetime)
                .transpose()?;
            let previous_entry_type = doc
                .get_first(schema.previous_entry_type)
                .and_then(|v| v.as_str())
                .and_then(|s| s.parse().ok());
            let exception: Option<ExceptionData> = doc
                .get_first(schema.exception)
                .and_then(|v| v.as_str())
                .map(serde_json::from_str)
                .transpose()
                .map_err(|e| IndexError::MalformedDocument(format!("exception payload: {e}")))?;

            Ok(LogView::Line {
                log_time,
                log_level,
                group_depth,
                app_name,
                monitor_id,
                text: doc
                    .get_first(schema.text)
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string(),
                source_file_name: doc
                    .get_first(schema.source_file_name)
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string(),
                line_number: doc
                    .get_first(schema.line_number)
                    .and_then(|v| v.as_u64())
                    .unwrap_or(0) as u32,
                tags: doc
                    .get_all(schema.tags)
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect(),
                previous_entry_type,
                previous_log_time,
                exception,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_record() -> LogRecord {
        let mut record = LogRecord::line(
            "app-a",
            "monitor-1",
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            LogLevel::INFO | LogLevel::ERROR,
            "Hello world",
        );
        record.source_file_name = "main.rs".into();
        record.line_number = 42;
        record.tags = vec!["Sql".into(), "Machine".into()];
        record.exception = Some(ExceptionData::new("boom", "at main"));
        record
    }

    #[test]
    fn line_record_round_trips_through_document() {
        let schema = LogSchema::build();
        let record = sample_record();
        let doc = record_to_document(&schema, &record).unwrap();
        let view = document_to_view(&schema, &doc).unwrap();

        assert_eq!(view.log_type(), LogType::Line);
        assert_eq!(view.log_time(), record.log_time);
        assert_eq!(view.log_level(), record.log_level);
        match view {
            LogView::Line {
                text,
                tags,
                line_number,
                exception,
                ..
            } => {
                assert_eq!(text, "Hello world");
                assert_eq!(tags, vec!["Sql".to_string(), "Machine".to_string()]);
                assert_eq!(line_number, 42);
                assert_eq!(exception.unwrap().message, "boom");
            }
            other => panic!("expected line view, got {other:?}"),
        }
    }

    #[test]
    fn group_marker_projects_structural_fields_only() {
        let schema = LogSchema::build();
        let mut record = sample_record();
        record.log_type = LogType::CloseGroup;
        record.group_depth = 2;

        let doc = record_to_document(&schema, &record).unwrap();
        let view = document_to_view(&schema, &doc).unwrap();
        assert_eq!(view.log_type(), LogType::CloseGroup);
        assert_eq!(view.group_depth(), 2);
        assert!(view.exception().is_none());
    }
}

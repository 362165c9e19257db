//! Canonical log entities indexed and returned by the engine.
//!
//! A [`LogRecord`] is what ingestion hands us: a single line, a group-open
//! marker or a group-close marker, produced by one monitor of one
//! application. A [`LogView`] is the typed projection handed back to callers
//! of the search API; structural records only carry structural fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Discriminant of a log record.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LogType {
    Line,
    OpenGroup,
    CloseGroup,
}

impl fmt::Display for LogType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogType::Line => write!(f, "Line"),
            LogType::OpenGroup => write!(f, "OpenGroup"),
            LogType::CloseGroup => write!(f, "CloseGroup"),
        }
    }
}

impl FromStr for LogType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Line" => Ok(LogType::Line),
            "OpenGroup" => Ok(LogType::OpenGroup),
            "CloseGroup" => Ok(LogType::CloseGroup),
            other => Err(format!("unknown log type `{other}`")),
        }
    }
}

bitflags::bitflags! {
    /// Log level as a bitset. Levels are independent bits, so a record can
    /// carry e.g. `INFO | ERROR` when a line was both reported and escalated.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct LogLevel: u8 {
        const TRACE = 0b0000_0001;
        const DEBUG = 0b0000_0010;
        const INFO  = 0b0000_0100;
        const WARN  = 0b0000_1000;
        const ERROR = 0b0001_0000;
        const FATAL = 0b0010_0000;
    }
}

impl LogLevel {
    /// Parse a single level name. Named `parse_name` to stay clear of the
    /// `from_name` the `bitflags!` macro already generates for flag idents.
    pub fn parse_name(name: &str) -> Option<LogLevel> {
        match name {
            "Trace" => Some(LogLevel::TRACE),
            "Debug" => Some(LogLevel::DEBUG),
            "Info" => Some(LogLevel::INFO),
            "Warn" => Some(LogLevel::WARN),
            "Error" => Some(LogLevel::ERROR),
            "Fatal" => Some(LogLevel::FATAL),
            _ => None,
        }
    }

    /// Parse a `|`-combined list of level names, e.g. `"Info|Error"`.
    pub fn from_names(names: &str) -> Option<LogLevel> {
        let mut level = LogLevel::empty();
        for name in names.split('|').map(str::trim).filter(|n| !n.is_empty()) {
            level |= LogLevel::parse_name(name)?;
        }
        if level.is_empty() {
            None
        } else {
            Some(level)
        }
    }

    /// Names of the set bits, in severity order.
    pub fn names(&self) -> Vec<&'static str> {
        const ALL: [(LogLevel, &str); 6] = [
            (LogLevel::TRACE, "Trace"),
            (LogLevel::DEBUG, "Debug"),
            (LogLevel::INFO, "Info"),
            (LogLevel::WARN, "Warn"),
            (LogLevel::ERROR, "Error"),
            (LogLevel::FATAL, "Fatal"),
        ];
        ALL.iter()
            .filter(|(bit, _)| self.contains(*bit))
            .map(|(_, name)| *name)
            .collect()
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.names().join("|"))
    }
}

// Serialized as the pipe-joined name string so stored documents stay
// readable and independent of the bit layout.
impl Serialize for LogLevel {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for LogLevel {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let names = String::deserialize(deserializer)?;
        if names.is_empty() {
            return Ok(LogLevel::empty());
        }
        LogLevel::from_names(&names)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown log level `{names}`")))
    }
}

/// Exception payload of a line record. An exception may aggregate nested
/// exceptions, each with its own message and stack trace.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ExceptionData {
    pub message: String,
    pub stack_trace: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aggregated: Vec<ExceptionData>,
}

impl ExceptionData {
    pub fn new(message: impl Into<String>, stack_trace: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stack_trace: stack_trace.into(),
            aggregated: Vec::new(),
        }
    }
}

/// One log record as handed over by ingestion. Immutable once indexed.
///
/// `group_depth` is the nesting depth after accounting for the nesting the
/// record itself closes: a `CloseGroup` carries the depth of the group it
/// terminates. Every `CloseGroup` has exactly one matching earlier
/// `OpenGroup` at the same depth within the same monitor; producers are
/// responsible for that invariant, the index does not re-check it.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct LogRecord {
    pub log_type: LogType,
    pub app_name: String,
    /// Identifier of the monitor (one ordered stream of records).
    pub monitor_id: String,
    pub log_time: DateTime<Utc>,
    pub previous_log_time: Option<DateTime<Utc>>,
    pub previous_entry_type: Option<LogType>,
    pub group_depth: u32,
    pub log_level: LogLevel,
    pub text: String,
    pub source_file_name: String,
    pub line_number: u32,
    pub tags: Vec<String>,
    pub exception: Option<ExceptionData>,
}

impl LogRecord {
    /// Convenience constructor for a plain line record.
    pub fn line(
        app_name: impl Into<String>,
        monitor_id: impl Into<String>,
        log_time: DateTime<Utc>,
        log_level: LogLevel,
        text: impl Into<String>,
    ) -> Self {
        Self {
            log_type: LogType::Line,
            app_name: app_name.into(),
            monitor_id: monitor_id.into(),
            log_time,
            previous_log_time: None,
            previous_entry_type: None,
            group_depth: 0,
            log_level,
            text: text.into(),
            source_file_name: String::new(),
            line_number: 0,
            tags: Vec::new(),
            exception: None,
        }
    }
}

/// Typed search result entry. Line records carry the full projection;
/// group markers only carry structural fields.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(tag = "log_type")]
pub enum LogView {
    Line {
        log_time: DateTime<Utc>,
        log_level: LogLevel,
        group_depth: u32,
        app_name: String,
        monitor_id: String,
        text: String,
        source_file_name: String,
        line_number: u32,
        tags: Vec<String>,
        previous_entry_type: Option<LogType>,
        previous_log_time: Option<DateTime<Utc>>,
        exception: Option<ExceptionData>,
    },
    OpenGroup {
        log_time: DateTime<Utc>,
        log_level: LogLevel,
        group_depth: u32,
        app_name: String,
        monitor_id: String,
    },
    CloseGroup {
        log_time: DateTime<Utc>,
        log_level: LogLevel,
        group_depth: u32,
        app_name: String,
        monitor_id: String,
    },
}

impl LogView {
    pub fn log_type(&self) -> LogType {
        match self {
            LogView::Line { .. } => LogType::Line,
            LogView::OpenGroup { .. } => LogType::OpenGroup,
            LogView::CloseGroup { .. } => LogType::CloseGroup,
        }
    }

    pub fn log_time(&self) -> DateTime<Utc> {
        match self {
            LogView::Line { log_time, .. }
            | LogView::OpenGroup { log_time, .. }
            | LogView::CloseGroup { log_time, .. } => *log_time,
        }
    }

    pub fn log_level(&self) -> LogLevel {
        match self {
            LogView::Line { log_level, .. }
            | LogView::OpenGroup { log_level, .. }
            | LogView::CloseGroup { log_level, .. } => *log_level,
        }
    }

    pub fn group_depth(&self) -> u32 {
        match self {
            LogView::Line { group_depth, .. }
            | LogView::OpenGroup { group_depth, .. }
            | LogView::CloseGroup { group_depth, .. } => *group_depth,
        }
    }

    pub fn monitor_id(&self) -> &str {
        match self {
            LogView::Line { monitor_id, .. }
            | LogView::OpenGroup { monitor_id, .. }
            | LogView::CloseGroup { monitor_id, .. } => monitor_id,
        }
    }

    pub fn exception(&self) -> Option<&ExceptionData> {
        match self {
            LogView::Line { exception, .. } => exception.as_ref(),
            _ => None,
        }
    }
}

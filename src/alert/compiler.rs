//! The alert rule compiler: a field registry plus a pure predicate
//! constructor, replacing the runtime-reflection approach a dynamic
//! language would use.
//!
//! Every field name resolves to one of five kinds; each kind has its own
//! value parser and allowed operator set. Compilation fails loudly on an
//! unknown field, an unparseable value or a disallowed operator, so a
//! partially-compiled rule never exists.

use std::str::FromStr;

use crate::model::{LogLevel, LogRecord, LogType};

use super::{AlertError, AlertExpression, AlertResult, Operator};

/// The four-plus-one field kinds of the registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FieldKind {
    /// `LogType`: exclusive enum.
    Enum,
    /// `LogLevel`: flag enum, bits combinable.
    FlagEnum,
    /// `GroupDepth`, `LineNumber`.
    Int,
    /// `FileName`, `AppName`, `Text`, `Exception.Message`, `Exception.StackTrace`.
    Str,
    /// `Tags`: set of string tokens.
    Tag,
}

impl FieldKind {
    fn allowed(self, operator: Operator) -> bool {
        use Operator::*;
        match self {
            // `In` on an exclusive enum degrades to plain equality.
            FieldKind::Enum => matches!(operator, EqualTo | In),
            FieldKind::FlagEnum => matches!(operator, EqualTo | NotEqualTo | In),
            FieldKind::Int => matches!(
                operator,
                EqualTo
                    | NotEqualTo
                    | GreaterThan
                    | GreaterThanOrEqualTo
                    | LessThan
                    | LessThanOrEqualTo
            ),
            FieldKind::Str => {
                matches!(operator, EqualTo | NotEqualTo | Contains | StartsWith | EndsWith)
            }
            FieldKind::Tag => matches!(operator, EqualTo | NotEqualTo | In),
        }
    }
}

fn field_kind(field: &str) -> AlertResult<FieldKind> {
    match field {
        "LogType" => Ok(FieldKind::Enum),
        "LogLevel" => Ok(FieldKind::FlagEnum),
        "GroupDepth" | "LineNumber" => Ok(FieldKind::Int),
        "FileName" | "AppName" | "Text" | "Exception.Message" | "Exception.StackTrace" => {
            Ok(FieldKind::Str)
        }
        "Tags" => Ok(FieldKind::Tag),
        other => Err(AlertError::UnknownField(other.to_string())),
    }
}

// Both accessor tables are only reached after `field_kind` classified the
// field, so every arm names its field explicitly and an unlisted name is a
// registry bug, not a caller error.
fn int_accessor(field: &str) -> fn(&LogRecord) -> i64 {
    match field {
        "GroupDepth" => |record| i64::from(record.group_depth),
        "LineNumber" => |record| i64::from(record.line_number),
        other => unreachable!("`{other}` is not registered as an integer field"),
    }
}

fn str_accessor(field: &str) -> fn(&LogRecord) -> Option<&str> {
    match field {
        "FileName" => |record: &LogRecord| Some(record.source_file_name.as_str()),
        "AppName" => |record: &LogRecord| Some(record.app_name.as_str()),
        "Text" => |record: &LogRecord| Some(record.text.as_str()),
        "Exception.Message" => {
            |record: &LogRecord| record.exception.as_ref().map(|e| e.message.as_str())
        }
        "Exception.StackTrace" => {
            |record: &LogRecord| record.exception.as_ref().map(|e| e.stack_trace.as_str())
        }
        other => unreachable!("`{other}` is not registered as a string field"),
    }
}

/// One compiled test; boxed so a rule is a flat AND over heterogeneous
/// expression kinds.
type Test = Box<dyn Fn(&LogRecord) -> bool + Send + Sync>;

/// A compiled rule: pure, reusable, `Send + Sync`. Compilation cost is paid
/// once; applying the predicate allocates nothing.
pub struct AlertPredicate {
    tests: Vec<Test>,
}

impl AlertPredicate {
    /// Whether the record satisfies every expression of the rule. An empty
    /// rule matches every record.
    pub fn matches(&self, record: &LogRecord) -> bool {
        self.tests.iter().all(|test| test(record))
    }
}

// The boxed closures are opaque, so only the rule size is reportable.
impl std::fmt::Debug for AlertPredicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlertPredicate")
            .field("tests", &self.tests.len())
            .finish()
    }
}

fn compile_expression(expression: &AlertExpression) -> AlertResult<Test> {
    let kind = field_kind(&expression.field)?;
    let operator = Operator::from_str(&expression.operation)?;

    if !kind.allowed(operator) {
        return Err(AlertError::OperationNotAllowed {
            operation: operator,
            field: expression.field.clone(),
        });
    }

    let test: Test = match kind {
        FieldKind::Enum => {
            let wanted: LogType =
                expression
                    .body
                    .parse()
                    .map_err(|_| AlertError::ValueParse {
                        field: expression.field.clone(),
                        value: expression.body.clone(),
                        expected: "log type",
                    })?;
            // EqualTo and In both mean equality here.
            Box::new(move |record| record.log_type == wanted)
        }

        FieldKind::FlagEnum => {
            let wanted = LogLevel::from_names(&expression.body).ok_or_else(|| {
                AlertError::ValueParse {
                    field: expression.field.clone(),
                    value: expression.body.clone(),
                    expected: "log level",
                }
            })?;
            match operator {
                Operator::EqualTo => Box::new(move |record| record.log_level == wanted),
                Operator::NotEqualTo => Box::new(move |record| record.log_level != wanted),
                // Bitwise containment: the record's bitset masked with the
                // requested flags equals the requested flags, so a
                // single-value rule matches a multi-bit record.
                _ => Box::new(move |record| record.log_level & wanted == wanted),
            }
        }

        FieldKind::Int => {
            let wanted: i64 = expression
                .body
                .parse()
                .map_err(|_| AlertError::ValueParse {
                    field: expression.field.clone(),
                    value: expression.body.clone(),
                    expected: "integer",
                })?;
            let access = int_accessor(&expression.field);
            match operator {
                Operator::EqualTo => Box::new(move |record| access(record) == wanted),
                Operator::NotEqualTo => Box::new(move |record| access(record) != wanted),
                Operator::GreaterThan => Box::new(move |record| access(record) > wanted),
                Operator::GreaterThanOrEqualTo => Box::new(move |record| access(record) >= wanted),
                Operator::LessThan => Box::new(move |record| access(record) < wanted),
                _ => Box::new(move |record| access(record) <= wanted),
            }
        }

        FieldKind::Str => {
            let wanted = expression.body.clone();
            let access = str_accessor(&expression.field);
            // A record lacking the field (e.g. no exception) never matches.
            match operator {
                Operator::EqualTo => {
                    Box::new(move |record| access(record).is_some_and(|s| s == wanted))
                }
                Operator::NotEqualTo => {
                    Box::new(move |record| access(record).is_some_and(|s| s != wanted))
                }
                Operator::Contains => {
                    Box::new(move |record| access(record).is_some_and(|s| s.contains(&wanted)))
                }
                Operator::StartsWith => {
                    Box::new(move |record| access(record).is_some_and(|s| s.starts_with(&wanted)))
                }
                _ => Box::new(move |record| access(record).is_some_and(|s| s.ends_with(&wanted))),
            }
        }

        FieldKind::Tag => {
            // The body is a `;`-separated token set, matching the original
            // trait syntax.
            let wanted: Vec<String> = expression
                .body
                .split(';')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect();
            if wanted.is_empty() {
                return Err(AlertError::ValueParse {
                    field: expression.field.clone(),
                    value: expression.body.clone(),
                    expected: "tag set",
                });
            }
            match operator {
                Operator::EqualTo => Box::new(move |record| {
                    record.tags.len() == wanted.len()
                        && wanted.iter().all(|tag| record.tags.contains(tag))
                }),
                Operator::NotEqualTo => Box::new(move |record| {
                    record.tags.len() != wanted.len()
                        || !wanted.iter().all(|tag| record.tags.contains(tag))
                }),
                // Membership: every requested token is present on the record.
                _ => Box::new(move |record| {
                    wanted.iter().all(|tag| record.tags.contains(tag))
                }),
            }
        }
    };

    Ok(test)
}

/// Compile an ordered expression list into a single ANDed predicate.
///
/// An empty list compiles to an always-true predicate. Any failure aborts
/// the whole compilation.
pub fn compile(expressions: &[AlertExpression]) -> AlertResult<AlertPredicate> {
    let mut tests = Vec::with_capacity(expressions.len());
    for expression in expressions {
        tests.push(compile_expression(expression)?);
    }
    Ok(AlertPredicate { tests })
}

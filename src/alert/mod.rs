//! Rule-based alerting: declarative expressions compiled once into a pure
//! predicate over a log record, applied per incoming record.
//!
//! Independent of the index path; an alerting service filters the live
//! record stream with compiled predicates and notifies its senders on
//! match.

pub mod compiler;
pub mod service;

pub use compiler::{compile, AlertPredicate};
pub use service::{AlertSender, AlertService};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AlertError {
    #[error("Field `{0}` is invalid")]
    UnknownField(String),

    #[error("Operation `{0}` is invalid")]
    UnknownOperation(String),

    #[error("Operation `{operation}` is invalid for field `{field}`")]
    OperationNotAllowed { operation: Operator, field: String },

    #[error("Cannot parse `{value}` as {expected} for field `{field}`")]
    ValueParse {
        field: String,
        value: String,
        expected: &'static str,
    },
}

pub type AlertResult<T> = Result<T, AlertError>;

/// Comparison operator of one alert expression.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operator {
    EqualTo,
    NotEqualTo,
    GreaterThan,
    GreaterThanOrEqualTo,
    LessThan,
    LessThanOrEqualTo,
    Contains,
    StartsWith,
    EndsWith,
    In,
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operator::EqualTo => "EqualTo",
            Operator::NotEqualTo => "NotEqualTo",
            Operator::GreaterThan => "GreaterThan",
            Operator::GreaterThanOrEqualTo => "GreaterThanOrEqualTo",
            Operator::LessThan => "LessThan",
            Operator::LessThanOrEqualTo => "LessThanOrEqualTo",
            Operator::Contains => "Contains",
            Operator::StartsWith => "StartsWith",
            Operator::EndsWith => "EndsWith",
            Operator::In => "In",
        };
        write!(f, "{name}")
    }
}

impl FromStr for Operator {
    type Err = AlertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "EqualTo" => Ok(Operator::EqualTo),
            "NotEqualTo" => Ok(Operator::NotEqualTo),
            "GreaterThan" => Ok(Operator::GreaterThan),
            "GreaterThanOrEqualTo" => Ok(Operator::GreaterThanOrEqualTo),
            "LessThan" => Ok(Operator::LessThan),
            "LessThanOrEqualTo" => Ok(Operator::LessThanOrEqualTo),
            "Contains" => Ok(Operator::Contains),
            "StartsWith" => Ok(Operator::StartsWith),
            "EndsWith" => Ok(Operator::EndsWith),
            "In" => Ok(Operator::In),
            other => Err(AlertError::UnknownOperation(other.to_string())),
        }
    }
}

/// One `{field, operation, body}` triple of a rule. Expressions of a rule
/// are ANDed together in order.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct AlertExpression {
    pub field: String,
    pub operation: String,
    pub body: String,
}

impl AlertExpression {
    pub fn new(
        field: impl Into<String>,
        operation: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            operation: operation.into(),
            body: body.into(),
        }
    }
}

//! Registration and dispatch of compiled alert rules.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::model::LogRecord;

use super::compiler::{compile, AlertPredicate};
use super::{AlertExpression, AlertResult};

/// A notification target invoked when a rule matches a record.
pub trait AlertSender: Send + Sync {
    fn name(&self) -> &str;
    fn send(&self, record: &LogRecord);
}

struct AlertRule {
    predicate: AlertPredicate,
    senders: Vec<Arc<dyn AlertSender>>,
}

/// Holds the registered rules and filters the live record stream.
///
/// A rule is registered only after its expressions compiled successfully;
/// a partially-compiled, partially-active rule never exists.
#[derive(Default)]
pub struct AlertService {
    rules: RwLock<Vec<AlertRule>>,
}

impl AlertService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile `expressions` and register the rule with its senders.
    /// Compilation failure leaves the service unchanged.
    pub fn add_alert(
        &self,
        expressions: &[AlertExpression],
        senders: Vec<Arc<dyn AlertSender>>,
    ) -> AlertResult<()> {
        let predicate = compile(expressions)?;
        info!(expressions = expressions.len(), senders = senders.len(), "Alert rule registered");
        self.rules.write().push(AlertRule { predicate, senders });
        Ok(())
    }

    pub fn rule_count(&self) -> usize {
        self.rules.read().len()
    }

    /// Apply every registered rule to `record`; invoke the senders of each
    /// matching rule. Returns the number of rules that matched.
    pub fn dispatch(&self, record: &LogRecord) -> usize {
        let rules = self.rules.read();
        let mut matched = 0;
        for rule in rules.iter() {
            if rule.predicate.matches(record) {
                matched += 1;
                for sender in &rule.senders {
                    debug!(sender = sender.name(), monitor_id = %record.monitor_id, "Alert fired");
                    sender.send(record);
                }
            }
        }
        matched
    }
}

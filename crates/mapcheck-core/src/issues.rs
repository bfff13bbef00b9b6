//! Diagnostics sinks.
//!
//! Validation findings are pushed into an [`IssueReporter`]. The category is
//! always schema mapping and the only severity is error; filtering is left to
//! the caller.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

/// Severity of a reported issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum IssueSeverity {
    /// The mapping or file is inconsistent.
    Error,
}

impl std::fmt::Display for IssueSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IssueSeverity::Error => write!(f, "error"),
        }
    }
}

/// Category of a reported issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum IssueCategory {
    /// Business properties mapped onto the relational schema.
    SchemaMapping,
}

impl std::fmt::Display for IssueCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IssueCategory::SchemaMapping => write!(f, "business properties / schema mapping"),
        }
    }
}

/// A single reported issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    /// Issue severity.
    pub severity: IssueSeverity,
    /// Issue category.
    pub category: IssueCategory,
    /// Human readable message.
    pub message: String,
}

impl std::fmt::Display for Issue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.category, self.message)
    }
}

/// Trait for diagnostics backends.
pub trait IssueReporter: Send + Sync {
    /// Report an issue.
    fn report(&self, severity: IssueSeverity, category: IssueCategory, message: &str);
}

/// In-memory reporter, used by tests and the CLI.
#[derive(Debug, Default, Clone)]
pub struct MemoryIssueReporter {
    issues: Arc<Mutex<Vec<Issue>>>,
}

impl MemoryIssueReporter {
    /// Create an empty reporter.
    pub fn new() -> Self {
        Self::default()
    }

    /// All issues reported so far, in order.
    pub fn issues(&self) -> Vec<Issue> {
        self.issues.lock().clone()
    }

    /// Messages of all reported issues, in order.
    pub fn messages(&self) -> Vec<String> {
        self.issues.lock().iter().map(|i| i.message.clone()).collect()
    }

    /// Drop all collected issues.
    pub fn clear(&self) {
        self.issues.lock().clear();
    }

    /// Number of reported issues.
    pub fn len(&self) -> usize {
        self.issues.lock().len()
    }

    /// Whether nothing was reported.
    pub fn is_empty(&self) -> bool {
        self.issues.lock().is_empty()
    }
}

impl IssueReporter for MemoryIssueReporter {
    fn report(&self, severity: IssueSeverity, category: IssueCategory, message: &str) {
        self.issues.lock().push(Issue {
            severity,
            category,
            message: message.to_string(),
        });
    }
}

/// Reporter that emits every issue as a `tracing` error event.
#[derive(Debug, Default)]
pub struct TracingIssueReporter;

impl IssueReporter for TracingIssueReporter {
    fn report(&self, severity: IssueSeverity, category: IssueCategory, message: &str) {
        tracing::error!(%severity, %category, "{}", message);
    }
}

/// Reporter that discards everything.
#[derive(Debug, Default)]
pub struct NullIssueReporter;

impl IssueReporter for NullIssueReporter {
    fn report(&self, _severity: IssueSeverity, _category: IssueCategory, _message: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_reporter_keeps_order() {
        let reporter = MemoryIssueReporter::new();
        reporter.report(IssueSeverity::Error, IssueCategory::SchemaMapping, "first");
        reporter.report(IssueSeverity::Error, IssueCategory::SchemaMapping, "second");

        assert_eq!(reporter.len(), 2);
        assert_eq!(reporter.messages(), vec!["first", "second"]);

        reporter.clear();
        assert!(reporter.is_empty());
    }

    #[test]
    fn test_clones_share_storage() {
        let reporter = MemoryIssueReporter::new();
        let clone = reporter.clone();
        clone.report(IssueSeverity::Error, IssueCategory::SchemaMapping, "shared");
        assert_eq!(reporter.len(), 1);
    }

    #[test]
    fn test_issue_display() {
        let issue = Issue {
            severity: IssueSeverity::Error,
            category: IssueCategory::SchemaMapping,
            message: "Table 'x' is broken.".into(),
        };
        assert_eq!(
            issue.to_string(),
            "[error] business properties / schema mapping: Table 'x' is broken."
        );
    }
}

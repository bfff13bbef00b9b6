//! Output formatters for validation issues and check results.

use clap::ValueEnum;
use comfy_table::{Cell, Table};
use mapcheck_core::integrity::ProfileIssue;
use mapcheck_core::{Check, Issue, QuickCheckResult, Violation};

/// Output format for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// ASCII table format
    Table,
    /// JSON format
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Trait for formatting output.
pub trait Formatter {
    /// Format the issues reported by the mapping validator.
    fn format_issues(&self, issues: &[Issue]) -> String;

    /// Format the violations found by a single check.
    fn format_violations(&self, check: Check, violations: &[Violation]) -> String;

    /// Format quick-check results.
    fn format_quick_check(&self, results: &[QuickCheckResult]) -> String;
}

/// Create a formatter for the given output format.
pub fn create_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Table => Box::new(TableFormatter),
        OutputFormat::Json => Box::new(JsonFormatter),
    }
}

/// Table formatter using comfy-table.
pub struct TableFormatter;

impl Formatter for TableFormatter {
    fn format_issues(&self, issues: &[Issue]) -> String {
        if issues.is_empty() {
            return "Mapping is valid".to_string();
        }

        let mut table = Table::new();
        table.set_header(vec!["Severity", "Category", "Message"]);
        for issue in issues {
            table.add_row(vec![
                Cell::new(issue.severity),
                Cell::new(issue.category),
                Cell::new(&issue.message),
            ]);
        }

        format!("{}\n{} issue(s)", table, issues.len())
    }

    fn format_violations(&self, check: Check, violations: &[Violation]) -> String {
        if violations.is_empty() {
            return format!("{}: passed", check);
        }

        let mut table = Table::new();
        table.set_header(violation_header(check));
        for violation in violations {
            table.add_row(violation_cells(violation));
        }

        format!("{}\n{}: {} violation(s)", table, check, violations.len())
    }

    fn format_quick_check(&self, results: &[QuickCheckResult]) -> String {
        let mut table = Table::new();
        table.set_header(vec!["Check", "Status", "Elapsed"]);
        for result in results {
            table.add_row(vec![
                Cell::new(result.check),
                Cell::new(&result.status),
                Cell::new(format!("{:.1?}", result.elapsed)),
            ]);
        }

        let passed = results.iter().filter(|r| r.status.is_passed()).count();
        format!("{}\n{}/{} checks passed", table, passed, results.len())
    }
}

fn violation_header(check: Check) -> Vec<&'static str> {
    match check {
        Check::EcProfile => vec!["Kind", "Name", "Issue"],
        Check::DataColumns => vec!["Kind", "Table", "Name"],
        Check::NavIds => vec!["Instance", "Class", "Property", "Nav Id", "Target Class"],
        Check::NavClassIds => vec!["Instance", "Class", "Property", "RelECClassId", "Relationship"],
        Check::LinkTableIds => vec!["Instance", "Relationship", "End", "Missing Id", "Constraint Table"],
        Check::LinkTableClassIds => vec!["Instance", "Relationship", "End", "Class Id"],
        Check::ClassIds => vec!["Role", "Table", "Instance", "Class Id"],
        Check::MissingChildRows => vec!["Instance", "Class Id", "Class", "Table"],
        Check::SchemaLoad => vec!["Schema", "Message"],
    }
}

fn violation_cells(violation: &Violation) -> Vec<String> {
    match violation {
        Violation::EcProfile(v) => {
            let issue = match &v.issue {
                ProfileIssue::Missing => "missing".to_string(),
                ProfileIssue::DdlMismatch { expected, actual } => {
                    format!("expected: {}\nfound: {}", expected, actual)
                }
            };
            vec![v.kind.to_string(), v.name.clone(), issue]
        }
        Violation::DataColumns(v) => vec![
            v.kind.to_string(),
            v.table.clone(),
            v.name.clone().unwrap_or_default(),
        ],
        Violation::NavIds(v) => vec![
            v.instance_id.to_string(),
            v.class_name.clone(),
            v.property_name.clone(),
            v.nav_id.to_string(),
            v.target_class_name.clone(),
        ],
        Violation::NavClassIds(v) => vec![
            v.instance_id.to_string(),
            v.class_name.clone(),
            v.property_name.clone(),
            v.rel_class_id.to_string(),
            v.relationship_class_name.clone(),
        ],
        Violation::LinktableIds(v) => vec![
            v.instance_id.to_string(),
            v.relationship_class_name.clone(),
            v.end.to_string(),
            v.missing_id.to_string(),
            v.constraint_table.clone(),
        ],
        Violation::LinktableClassIds(v) => vec![
            v.instance_id.to_string(),
            v.relationship_class_name.clone(),
            v.end.to_string(),
            v.class_id.to_string(),
        ],
        Violation::ClassIds(v) => vec![
            v.table_role.to_string(),
            v.table_name.clone(),
            v.instance_id.to_string(),
            v.class_id.map_or_else(|| "NULL".to_string(), |id| id.to_string()),
        ],
        Violation::MissingChildRows(v) => vec![
            v.instance_id.to_string(),
            v.class_id.to_string(),
            v.class_name.clone(),
            v.table_name.clone(),
        ],
        Violation::SchemaLoad(v) => vec![v.schema_name.clone(), v.message.clone()],
    }
}

/// JSON formatter.
pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format_issues(&self, issues: &[Issue]) -> String {
        let value = serde_json::json!({
            "valid": issues.is_empty(),
            "issues": issues,
        });
        serde_json::to_string_pretty(&value).unwrap_or_else(|_| "{}".to_string())
    }

    fn format_violations(&self, check: Check, violations: &[Violation]) -> String {
        let value = serde_json::json!({
            "check": check,
            "passed": violations.is_empty(),
            "violations": violations,
        });
        serde_json::to_string_pretty(&value).unwrap_or_else(|_| "{}".to_string())
    }

    fn format_quick_check(&self, results: &[QuickCheckResult]) -> String {
        let rows: Vec<serde_json::Value> = results
            .iter()
            .map(|result| {
                serde_json::json!({
                    "check": result.check,
                    "passed": result.status.is_passed(),
                    "status": result.status.to_string(),
                    "elapsed_ms": result.elapsed.as_secs_f64() * 1000.0,
                })
            })
            .collect();
        serde_json::to_string_pretty(&rows).unwrap_or_else(|_| "[]".to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use mapcheck_core::integrity::{ClassIdViolation, NavIdViolation, TableRole};
    use mapcheck_core::{CheckStatus, IssueCategory, IssueSeverity};

    use super::*;

    fn nav_violation() -> Violation {
        Violation::NavIds(NavIdViolation {
            instance_id: 2,
            class_name: "TestSchema:Widget".into(),
            property_name: "Owner".into(),
            nav_id: 999,
            target_class_name: "TestSchema:Owner".into(),
        })
    }

    fn quick_results() -> Vec<QuickCheckResult> {
        vec![
            QuickCheckResult {
                check: Check::EcProfile,
                status: CheckStatus::Passed,
                elapsed: Duration::from_millis(3),
            },
            QuickCheckResult {
                check: Check::NavIds,
                status: CheckStatus::Failed,
                elapsed: Duration::from_millis(5),
            },
        ]
    }

    #[test]
    fn test_table_format_issues() {
        let formatter = TableFormatter;
        assert_eq!(formatter.format_issues(&[]), "Mapping is valid");

        let issues = vec![Issue {
            severity: IssueSeverity::Error,
            category: IssueCategory::SchemaMapping,
            message: "index 'ix_ts_Owner_Name' is broken".into(),
        }];
        let output = formatter.format_issues(&issues);
        assert!(output.contains("Severity"));
        assert!(output.contains("ix_ts_Owner_Name"));
        assert!(output.ends_with("1 issue(s)"));
    }

    #[test]
    fn test_table_format_violations() {
        let formatter = TableFormatter;
        assert_eq!(formatter.format_violations(Check::NavIds, &[]), "nav-ids: passed");

        let output = formatter.format_violations(Check::NavIds, &[nav_violation()]);
        assert!(output.contains("Target Class"));
        assert!(output.contains("TestSchema:Widget"));
        assert!(output.contains("999"));
        assert!(output.ends_with("nav-ids: 1 violation(s)"));
    }

    #[test]
    fn test_table_shows_null_class_id() {
        let violation = Violation::ClassIds(ClassIdViolation {
            table_role: TableRole::Joined,
            table_name: "ts_Part".into(),
            instance_id: 4,
            class_id: None,
        });
        let cells = violation_cells(&violation);
        assert_eq!(cells, vec!["joined", "ts_Part", "4", "NULL"]);
        assert_eq!(cells.len(), violation_header(Check::ClassIds).len());
    }

    #[test]
    fn test_table_format_quick_check() {
        let output = TableFormatter.format_quick_check(&quick_results());
        assert!(output.contains("ec-profile"));
        assert!(output.contains("failed"));
        assert!(output.ends_with("1/2 checks passed"));
    }

    #[test]
    fn test_json_format_violations() {
        let output = JsonFormatter.format_violations(Check::NavIds, &[nav_violation()]);
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["check"], "nav-ids");
        assert_eq!(value["passed"], false);
        assert_eq!(value["violations"][0]["check"], "nav-ids");
        assert_eq!(value["violations"][0]["nav_id"], 999);
    }

    #[test]
    fn test_json_format_quick_check() {
        let output = JsonFormatter.format_quick_check(&quick_results());
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value[0]["check"], "ec-profile");
        assert_eq!(value[0]["passed"], true);
        assert_eq!(value[1]["status"], "failed");
    }

    #[test]
    fn test_json_format_issues() {
        let output = JsonFormatter.format_issues(&[]);
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["valid"], true);
        assert!(value["issues"].as_array().unwrap().is_empty());
    }
}

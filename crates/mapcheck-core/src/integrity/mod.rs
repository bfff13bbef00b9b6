//! Integrity checker.
//!
//! Verifies that the data persisted in a file obeys its mapping. Every check
//! is read-only and streams one row per violation into a callback; the
//! callback returns `false` to stop the check early. Statements are always
//! finalized before a check returns.

mod child_rows;
mod class_id;
mod config;
mod link_table;
mod navigation;
mod physical;
mod profile;
mod schema_load;
mod violation;

use std::str::FromStr;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::catalog::{Catalog, ColumnKind, DbColumn, DbTable};
use crate::error::Error;
use crate::storage::Store;

pub use config::IntegrityConfig;
pub use violation::{
    ClassIdViolation, LinkTableClassIdViolation, LinkTableIdViolation, MissingChildRowViolation,
    NavClassIdViolation, NavIdViolation, PhysicalDriftViolation, ProfileIssue, ProfileViolation,
    SchemaLoadViolation, TableRole, Violation,
};

/// A named integrity check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Check {
    /// System table, index and trigger DDL against the pinned profile.
    #[serde(rename = "ec-profile")]
    EcProfile,
    /// Catalog tables, columns and indexes against the physical schema.
    #[serde(rename = "data-columns")]
    DataColumns,
    /// Navigation ids against their target rows.
    #[serde(rename = "nav-ids")]
    NavIds,
    /// Navigation relationship class ids against the relationship hierarchy.
    #[serde(rename = "nav-class-ids")]
    NavClassIds,
    /// Link table end ids against their constraint tables.
    #[serde(rename = "linktable-ids")]
    LinkTableIds,
    /// Link table end class ids against their constraint classes.
    #[serde(rename = "linktable-class-ids")]
    LinkTableClassIds,
    /// Stored class ids against the class catalog.
    #[serde(rename = "class-ids")]
    ClassIds,
    /// Base table rows against their joined table rows.
    #[serde(rename = "missing-child-rows")]
    MissingChildRows,
    /// Schema resolution.
    #[serde(rename = "schema-load")]
    SchemaLoad,
}

impl Check {
    /// Every check, in quick-check order.
    pub const ALL: [Check; 9] = [
        Check::EcProfile,
        Check::DataColumns,
        Check::NavIds,
        Check::NavClassIds,
        Check::LinkTableIds,
        Check::LinkTableClassIds,
        Check::ClassIds,
        Check::MissingChildRows,
        Check::SchemaLoad,
    ];

    /// The check name.
    pub fn name(&self) -> &'static str {
        match self {
            Check::EcProfile => "ec-profile",
            Check::DataColumns => "data-columns",
            Check::NavIds => "nav-ids",
            Check::NavClassIds => "nav-class-ids",
            Check::LinkTableIds => "linktable-ids",
            Check::LinkTableClassIds => "linktable-class-ids",
            Check::ClassIds => "class-ids",
            Check::MissingChildRows => "missing-child-rows",
            Check::SchemaLoad => "schema-load",
        }
    }
}

impl std::fmt::Display for Check {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Error parsing a check name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown check '{0}'")]
pub struct ParseCheckError(pub String);

impl FromStr for Check {
    type Err = ParseCheckError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Check::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseCheckError(s.to_string()))
    }
}

/// Outcome of one quick-check item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum CheckStatus {
    /// No violation.
    Passed,
    /// At least one violation.
    Failed,
    /// The check could not run.
    Error(String),
}

impl CheckStatus {
    /// Whether the check passed.
    pub fn is_passed(&self) -> bool {
        matches!(self, CheckStatus::Passed)
    }
}

impl std::fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckStatus::Passed => write!(f, "passed"),
            CheckStatus::Failed => write!(f, "failed"),
            CheckStatus::Error(message) => write!(f, "error: {}", message),
        }
    }
}

/// Summary of one quick-check item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuickCheckResult {
    /// Which check.
    pub check: Check,
    /// Outcome.
    pub status: CheckStatus,
    /// Time spent.
    pub elapsed: Duration,
}

/// Runs integrity checks against a store.
///
/// The catalog is loaded afresh for every check.
pub struct IntegrityChecker<'a> {
    store: &'a Store,
    config: IntegrityConfig,
}

impl<'a> IntegrityChecker<'a> {
    /// Create a checker.
    pub fn new(store: &'a Store, config: IntegrityConfig) -> Self {
        Self { store, config }
    }

    /// The checker configuration.
    pub fn config(&self) -> &IntegrityConfig {
        &self.config
    }

    /// Run a check and convert its rows into [`Violation`]s.
    ///
    /// Returns the number of rows delivered to the callback.
    pub fn run_check<F>(&self, check: Check, mut on_row: F) -> Result<usize, Error>
    where
        F: FnMut(Violation) -> bool,
    {
        match check {
            Check::EcProfile => self.check_ec_profile(|v| on_row(Violation::EcProfile(v))),
            Check::DataColumns => self.check_data_columns(|v| on_row(Violation::DataColumns(v))),
            Check::NavIds => self.check_nav_ids(|v| on_row(Violation::NavIds(v))),
            Check::NavClassIds => self.check_nav_class_ids(|v| on_row(Violation::NavClassIds(v))),
            Check::LinkTableIds => self.check_link_table_ids(|v| on_row(Violation::LinktableIds(v))),
            Check::LinkTableClassIds => {
                self.check_link_table_class_ids(|v| on_row(Violation::LinktableClassIds(v)))
            }
            Check::ClassIds => self.check_class_ids(|v| on_row(Violation::ClassIds(v))),
            Check::MissingChildRows => {
                self.check_configured_child_rows(|v| on_row(Violation::MissingChildRows(v)))
            }
            Check::SchemaLoad => self.check_schema_load(|v| on_row(Violation::SchemaLoad(v))),
        }
    }

    /// Run a set of checks, reporting pass/fail and elapsed time per check.
    ///
    /// Each check stops at its first violation. A failing or erroring check
    /// does not stop the remaining ones. Returns whether all checks passed.
    #[instrument(skip(self, on_result))]
    pub fn quick_check<F>(&self, checks: &[Check], mut on_result: F) -> bool
    where
        F: FnMut(&QuickCheckResult),
    {
        let mut all_passed = true;
        for check in checks {
            let start = Instant::now();
            let status = match self.run_check(*check, |_| false) {
                Ok(0) => CheckStatus::Passed,
                Ok(_) => CheckStatus::Failed,
                Err(err) => CheckStatus::Error(err.to_string()),
            };
            let result = QuickCheckResult {
                check: *check,
                status,
                elapsed: start.elapsed(),
            };

            if result.status.is_passed() {
                debug!(check = %result.check, elapsed_ms = result.elapsed.as_millis() as u64, "check passed");
            } else {
                all_passed = false;
                warn!(check = %result.check, status = %result.status, "check did not pass");
            }
            on_result(&result);
        }
        info!(checks = checks.len(), all_passed, "quick check finished");
        all_passed
    }

    fn catalog(&self) -> Result<Catalog, Error> {
        Catalog::load(self.store)
    }
}

/// Counts rows handed to a check callback and remembers when it asked to stop.
pub(crate) struct RowSink<F> {
    on_row: F,
    delivered: usize,
}

impl<F> RowSink<F> {
    pub(crate) fn new(on_row: F) -> Self {
        Self {
            on_row,
            delivered: 0,
        }
    }

    /// Deliver a row. Returns `false` once the callback asked to stop.
    pub(crate) fn emit<T>(&mut self, row: T) -> bool
    where
        F: FnMut(T) -> bool,
    {
        self.delivered += 1;
        (self.on_row)(row)
    }

    /// Rows delivered so far.
    pub(crate) fn delivered(&self) -> usize {
        self.delivered
    }
}

/// The single column of the given kind, if it has physical storage.
pub(crate) fn physical_system_column<'c>(
    catalog: &'c Catalog,
    table: &'c DbTable,
    kind: ColumnKind,
) -> Option<&'c DbColumn> {
    catalog
        .table_columns(table)
        .find(|c| c.kind == kind && !c.is_virtual)
}

/// Comma separated integer list for an SQL `IN (...)` clause.
pub(crate) fn id_list(ids: &[i64]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_names_round_trip() {
        for check in Check::ALL {
            assert_eq!(check.name().parse::<Check>().unwrap(), check);
        }
        assert_eq!("NAV-IDS".parse::<Check>().unwrap(), Check::NavIds);
        assert_eq!(
            "bogus".parse::<Check>().unwrap_err(),
            ParseCheckError("bogus".into())
        );
    }

    #[test]
    fn test_row_sink_counts_and_stops() {
        let mut seen = Vec::new();
        let mut sink = RowSink::new(|row: i64| {
            seen.push(row);
            row < 2
        });
        assert!(sink.emit(1));
        assert!(!sink.emit(2));
        assert_eq!(sink.delivered(), 2);
        drop(sink);
        assert_eq!(seen, vec![1, 2]);
    }

    #[test]
    fn test_id_list() {
        assert_eq!(id_list(&[3, 1, 2]), "3,1,2");
        assert_eq!(id_list(&[]), "");
    }
}

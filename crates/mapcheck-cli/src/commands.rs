//! Subcommand implementations.
//!
//! Each command prints its report and returns whether the file passed.

use std::path::Path;

use mapcheck_core::{
    Check, Error, IntegrityChecker, IntegrityConfig, MapValidator, MemoryIssueReporter, Store,
};

use crate::formatter::Formatter;

pub type CommandResult = Result<bool, Box<dyn std::error::Error>>;

fn open(file: &Path) -> Result<Store, Error> {
    tracing::debug!(file = %file.display(), "opening database");
    Store::open_read_only(file)
}

/// Validate the mapping of a file.
pub fn validate(file: &Path, formatter: &dyn Formatter) -> CommandResult {
    let store = open(file)?;
    let reporter = MemoryIssueReporter::new();
    let result = MapValidator::new(&store, &reporter).validate();

    println!("{}", formatter.format_issues(&reporter.issues()));
    match result {
        Ok(()) => Ok(true),
        Err(Error::ValidationFailed { .. }) => Ok(false),
        Err(err) => Err(err.into()),
    }
}

/// Run a single check, collecting at most `limit` violations.
pub fn check(
    file: &Path,
    check: Check,
    config: IntegrityConfig,
    limit: Option<u64>,
    formatter: &dyn Formatter,
) -> CommandResult {
    let store = open(file)?;
    let checker = IntegrityChecker::new(&store, config);

    let mut violations = Vec::new();
    let delivered = checker.run_check(check, |violation| {
        violations.push(violation);
        limit.map_or(true, |limit| (violations.len() as u64) < limit)
    })?;
    tracing::info!(%check, violations = delivered, "check finished");

    println!("{}", formatter.format_violations(check, &violations));
    Ok(delivered == 0)
}

/// Run the quick-check set. An empty selection runs every check.
pub fn quick_check(
    file: &Path,
    checks: &[Check],
    config: IntegrityConfig,
    formatter: &dyn Formatter,
) -> CommandResult {
    let store = open(file)?;
    let checker = IntegrityChecker::new(&store, config);
    let checks: &[Check] = if checks.is_empty() { &Check::ALL } else { checks };

    let mut results = Vec::new();
    let passed = checker.quick_check(checks, |result| results.push(result.clone()));

    println!("{}", formatter.format_quick_check(&results));
    Ok(passed)
}

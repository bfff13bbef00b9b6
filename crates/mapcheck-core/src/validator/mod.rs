//! Mapping validator.
//!
//! Checks that a schema mapping is legal and self-consistent. A run goes
//! through these steps in order:
//!
//! 1. load the catalog and build the column to index lookup
//! 2. validate every table
//! 3. validate every index
//! 4. reconcile the number of persisted class maps with the loaded ones
//! 5. validate every class map and its property maps
//! 6. detect property paths mapped to more than one column
//! 7. detect orphaned custom attributes
//!
//! The first failure in steps 1 to 3 ends the run. From step 4 on, each item
//! stops at its first failure and the run moves on to the next item.

mod catalog_rows;
mod class_map;
mod index;
mod property_map;
mod table;

use std::cell::Cell;

use tracing::{debug, info, instrument};

use crate::catalog::Catalog;
use crate::error::Error;
use crate::issues::{IssueCategory, IssueReporter, IssueSeverity};
use crate::storage::Store;

pub use index::ColumnIndexMap;

/// Validates the mapping persisted in a store.
pub struct MapValidator<'a> {
    store: &'a Store,
    reporter: &'a dyn IssueReporter,
}

impl<'a> MapValidator<'a> {
    /// Create a validator reporting into the given sink.
    pub fn new(store: &'a Store, reporter: &'a dyn IssueReporter) -> Self {
        Self { store, reporter }
    }

    /// Validate the mapping.
    ///
    /// Returns `Ok(())` if nothing was reported. Every error return is
    /// preceded by at least one report.
    #[instrument(skip(self))]
    pub fn validate(&self) -> Result<(), Error> {
        let issues = IssueCounter::new(self.reporter);
        let result = self.run(&issues);

        if let Err(err) = &result {
            if !err.is_reported() {
                issues.report(&format!("validation aborted: {}", err));
            }
        }

        let count = issues.count();
        match result {
            Ok(()) if count == 0 => {
                info!("mapping validation succeeded");
                Ok(())
            }
            Ok(()) | Err(Error::MappingViolation(_)) | Err(Error::ValidationFailed { .. }) => {
                info!(issues = count, "mapping validation failed");
                Err(Error::ValidationFailed { issues: count })
            }
            Err(err) => {
                info!(error = %err, "mapping validation aborted");
                Err(err)
            }
        }
    }

    fn run(&self, issues: &IssueCounter<'_>) -> Result<(), Error> {
        let catalog = Catalog::load(self.store)?;
        let column_indexes = ColumnIndexMap::build(&catalog);
        let ctx = ValidationContext {
            catalog: &catalog,
            store: self.store,
            column_indexes: &column_indexes,
            issues,
        };

        debug!("validating tables");
        for db_table in catalog.tables() {
            table::validate_table(&ctx, db_table)?;
        }

        debug!("validating indexes");
        for db_index in catalog.indexes() {
            index::validate_index(&ctx, db_index)?;
        }

        debug!("validating class maps");
        continue_after_violation(catalog_rows::validate_class_map_count(&ctx))?;
        for map in catalog.class_maps() {
            continue_after_violation(class_map::validate_class_map(&ctx, map))?;
        }

        debug!("checking persisted property maps and custom attributes");
        catalog_rows::validate_duplicate_property_maps(&ctx)?;
        catalog_rows::validate_custom_attributes(&ctx)?;
        Ok(())
    }
}

/// Swallow a reported mapping violation so the run continues with the next
/// item. Anything else is an infrastructure failure and ends the run.
fn continue_after_violation(result: Result<(), Error>) -> Result<(), Error> {
    match result {
        Err(Error::MappingViolation(_)) => Ok(()),
        other => other,
    }
}

/// Issue sink wrapper counting what was reported during a run.
pub(crate) struct IssueCounter<'a> {
    sink: &'a dyn IssueReporter,
    count: Cell<usize>,
}

impl<'a> IssueCounter<'a> {
    fn new(sink: &'a dyn IssueReporter) -> Self {
        Self {
            sink,
            count: Cell::new(0),
        }
    }

    /// Report a schema mapping error.
    pub(crate) fn report(&self, message: &str) {
        self.count.set(self.count.get() + 1);
        self.sink
            .report(IssueSeverity::Error, IssueCategory::SchemaMapping, message);
    }

    /// Number of reported issues.
    pub(crate) fn count(&self) -> usize {
        self.count.get()
    }
}

/// Shared, read-only state of one validation run.
pub(crate) struct ValidationContext<'a> {
    pub(crate) catalog: &'a Catalog,
    pub(crate) store: &'a Store,
    pub(crate) column_indexes: &'a ColumnIndexMap,
    pub(crate) issues: &'a IssueCounter<'a>,
}

impl ValidationContext<'_> {
    /// Report a violation and return it as an error.
    pub(crate) fn fail(&self, message: String) -> Error {
        self.issues.report(&message);
        Error::MappingViolation(message)
    }
}

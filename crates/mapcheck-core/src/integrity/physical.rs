//! Catalog against physical schema.

use tracing::instrument;

use crate::error::Error;
use crate::storage::PhysicalObjectKind;

use super::{IntegrityChecker, PhysicalDriftViolation, RowSink};

impl IntegrityChecker<'_> {
    /// Report catalog tables, non-virtual columns and indexes that do not
    /// exist physically. Columns and indexes of a missing table are not
    /// reported separately.
    #[instrument(skip(self, on_row))]
    pub fn check_data_columns<F>(&self, on_row: F) -> Result<usize, Error>
    where
        F: FnMut(PhysicalDriftViolation) -> bool,
    {
        let catalog = self.catalog()?;
        let mut sink = RowSink::new(on_row);

        'tables: for table in catalog.tables().filter(|t| !t.is_virtual()) {
            if !self.store.table_exists(&table.name)? {
                let violation = PhysicalDriftViolation {
                    kind: PhysicalObjectKind::Table,
                    table: table.name.clone(),
                    name: None,
                };
                if !sink.emit(violation) {
                    break;
                }
                continue;
            }

            let physical = self.store.physical_columns(&table.name)?;
            for column in catalog.table_columns(table).filter(|c| !c.is_virtual) {
                if physical.iter().any(|p| p.eq_ignore_ascii_case(&column.name)) {
                    continue;
                }
                let violation = PhysicalDriftViolation {
                    kind: PhysicalObjectKind::Column,
                    table: table.name.clone(),
                    name: Some(column.name.clone()),
                };
                if !sink.emit(violation) {
                    break 'tables;
                }
            }

            for index in table.indexes.iter().filter_map(|id| catalog.index(*id)) {
                if self.store.index_exists(&index.name)? {
                    continue;
                }
                let violation = PhysicalDriftViolation {
                    kind: PhysicalObjectKind::Index,
                    table: table.name.clone(),
                    name: Some(index.name.clone()),
                };
                if !sink.emit(violation) {
                    break 'tables;
                }
            }
        }
        Ok(sink.delivered())
    }
}

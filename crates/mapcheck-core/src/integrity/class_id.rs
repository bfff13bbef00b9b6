//! Stored class id check.

use std::collections::BTreeSet;

use tracing::{debug, instrument};

use crate::catalog::{Catalog, ColumnKind, DbColumn, DbTable, TableId, TableType};
use crate::error::Error;
use crate::storage::quote_ident;

use super::{id_list, physical_system_column, ClassIdViolation, IntegrityChecker, RowSink, TableRole};

/// A table whose class id column is checked.
struct ClassIdTable<'c> {
    role: TableRole,
    table: &'c DbTable,
    instance: &'c DbColumn,
    class_id: &'c DbColumn,
}

/// Root tables of table-per-hierarchy classes, then joined tables, then
/// overflow tables, each in table id order.
fn class_id_tables(catalog: &Catalog) -> Vec<ClassIdTable<'_>> {
    let roots: BTreeSet<TableId> = catalog
        .class_maps()
        .filter(|map| catalog.is_hierarchy_root(map))
        .filter_map(|map| catalog.primary_table(map))
        .map(|t| t.id)
        .collect();

    let primary = roots
        .iter()
        .filter_map(|id| catalog.table(*id))
        .map(|t| (TableRole::Primary, t));
    let joined = catalog
        .tables()
        .filter(|t| t.table_type == TableType::Joined)
        .map(|t| (TableRole::Joined, t));
    let overflow = catalog
        .tables()
        .filter(|t| t.table_type == TableType::Overflow)
        .map(|t| (TableRole::Overflow, t));

    primary
        .chain(joined)
        .chain(overflow)
        .filter(|(_, t)| !t.is_virtual())
        .filter_map(|(role, table)| {
            Some(ClassIdTable {
                role,
                table,
                instance: physical_system_column(catalog, table, ColumnKind::InstanceId)?,
                class_id: physical_system_column(catalog, table, ColumnKind::ClassId)?,
            })
        })
        .collect()
}

impl IntegrityChecker<'_> {
    /// Report rows whose class id is NULL or names no class.
    #[instrument(skip(self, on_row))]
    pub fn check_class_ids<F>(&self, on_row: F) -> Result<usize, Error>
    where
        F: FnMut(ClassIdViolation) -> bool,
    {
        let catalog = self.catalog()?;
        let mut sink = RowSink::new(on_row);

        for target in class_id_tables(&catalog) {
            let class_id = quote_ident(&target.class_id.name);
            let table = quote_ident(&target.table.name);

            let mut has_null = false;
            let mut unknown = Vec::new();
            self.store.for_each_row(
                &format!(
                    "SELECT DISTINCT {col} FROM {table} WHERE {col} IS NULL OR {col} NOT IN (SELECT Id FROM ec_Class)",
                    col = class_id,
                    table = table,
                ),
                [],
                |row| {
                    match row.get::<_, Option<i64>>(0)? {
                        Some(id) => unknown.push(id),
                        None => has_null = true,
                    }
                    Ok(true)
                },
            )?;

            let mut conditions = Vec::new();
            if has_null {
                conditions.push(format!("{} IS NULL", class_id));
            }
            if !unknown.is_empty() {
                conditions.push(format!("{} IN ({})", class_id, id_list(&unknown)));
            }
            if conditions.is_empty() {
                continue;
            }

            debug!(table = %target.table.name, role = %target.role, "found invalid class ids");
            let sql = format!(
                "SELECT {inst}, {col} FROM {table} WHERE {cond} ORDER BY {inst}",
                inst = quote_ident(&target.instance.name),
                col = class_id,
                table = table,
                cond = conditions.join(" OR "),
            );
            let completed = self.store.for_each_row(&sql, [], |row| {
                Ok(sink.emit(ClassIdViolation {
                    table_role: target.role,
                    table_name: target.table.name.clone(),
                    instance_id: row.get(0)?,
                    class_id: row.get(1)?,
                }))
            })?;
            if !completed {
                break;
            }
        }
        Ok(sink.delivered())
    }
}

//! Missing joined table rows.

use std::collections::BTreeMap;

use tracing::{debug, instrument};

use crate::catalog::{Catalog, ClassId, ColumnKind, DbTable, TableId, TableType};
use crate::error::Error;
use crate::storage::quote_ident;

use super::{id_list, physical_system_column, IntegrityChecker, MissingChildRowViolation, RowSink};

impl IntegrityChecker<'_> {
    /// Report rows of `base_table` whose class maps onto a joined table that
    /// has no row with the same instance id.
    #[instrument(skip(self, on_row))]
    pub fn check_missing_child_rows<F>(&self, base_table: &str, on_row: F) -> Result<usize, Error>
    where
        F: FnMut(MissingChildRowViolation) -> bool,
    {
        let catalog = self.catalog()?;
        let table = catalog
            .table_by_name(base_table)
            .ok_or_else(|| Error::NotFound(format!("table '{}'", base_table)))?;
        let mut sink = RowSink::new(on_row);
        self.missing_child_rows_in(&catalog, table, &mut sink)?;
        Ok(sink.delivered())
    }

    /// Missing child rows over the configured base tables, or over every
    /// primary table with a joined child when none are configured.
    pub(crate) fn check_configured_child_rows<F>(&self, on_row: F) -> Result<usize, Error>
    where
        F: FnMut(MissingChildRowViolation) -> bool,
    {
        let catalog = self.catalog()?;
        let base_tables: Vec<&DbTable> = if self.config.child_row_base_tables.is_empty() {
            catalog
                .tables()
                .filter(|t| t.table_type == TableType::Primary)
                .filter(|t| {
                    t.children.iter().any(|c| {
                        catalog
                            .table(*c)
                            .is_some_and(|child| child.table_type == TableType::Joined)
                    })
                })
                .collect()
        } else {
            self.config
                .child_row_base_tables
                .iter()
                .map(|name| {
                    catalog
                        .table_by_name(name)
                        .ok_or_else(|| Error::NotFound(format!("table '{}'", name)))
                })
                .collect::<Result<_, _>>()?
        };

        let mut sink = RowSink::new(on_row);
        for table in base_tables {
            if !self.missing_child_rows_in(&catalog, table, &mut sink)? {
                break;
            }
        }
        Ok(sink.delivered())
    }

    /// Returns `false` if the callback stopped the scan.
    fn missing_child_rows_in<F>(
        &self,
        catalog: &Catalog,
        base: &DbTable,
        sink: &mut RowSink<F>,
    ) -> Result<bool, Error>
    where
        F: FnMut(MissingChildRowViolation) -> bool,
    {
        let (Some(instance), Some(class_id)) = (
            physical_system_column(catalog, base, ColumnKind::InstanceId),
            physical_system_column(catalog, base, ColumnKind::ClassId),
        ) else {
            return Err(Error::InvalidCatalog(format!(
                "table '{}' has no instance id and class id columns",
                base.name
            )));
        };
        let base_name = quote_ident(&base.name);
        let instance_name = quote_ident(&instance.name);

        // Joined tables expected for every class stored in the base table.
        let mut expected: BTreeMap<i64, Vec<TableId>> = BTreeMap::new();
        self.store.for_each_row(
            &format!(
                "SELECT ct.ClassId, ct.TableId FROM ec_cache_ClassHasTables ct
                 WHERE ct.ClassId IN (SELECT DISTINCT {} FROM {})
                 ORDER BY ct.ClassId, ct.TableId",
                quote_ident(&class_id.name),
                base_name
            ),
            [],
            |row| {
                let class: i64 = row.get(0)?;
                let table = TableId(row.get(1)?);
                let entry = expected.entry(class).or_default();
                let joined = catalog
                    .table(table)
                    .is_some_and(|t| t.table_type == TableType::Joined && t.id != base.id);
                if joined {
                    entry.push(table);
                }
                Ok(true)
            },
        )?;

        let mut groups: BTreeMap<Vec<TableId>, Vec<i64>> = BTreeMap::new();
        for (class, tables) in expected {
            if !tables.is_empty() {
                groups.entry(tables).or_default().push(class);
            }
        }

        for (tables, classes) in groups {
            for child in tables.iter().filter_map(|id| catalog.table(*id)) {
                let Some(child_instance) =
                    physical_system_column(catalog, child, ColumnKind::InstanceId)
                else {
                    continue;
                };
                debug!(base = %base.name, child = %child.name, classes = classes.len(), "checking child rows");
                let sql = format!(
                    "SELECT b.{inst}, b.{cls} FROM {base} b
                     WHERE b.{cls} IN ({classes})
                       AND NOT EXISTS (SELECT 1 FROM {child} c WHERE c.{child_inst}=b.{inst})
                     ORDER BY b.{inst}",
                    inst = instance_name,
                    cls = quote_ident(&class_id.name),
                    base = base_name,
                    classes = id_list(&classes),
                    child = quote_ident(&child.name),
                    child_inst = quote_ident(&child_instance.name),
                );
                let completed = self.store.for_each_row(&sql, [], |row| {
                    let class: i64 = row.get(1)?;
                    Ok(sink.emit(MissingChildRowViolation {
                        instance_id: row.get(0)?,
                        class_id: class,
                        class_name: catalog.class_name(ClassId(class)),
                        table_name: child.name.clone(),
                    }))
                })?;
                if !completed {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }
}

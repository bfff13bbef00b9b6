//! Link table checks.

use tracing::{debug, instrument};

use crate::catalog::{
    Catalog, ClassId, ClassMap, ClassMapType, ColumnKind, DbColumn, DbTable, RelationshipDef,
    RelationshipEnd, SystemPropertyKind,
};
use crate::error::Error;
use crate::storage::quote_ident;

use super::{
    id_list, physical_system_column, IntegrityChecker, LinkTableClassIdViolation, LinkTableIdViolation,
    RowSink,
};

/// One end of a root link table relationship.
struct LinkTableEnd<'c> {
    relationship_name: String,
    relationship: &'c RelationshipDef,
    end: RelationshipEnd,
    table: &'c DbTable,
    instance: &'c DbColumn,
    end_id: &'c DbColumn,
    end_class_id: &'c DbColumn,
}

/// The column a system property is mapped to within `table`.
fn system_column<'c>(
    catalog: &'c Catalog,
    map: &'c ClassMap,
    kind: SystemPropertyKind,
    table: &DbTable,
) -> Option<&'c DbColumn> {
    map.system_map(kind)?
        .columns
        .iter()
        .filter_map(|c| catalog.column(*c))
        .find(|c| c.table == table.id)
}

/// Ends of every link table relationship without a base class, source first.
fn link_table_ends(catalog: &Catalog) -> Vec<LinkTableEnd<'_>> {
    let mut ends = Vec::new();
    for map in catalog.class_maps() {
        if map.map_type != ClassMapType::RelationshipLinkTable {
            continue;
        }
        let Some(class) = catalog.class(map.class) else {
            continue;
        };
        if !class.base_classes.is_empty() {
            continue;
        }
        let Some(relationship) = catalog.relationship(map.class) else {
            continue;
        };
        let Some(table) = catalog.primary_table(map).filter(|t| !t.is_virtual()) else {
            continue;
        };
        let Some(instance) = system_column(catalog, map, SystemPropertyKind::InstanceId, table)
        else {
            continue;
        };

        for (end, id_kind, class_kind) in [
            (
                RelationshipEnd::Source,
                SystemPropertyKind::SourceInstanceId,
                SystemPropertyKind::SourceClassId,
            ),
            (
                RelationshipEnd::Target,
                SystemPropertyKind::TargetInstanceId,
                SystemPropertyKind::TargetClassId,
            ),
        ] {
            let (Some(end_id), Some(end_class_id)) = (
                system_column(catalog, map, id_kind, table),
                system_column(catalog, map, class_kind, table),
            ) else {
                continue;
            };
            ends.push(LinkTableEnd {
                relationship_name: class.full_name.clone(),
                relationship,
                end,
                table,
                instance,
                end_id,
                end_class_id,
            });
        }
    }
    ends
}

impl IntegrityChecker<'_> {
    /// Report link table rows whose source or target id has no row in the
    /// tables of the end's constraint classes.
    #[instrument(skip(self, on_row))]
    pub fn check_link_table_ids<F>(&self, on_row: F) -> Result<usize, Error>
    where
        F: FnMut(LinkTableIdViolation) -> bool,
    {
        let catalog = self.catalog()?;
        let mut sink = RowSink::new(on_row);

        for end in link_table_ends(&catalog) {
            if end.end_id.is_virtual {
                continue;
            }
            let targets = catalog.constraint_tables(end.relationship.class, end.end);
            if targets.is_empty() {
                return Err(Error::InvalidCatalog(format!(
                    "relationship '{}' has no table for its {} end",
                    end.relationship_name, end.end
                )));
            }

            let mut not_exists = String::new();
            let mut target_names = Vec::new();
            for table in targets.iter().filter_map(|id| catalog.table(*id)) {
                let Some(target_instance) =
                    physical_system_column(&catalog, table, ColumnKind::InstanceId)
                else {
                    continue;
                };
                not_exists.push_str(&format!(
                    " AND NOT EXISTS (SELECT 1 FROM {} t WHERE t.{}=l.{})",
                    quote_ident(&table.name),
                    quote_ident(&target_instance.name),
                    quote_ident(&end.end_id.name)
                ));
                target_names.push(table.name.clone());
            }
            let constraint_table = target_names.join(", ");

            let sql = format!(
                "SELECT l.{inst}, l.{id} FROM {table} l WHERE l.{id} IS NOT NULL{not_exists} ORDER BY l.{inst}",
                inst = quote_ident(&end.instance.name),
                id = quote_ident(&end.end_id.name),
                table = quote_ident(&end.table.name),
                not_exists = not_exists,
            );
            debug!(relationship = %end.relationship_name, end = %end.end, "checking link table ids");
            let completed = self.store.for_each_row(&sql, [], |row| {
                Ok(sink.emit(LinkTableIdViolation {
                    instance_id: row.get(0)?,
                    relationship_class_name: end.relationship_name.clone(),
                    end: end.end,
                    missing_id: row.get(1)?,
                    constraint_table: constraint_table.clone(),
                }))
            })?;
            if !completed {
                break;
            }
        }
        Ok(sink.delivered())
    }

    /// Report link table rows whose source or target class id is not one of
    /// the end's constraint classes, or a subclass of one when the end is
    /// polymorphic.
    #[instrument(skip(self, on_row))]
    pub fn check_link_table_class_ids<F>(&self, on_row: F) -> Result<usize, Error>
    where
        F: FnMut(LinkTableClassIdViolation) -> bool,
    {
        let catalog = self.catalog()?;
        let mut sink = RowSink::new(on_row);

        for end in link_table_ends(&catalog) {
            if end.end_class_id.is_virtual {
                continue;
            }
            let constraint = end.relationship.end(end.end);
            let classes: Vec<i64> = constraint.classes.iter().map(|ClassId(id)| *id).collect();
            let valid = if constraint.polymorphic {
                format!(
                    "SELECT ClassId FROM ec_cache_ClassHierarchy WHERE BaseClassId IN ({})",
                    id_list(&classes)
                )
            } else {
                id_list(&classes)
            };
            let column = quote_ident(&end.end_class_id.name);
            let table = quote_ident(&end.table.name);

            let invalid = self.store.query_ids(
                &format!(
                    "SELECT DISTINCT l.{col} FROM {table} l WHERE l.{col} IS NOT NULL AND l.{col} NOT IN ({valid})",
                    col = column,
                    table = table,
                    valid = valid,
                ),
                [],
            )?;
            if invalid.is_empty() {
                continue;
            }

            let sql = format!(
                "SELECT l.{inst}, l.{col} FROM {table} l WHERE l.{col} IN ({ids}) ORDER BY l.{inst}",
                inst = quote_ident(&end.instance.name),
                col = column,
                table = table,
                ids = id_list(&invalid),
            );
            let completed = self.store.for_each_row(&sql, [], |row| {
                Ok(sink.emit(LinkTableClassIdViolation {
                    instance_id: row.get(0)?,
                    relationship_class_name: end.relationship_name.clone(),
                    end: end.end,
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

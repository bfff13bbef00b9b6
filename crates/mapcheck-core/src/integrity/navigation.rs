//! Navigation property checks.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use tracing::{debug, instrument};

use crate::catalog::{
    Catalog, ClassId, ClassMapType, ColumnId, ColumnKind, DataMapKind, DbColumn, DbTable,
    NavigationMap, PropertyDef, TableId,
};
use crate::error::Error;
use crate::storage::quote_ident;

use super::{
    id_list, physical_system_column, IntegrityChecker, NavClassIdViolation, NavIdViolation,
    RowSink,
};

/// A navigation property declared by a class, with the columns it is stored in.
struct NavigationColumns<'c> {
    /// Class whose map stores the property in `table`.
    class_name: String,
    class_id: i64,
    property: &'c PropertyDef,
    nav: &'c NavigationMap,
    /// Table holding the id column.
    table: &'c DbTable,
    instance: &'c DbColumn,
    /// Class id column of the table; absent if it has no physical storage.
    class_id_column: Option<&'c DbColumn>,
    id: &'c DbColumn,
    rel_class_id: &'c DbColumn,
    /// Whether the root table of that class is one of the targets.
    targets_own_table: bool,
}

impl NavigationColumns<'_> {
    /// Restrict rows to instances of the mapped class and its subclasses.
    fn class_filter(&self) -> String {
        match self.class_id_column {
            Some(column) => format!(
                " AND s.{} IN (SELECT ClassId FROM ec_cache_ClassHierarchy WHERE BaseClassId={})",
                quote_ident(&column.name),
                self.class_id
            ),
            None => String::new(),
        }
    }
}

/// Navigation properties stored in physical columns.
///
/// Every mapped class map contributes its navigation maps, inherited ones
/// included, so a property declared on a class without physical storage is
/// checked through the subclasses that store it. A column shared by several
/// class maps is checked once, on behalf of the most general of them.
fn navigation_columns(catalog: &Catalog) -> Vec<NavigationColumns<'_>> {
    let mut found: Vec<NavigationColumns<'_>> = Vec::new();
    let mut by_column: BTreeMap<(TableId, ColumnId), usize> = BTreeMap::new();

    for class_map in catalog.class_maps() {
        if !class_map.is_mapped() || class_map.map_type == ClassMapType::RelationshipEndTable {
            continue;
        }
        let own_root = catalog.primary_table(class_map).map(|t| t.id);

        for map in class_map.data_maps() {
            let DataMapKind::Navigation(nav) = &map.kind else {
                continue;
            };
            let Some(property) = catalog.property(map.property) else {
                continue;
            };
            let (Some(id), Some(rel_class_id)) = (
                nav.id.and_then(|c| catalog.column(c)),
                nav.rel_class_id.and_then(|c| catalog.column(c)),
            ) else {
                continue;
            };
            let Some(table) = catalog.table(id.table) else {
                continue;
            };
            if table.is_virtual() || id.is_virtual {
                continue;
            }
            let Some(instance) = physical_system_column(catalog, table, ColumnKind::InstanceId)
            else {
                continue;
            };

            let targets = catalog.constraint_tables(nav.relationship, nav.direction.referenced_end());
            let columns = NavigationColumns {
                class_name: catalog.class_name(class_map.class),
                class_id: class_map.class.0,
                property,
                nav,
                table,
                instance,
                class_id_column: physical_system_column(catalog, table, ColumnKind::ClassId),
                id,
                rel_class_id,
                targets_own_table: own_root.is_some_and(|t| targets.contains(&t)),
            };

            match by_column.entry((table.id, id.id)) {
                Entry::Vacant(slot) => {
                    slot.insert(found.len());
                    found.push(columns);
                }
                Entry::Occupied(slot) => {
                    let existing = &mut found[*slot.get()];
                    if catalog.is_subclass_of(ClassId(existing.class_id), class_map.class) {
                        *existing = columns;
                    }
                }
            }
        }
    }
    found
}

impl IntegrityChecker<'_> {
    /// Report navigation ids with no row in any table of the referenced
    /// constraint classes.
    ///
    /// The configured root row is exempt when the property points back into
    /// the table of its own class.
    #[instrument(skip(self, on_row))]
    pub fn check_nav_ids<F>(&self, on_row: F) -> Result<usize, Error>
    where
        F: FnMut(NavIdViolation) -> bool,
    {
        let catalog = self.catalog()?;
        let mut sink = RowSink::new(on_row);

        for nav in navigation_columns(&catalog) {
            let end = nav.nav.direction.referenced_end();
            let targets = catalog.constraint_tables(nav.nav.relationship, end);
            if targets.is_empty() {
                return Err(Error::InvalidCatalog(format!(
                    "navigation property '{}.{}' points at relationship '{}' whose {} end has no table",
                    nav.class_name,
                    nav.property.name,
                    catalog.class_name(nav.nav.relationship),
                    end
                )));
            }

            let mut not_exists = String::new();
            for table in targets.iter().filter_map(|id| catalog.table(*id)) {
                let Some(target_instance) =
                    physical_system_column(&catalog, table, ColumnKind::InstanceId)
                else {
                    continue;
                };
                not_exists.push_str(&format!(
                    " AND NOT EXISTS (SELECT 1 FROM {} t WHERE t.{}=s.{})",
                    quote_ident(&table.name),
                    quote_ident(&target_instance.name),
                    quote_ident(&nav.id.name)
                ));
            }
            let root_exception = match self.config.root_row_id {
                Some(root) if nav.targets_own_table => {
                    format!(" AND s.{}<>{}", quote_ident(&nav.instance.name), root)
                }
                _ => String::new(),
            };
            let sql = format!(
                "SELECT s.{inst}, s.{id} FROM {table} s WHERE s.{id} IS NOT NULL{classes}{not_exists}{root} ORDER BY s.{inst}",
                inst = quote_ident(&nav.instance.name),
                id = quote_ident(&nav.id.name),
                table = quote_ident(&nav.table.name),
                classes = nav.class_filter(),
                not_exists = not_exists,
                root = root_exception,
            );

            let target_class_name = catalog
                .relationship(nav.nav.relationship)
                .map(|rel| {
                    rel.end(end)
                        .classes
                        .iter()
                        .map(|c| catalog.class_name(*c))
                        .collect::<Vec<_>>()
                        .join(", ")
                })
                .unwrap_or_default();

            debug!(property = %nav.property.name, class = %nav.class_name, "checking navigation ids");
            let completed = self.store.for_each_row(&sql, [], |row| {
                Ok(sink.emit(NavIdViolation {
                    instance_id: row.get(0)?,
                    class_name: nav.class_name.clone(),
                    property_name: nav.property.name.clone(),
                    nav_id: row.get(1)?,
                    target_class_name: target_class_name.clone(),
                }))
            })?;
            if !completed {
                break;
            }
        }
        Ok(sink.delivered())
    }

    /// Report navigation relationship class ids that are not the declared
    /// relationship class or one of its subclasses.
    #[instrument(skip(self, on_row))]
    pub fn check_nav_class_ids<F>(&self, on_row: F) -> Result<usize, Error>
    where
        F: FnMut(NavClassIdViolation) -> bool,
    {
        let catalog = self.catalog()?;
        let mut sink = RowSink::new(on_row);

        for nav in navigation_columns(&catalog) {
            if nav.rel_class_id.is_virtual {
                continue;
            }
            let rel = quote_ident(&nav.rel_class_id.name);
            let table = quote_ident(&nav.table.name);

            let invalid = self.store.query_ids(
                &format!(
                    "SELECT DISTINCT s.{rel} FROM {table} s WHERE s.{rel} IS NOT NULL{classes} AND s.{rel} NOT IN (SELECT ClassId FROM ec_cache_ClassHierarchy WHERE BaseClassId={base})",
                    rel = rel,
                    table = table,
                    classes = nav.class_filter(),
                    base = nav.nav.relationship.0,
                ),
                [],
            )?;
            if invalid.is_empty() {
                continue;
            }

            let sql = format!(
                "SELECT s.{inst}, s.{rel} FROM {table} s WHERE s.{rel} IN ({ids}){classes} ORDER BY s.{inst}",
                inst = quote_ident(&nav.instance.name),
                rel = rel,
                table = table,
                ids = id_list(&invalid),
                classes = nav.class_filter(),
            );
            let relationship_class_name = catalog.class_name(nav.nav.relationship);
            let completed = self.store.for_each_row(&sql, [], |row| {
                Ok(sink.emit(NavClassIdViolation {
                    instance_id: row.get(0)?,
                    class_name: nav.class_name.clone(),
                    property_name: nav.property.name.clone(),
                    rel_class_id: row.get(1)?,
                    relationship_class_name: relationship_class_name.clone(),
                }))
            })?;
            if !completed {
                break;
            }
        }
        Ok(sink.delivered())
    }
}

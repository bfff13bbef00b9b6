//! Loading the catalog from the persisted `ec_*` tables.

use std::collections::BTreeMap;

use tracing::{debug, instrument};

use super::catalog::Catalog;
use super::class::{ClassDef, NavigationDef, PropertyDef, RelationshipDef, SchemaDef};
use super::class_map::ClassMap;
use super::property_map::{
    DataMapKind, DataPropertyMap, NavigationMap, PropertyMap, SystemPropertyKind,
    SystemPropertyMap,
};
use super::table::{DbColumn, DbConstraint, DbIndex, DbTable, DbTrigger};
use super::types::{
    ClassId, ClassModifier, ClassType, Collation, ColumnId, ColumnKind, ColumnType,
    CustomAttributeContainer, IndexId, MapStrategy, NavigationDirection, PrimitiveType, PropertyId,
    PropertyKind, RelationshipEnd, SchemaId, TableId, TableType,
};
use crate::error::Error;
use crate::storage::Store;

/// Structs nested deeper than this are treated as unmapped.
const MAX_STRUCT_DEPTH: usize = 32;

/// Name of the custom attribute class that marks a mixin.
const MIXIN_ATTRIBUTE: &str = "IsMixin";

/// One `ec_PropertyMap` row joined with its property path.
struct PropertyMapRow {
    class: ClassId,
    root: Option<PropertyId>,
    access_string: String,
    column: ColumnId,
}

/// Property paths of one root property: lowercased access string to column.
type PathColumns = BTreeMap<String, ColumnId>;

impl Catalog {
    /// Load the catalog from a store.
    ///
    /// Unknown enum codes and dangling table, column or index references
    /// fail the load. Class-level references (base classes, struct and
    /// relationship targets) are resolved lazily by the consumers.
    #[instrument(skip(store))]
    pub fn load(store: &Store) -> Result<Catalog, Error> {
        let mut catalog = Catalog::default();
        catalog.load_schemas(store)?;
        catalog.load_classes(store)?;
        catalog.load_properties(store)?;
        catalog.load_relationships(store)?;
        catalog.load_tables(store)?;
        catalog.load_columns(store)?;
        catalog.load_indexes(store)?;
        catalog.load_physical_constraints(store)?;
        catalog.load_class_maps(store)?;

        debug!(
            schemas = catalog.schemas.len(),
            classes = catalog.classes.len(),
            class_maps = catalog.class_maps.len(),
            tables = catalog.tables.len(),
            columns = catalog.columns.len(),
            indexes = catalog.indexes.len(),
            "catalog loaded"
        );
        Ok(catalog)
    }

    fn load_schemas(&mut self, store: &Store) -> Result<(), Error> {
        store.for_each_row("SELECT Id, Name, Alias FROM ec_Schema ORDER BY Id", [], |row| {
            let id = SchemaId(row.get(0)?);
            self.schemas.insert(
                id,
                SchemaDef {
                    id,
                    name: row.get(1)?,
                    alias: row.get(2)?,
                },
            );
            Ok(true)
        })?;
        Ok(())
    }

    fn load_classes(&mut self, store: &Store) -> Result<(), Error> {
        store.for_each_row(
            "SELECT Id, SchemaId, Name, Type, Modifier FROM ec_Class ORDER BY Id",
            [],
            |row| {
                let id = ClassId(row.get(0)?);
                let schema = SchemaId(row.get(1)?);
                let name: String = row.get(2)?;
                let context = format!("ec_Class {}", id);
                let schema_def = self.schemas.get(&schema).ok_or_else(|| {
                    Error::InvalidCatalog(format!(
                        "class '{}' references unknown schema id {}",
                        name, schema
                    ))
                })?;

                let class = ClassDef {
                    id,
                    schema,
                    full_name: format!("{}:{}", schema_def.name, name),
                    name,
                    class_type: ClassType::from_code(row.get(3)?, context.as_str())?,
                    modifier: ClassModifier::from_code(row.get(4)?, context.as_str())?,
                    base_classes: Vec::new(),
                    is_mixin: false,
                };
                self.classes.insert(id, class);
                Ok(true)
            },
        )?;

        store.for_each_row(
            "SELECT ClassId, BaseClassId FROM ec_ClassHasBaseClasses ORDER BY ClassId, Ordinal",
            [],
            |row| {
                let class = ClassId(row.get(0)?);
                let base = ClassId(row.get(1)?);
                let def = self.classes.get_mut(&class).ok_or_else(|| {
                    Error::InvalidCatalog(format!("base class entry for unknown class id {}", class))
                })?;
                def.base_classes.push(base);
                Ok(true)
            },
        )?;

        let mixins = store.query_ids(
            "SELECT ca.ContainerId FROM ec_CustomAttribute ca
             JOIN ec_Class c ON c.Id=ca.ClassId
             WHERE ca.ContainerType=?1 AND c.Name=?2",
            rusqlite::params![CustomAttributeContainer::EntityClass.code(), MIXIN_ATTRIBUTE],
        )?;
        for id in mixins {
            if let Some(class) = self.classes.get_mut(&ClassId(id)) {
                class.is_mixin = true;
            }
        }
        Ok(())
    }

    fn load_properties(&mut self, store: &Store) -> Result<(), Error> {
        store.for_each_row(
            "SELECT Id, ClassId, Name, Kind, PrimitiveType, StructClassId,
                    NavigationRelationshipClassId, NavigationDirection
             FROM ec_Property ORDER BY Id",
            [],
            |row| {
                let id = PropertyId(row.get(0)?);
                let class = ClassId(row.get(1)?);
                let name: String = row.get(2)?;
                let context = format!("ec_Property {}", id);
                if !self.classes.contains_key(&class) {
                    return Err(Error::InvalidCatalog(format!(
                        "property '{}' references unknown class id {}",
                        name, class
                    )));
                }

                let kind = PropertyKind::from_code(row.get(3)?, context.as_str())?;
                let primitive_type = match row.get::<_, Option<i64>>(4)? {
                    Some(code) => Some(PrimitiveType::from_code(code, context.as_str())?),
                    None => None,
                };
                let struct_class = row.get::<_, Option<i64>>(5)?.map(ClassId);
                let navigation = if kind == PropertyKind::Navigation {
                    let relationship: Option<i64> = row.get(6)?;
                    let direction: Option<i64> = row.get(7)?;
                    match (relationship, direction) {
                        (Some(relationship), Some(direction)) => Some(NavigationDef {
                            relationship: ClassId(relationship),
                            direction: NavigationDirection::from_code(direction, context.as_str())?,
                        }),
                        _ => {
                            return Err(Error::InvalidCatalog(format!(
                                "navigation property '{}' has no relationship or direction",
                                name
                            )))
                        }
                    }
                } else {
                    None
                };

                self.properties.insert(
                    id,
                    PropertyDef {
                        id,
                        class,
                        name,
                        kind,
                        primitive_type,
                        struct_class,
                        navigation,
                    },
                );
                Ok(true)
            },
        )?;
        Ok(())
    }

    fn load_relationships(&mut self, store: &Store) -> Result<(), Error> {
        for class in self.classes.values().filter(|c| c.is_relationship()) {
            self.relationships.insert(class.id, RelationshipDef::new(class.id));
        }

        let mut constraint_ends: BTreeMap<i64, (ClassId, RelationshipEnd)> = BTreeMap::new();
        store.for_each_row(
            "SELECT Id, RelationshipClassId, RelationshipEnd, MultiplicityLowerLimit,
                    MultiplicityUpperLimit, IsPolymorphic
             FROM ec_RelationshipConstraint ORDER BY Id",
            [],
            |row| {
                let id: i64 = row.get(0)?;
                let class = ClassId(row.get(1)?);
                let end = RelationshipEnd::from_code(
                    row.get(2)?,
                    format!("ec_RelationshipConstraint {}", id),
                )?;
                let rel = self.relationships.get_mut(&class).ok_or_else(|| {
                    Error::InvalidCatalog(format!(
                        "relationship constraint {} belongs to class id {} which is not a relationship",
                        id, class
                    ))
                })?;
                let constraint = rel.end_mut(end);
                constraint.lower = row.get(3)?;
                constraint.upper = row.get(4)?;
                constraint.polymorphic = row.get(5)?;
                constraint_ends.insert(id, (class, end));
                Ok(true)
            },
        )?;

        store.for_each_row(
            "SELECT ConstraintId, ClassId FROM ec_RelationshipConstraintClass
             ORDER BY ConstraintId, ClassId",
            [],
            |row| {
                let constraint: i64 = row.get(0)?;
                let class = ClassId(row.get(1)?);
                let (rel, end) = constraint_ends.get(&constraint).copied().ok_or_else(|| {
                    Error::InvalidCatalog(format!(
                        "constraint class entry for unknown relationship constraint {}",
                        constraint
                    ))
                })?;
                if let Some(def) = self.relationships.get_mut(&rel) {
                    def.end_mut(end).classes.push(class);
                }
                Ok(true)
            },
        )?;
        Ok(())
    }

    fn load_tables(&mut self, store: &Store) -> Result<(), Error> {
        store.for_each_row(
            "SELECT Id, ParentTableId, Name, Type, ExclusiveRootClassId FROM ec_Table ORDER BY Id",
            [],
            |row| {
                let id = TableId(row.get(0)?);
                let name: String = row.get(2)?;
                let table_type = TableType::from_code(row.get(3)?, format!("ec_Table {}", id))?;
                let mut table = DbTable::new(id, name, table_type);
                table.parent = row.get::<_, Option<i64>>(1)?.map(TableId);
                table.exclusive_root_class = row.get::<_, Option<i64>>(4)?.map(ClassId);
                self.tables.insert(id, table);
                Ok(true)
            },
        )?;

        let links: Vec<(TableId, TableId)> = self
            .tables
            .values()
            .filter_map(|t| t.parent.map(|parent| (parent, t.id)))
            .collect();
        for (parent, child) in links {
            let parent_table = self.tables.get_mut(&parent).ok_or_else(|| {
                Error::InvalidCatalog(format!(
                    "table id {} references unknown parent table id {}",
                    child, parent
                ))
            })?;
            parent_table.children.push(child);
        }
        Ok(())
    }

    fn load_columns(&mut self, store: &Store) -> Result<(), Error> {
        store.for_each_row(
            "SELECT Id, TableId, Name, Type, IsVirtual, Ordinal, NotNullConstraint,
                    UniqueConstraint, CollationConstraint, ColumnKind
             FROM ec_Column ORDER BY TableId, Ordinal, Id",
            [],
            |row| {
                let id = ColumnId(row.get(0)?);
                let table_id = TableId(row.get(1)?);
                let name: String = row.get(2)?;
                let context = format!("ec_Column {}", id);

                let column = DbColumn {
                    id,
                    table: table_id,
                    column_type: ColumnType::from_code(row.get(3)?, context.as_str())?,
                    is_virtual: row.get(4)?,
                    ordinal: row.get(5)?,
                    not_null: row.get(6)?,
                    unique: row.get(7)?,
                    collation: Collation::from_code(row.get(8)?, context.as_str())?,
                    kind: ColumnKind::from_code(row.get(9)?, context.as_str())?,
                    name,
                };

                let table = self.tables.get_mut(&table_id).ok_or_else(|| {
                    Error::InvalidCatalog(format!(
                        "column '{}' references unknown table id {}",
                        column.name, table_id
                    ))
                })?;
                table.columns.push(id);
                self.columns.insert(id, column);
                Ok(true)
            },
        )?;
        Ok(())
    }

    fn load_indexes(&mut self, store: &Store) -> Result<(), Error> {
        store.for_each_row(
            "SELECT Id, Name, TableId, IsUnique, IsAutoGenerated, ClassId FROM ec_Index ORDER BY Id",
            [],
            |row| {
                let id = IndexId(row.get(0)?);
                let name: String = row.get(1)?;
                let table_id = TableId(row.get(2)?);
                let table = self.tables.get_mut(&table_id).ok_or_else(|| {
                    Error::InvalidCatalog(format!(
                        "index '{}' references unknown table id {}",
                        name, table_id
                    ))
                })?;
                table.indexes.push(id);
                self.indexes.insert(
                    id,
                    DbIndex {
                        id,
                        name,
                        table: table_id,
                        columns: Vec::new(),
                        is_unique: row.get(3)?,
                        is_auto_generated: row.get(4)?,
                        class: row.get::<_, Option<i64>>(5)?.map(ClassId),
                    },
                );
                Ok(true)
            },
        )?;

        store.for_each_row(
            "SELECT IndexId, ColumnId FROM ec_IndexColumn ORDER BY IndexId, Ordinal",
            [],
            |row| {
                let index_id = IndexId(row.get(0)?);
                let column = ColumnId(row.get(1)?);
                if !self.columns.contains_key(&column) {
                    return Err(Error::InvalidCatalog(format!(
                        "index id {} references unknown column id {}",
                        index_id, column
                    )));
                }
                let index = self.indexes.get_mut(&index_id).ok_or_else(|| {
                    Error::InvalidCatalog(format!("index column entry for unknown index id {}", index_id))
                })?;
                index.columns.push(column);
                Ok(true)
            },
        )?;
        Ok(())
    }

    fn load_physical_constraints(&mut self, store: &Store) -> Result<(), Error> {
        for table in self.tables.values_mut().filter(|t| !t.is_virtual()) {
            if !store.table_exists(&table.name)? {
                continue;
            }
            let primary_key = store.primary_key_columns(&table.name)?;
            if !primary_key.is_empty() {
                table.constraints.push(DbConstraint::PrimaryKey {
                    columns: primary_key,
                });
            }
            for key in store.foreign_keys(&table.name)? {
                table.constraints.push(DbConstraint::ForeignKey {
                    columns: key.columns,
                    referenced_table: key.referenced_table,
                    referenced_columns: key.referenced_columns,
                });
            }
            table.triggers = store
                .triggers(&table.name)?
                .into_iter()
                .map(|(name, sql)| DbTrigger { name, sql })
                .collect();
        }
        Ok(())
    }

    fn load_class_maps(&mut self, store: &Store) -> Result<(), Error> {
        let mut class_maps: BTreeMap<ClassId, ClassMap> = BTreeMap::new();
        store.for_each_row(
            "SELECT cm.ClassId, cm.MapStrategy FROM ec_ClassMap cm
             JOIN ec_Class c ON c.Id=cm.ClassId ORDER BY cm.ClassId",
            [],
            |row| {
                let class = ClassId(row.get(0)?);
                let strategy =
                    MapStrategy::from_code(row.get(1)?, format!("ec_ClassMap {}", class))?;
                let is_relationship = self.classes.get(&class).is_some_and(|c| c.is_relationship());
                class_maps.insert(class, ClassMap::new(class, strategy, is_relationship));
                Ok(true)
            },
        )?;

        store.for_each_row(
            "SELECT ClassId, TableId FROM ec_cache_ClassHasTables ORDER BY ClassId, TableId",
            [],
            |row| {
                let class = ClassId(row.get(0)?);
                let table = TableId(row.get(1)?);
                if !self.tables.contains_key(&table) {
                    return Err(Error::InvalidCatalog(format!(
                        "class id {} uses unknown table id {}",
                        class, table
                    )));
                }
                if let Some(map) = class_maps.get_mut(&class) {
                    map.tables.push(table);
                }
                Ok(true)
            },
        )?;

        let mut rows = Vec::new();
        store.for_each_row(
            "SELECT pm.ClassId, pp.RootPropertyId, pp.AccessString, pm.ColumnId
             FROM ec_PropertyMap pm JOIN ec_PropertyPath pp ON pp.Id=pm.PropertyPathId
             ORDER BY pm.ClassId, pp.Id, pm.ColumnId",
            [],
            |row| {
                rows.push(PropertyMapRow {
                    class: ClassId(row.get(0)?),
                    root: row.get::<_, Option<i64>>(1)?.map(PropertyId),
                    access_string: row.get(2)?,
                    column: ColumnId(row.get(3)?),
                });
                Ok(true)
            },
        )?;

        let mut system: BTreeMap<ClassId, BTreeMap<SystemPropertyKind, Vec<ColumnId>>> =
            BTreeMap::new();
        let mut data: BTreeMap<ClassId, BTreeMap<PropertyId, PathColumns>> = BTreeMap::new();
        for row in rows {
            if !self.columns.contains_key(&row.column) {
                return Err(Error::InvalidCatalog(format!(
                    "property map '{}' of class id {} references unknown column id {}",
                    row.access_string, row.class, row.column
                )));
            }
            match row.root {
                None => {
                    let kind = SystemPropertyKind::from_access_string(&row.access_string)
                        .ok_or_else(|| {
                            Error::InvalidCatalog(format!(
                                "unknown system property '{}' mapped for class id {}",
                                row.access_string, row.class
                            ))
                        })?;
                    system
                        .entry(row.class)
                        .or_default()
                        .entry(kind)
                        .or_default()
                        .push(row.column);
                }
                Some(root) => {
                    data.entry(row.class)
                        .or_default()
                        .entry(root)
                        .or_default()
                        .entry(row.access_string.to_ascii_lowercase())
                        .or_insert(row.column);
                }
            }
        }

        for (class, map) in class_maps.iter_mut() {
            if let Some(system_paths) = system.remove(class) {
                for (kind, columns) in system_paths {
                    map.property_maps
                        .push(PropertyMap::System(SystemPropertyMap { kind, columns }));
                }
            }
            if let Some(data_paths) = data.remove(class) {
                for (root, paths) in data_paths {
                    let property = self.properties.get(&root).ok_or_else(|| {
                        Error::InvalidCatalog(format!(
                            "class id {} maps unknown property id {}",
                            class, root
                        ))
                    })?;
                    if let Some(data_map) = self.build_data_map(property, &property.name, &paths, 0) {
                        map.property_maps.push(PropertyMap::Data(data_map));
                    }
                }
            }
        }

        self.class_maps = class_maps;
        Ok(())
    }

    /// Assemble the map of a property from the paths mapped under its root.
    ///
    /// Returns `None` if nothing of the property is mapped.
    fn build_data_map(
        &self,
        property: &PropertyDef,
        access_string: &str,
        paths: &PathColumns,
        depth: usize,
    ) -> Option<DataPropertyMap> {
        let lookup = |suffix: &str| {
            paths
                .get(&format!("{}{}", access_string, suffix).to_ascii_lowercase())
                .copied()
        };

        let kind = match property.kind {
            PropertyKind::Primitive if property.primitive_type == Some(PrimitiveType::Point2d) => {
                let (x, y) = (lookup(".X"), lookup(".Y"));
                if x.is_none() && y.is_none() {
                    return None;
                }
                DataMapKind::Point2d { x, y }
            }
            PropertyKind::Primitive if property.primitive_type == Some(PrimitiveType::Point3d) => {
                let (x, y, z) = (lookup(".X"), lookup(".Y"), lookup(".Z"));
                if x.is_none() && y.is_none() && z.is_none() {
                    return None;
                }
                DataMapKind::Point3d { x, y, z }
            }
            PropertyKind::Primitive | PropertyKind::PrimitiveArray | PropertyKind::StructArray => {
                DataMapKind::Primitive { column: lookup("")? }
            }
            PropertyKind::Struct => {
                if depth >= MAX_STRUCT_DEPTH {
                    return None;
                }
                let struct_class = property.struct_class?;
                let members: Vec<DataPropertyMap> = self
                    .all_properties(struct_class)
                    .into_iter()
                    .filter_map(|member| {
                        let member_access = format!("{}.{}", access_string, member.name);
                        self.build_data_map(member, &member_access, paths, depth + 1)
                    })
                    .collect();
                if members.is_empty() {
                    return None;
                }
                DataMapKind::Struct {
                    struct_class,
                    members,
                }
            }
            PropertyKind::Navigation => {
                let nav = property.navigation?;
                let (id, rel_class_id) = (lookup(".Id"), lookup(".RelECClassId"));
                if id.is_none() && rel_class_id.is_none() {
                    return None;
                }
                DataMapKind::Navigation(self.navigation_map(nav, id, rel_class_id))
            }
        };

        Some(DataPropertyMap {
            property: property.id,
            access_string: access_string.to_string(),
            kind,
        })
    }

    fn navigation_map(
        &self,
        nav: NavigationDef,
        id: Option<ColumnId>,
        rel_class_id: Option<ColumnId>,
    ) -> NavigationMap {
        let physical_fk = id
            .and_then(|id| self.columns.get(&id))
            .and_then(|column| {
                self.tables
                    .get(&column.table)
                    .map(|table| table.has_single_column_foreign_key(&column.name))
            })
            .unwrap_or(false);

        let (implies_not_null, implies_unique) = match self.relationships.get(&nav.relationship) {
            Some(rel) => (
                rel.end(nav.direction.referenced_end()).is_exactly_one(),
                rel.end(nav.direction.owning_end()).is_at_most_one(),
            ),
            None => (false, false),
        };

        NavigationMap {
            relationship: nav.relationship,
            direction: nav.direction,
            id,
            rel_class_id,
            physical_fk,
            implies_not_null,
            implies_unique,
        }
    }
}

//! The in-memory catalog and its accessors.

use std::collections::{BTreeMap, BTreeSet};

use super::class::{ClassDef, PropertyDef, RelationshipDef, SchemaDef};
use super::class_map::ClassMap;
use super::table::{DbColumn, DbIndex, DbTable};
use super::types::{
    ClassId, ColumnId, IndexId, MapStrategy, PropertyId, PropertyKind, RelationshipEnd, SchemaId,
    TableId, TableType,
};
use crate::error::Error;

/// Read-only model of a mapping, loaded once per run.
///
/// All collections are ordered by id so that every traversal, and therefore
/// every diagnostic stream, is deterministic.
#[derive(Debug, Default, Clone)]
pub struct Catalog {
    pub(crate) schemas: BTreeMap<SchemaId, SchemaDef>,
    pub(crate) classes: BTreeMap<ClassId, ClassDef>,
    pub(crate) properties: BTreeMap<PropertyId, PropertyDef>,
    pub(crate) relationships: BTreeMap<ClassId, RelationshipDef>,
    pub(crate) class_maps: BTreeMap<ClassId, ClassMap>,
    pub(crate) tables: BTreeMap<TableId, DbTable>,
    pub(crate) columns: BTreeMap<ColumnId, DbColumn>,
    pub(crate) indexes: BTreeMap<IndexId, DbIndex>,
}

impl Catalog {
    /// All schemas.
    pub fn schemas(&self) -> impl Iterator<Item = &SchemaDef> {
        self.schemas.values()
    }

    /// All classes.
    pub fn classes(&self) -> impl Iterator<Item = &ClassDef> {
        self.classes.values()
    }

    /// All class maps.
    pub fn class_maps(&self) -> impl Iterator<Item = &ClassMap> {
        self.class_maps.values()
    }

    /// All tables.
    pub fn tables(&self) -> impl Iterator<Item = &DbTable> {
        self.tables.values()
    }

    /// All indexes.
    pub fn indexes(&self) -> impl Iterator<Item = &DbIndex> {
        self.indexes.values()
    }

    /// All relationships.
    pub fn relationships(&self) -> impl Iterator<Item = &RelationshipDef> {
        self.relationships.values()
    }

    /// Look up a schema.
    pub fn schema(&self, id: SchemaId) -> Option<&SchemaDef> {
        self.schemas.get(&id)
    }

    /// Look up a class.
    pub fn class(&self, id: ClassId) -> Option<&ClassDef> {
        self.classes.get(&id)
    }

    /// Look up a property.
    pub fn property(&self, id: PropertyId) -> Option<&PropertyDef> {
        self.properties.get(&id)
    }

    /// Look up the ends of a relationship class.
    pub fn relationship(&self, id: ClassId) -> Option<&RelationshipDef> {
        self.relationships.get(&id)
    }

    /// Look up the map of a class.
    pub fn class_map(&self, id: ClassId) -> Option<&ClassMap> {
        self.class_maps.get(&id)
    }

    /// Look up a table.
    pub fn table(&self, id: TableId) -> Option<&DbTable> {
        self.tables.get(&id)
    }

    /// Look up a table by name, ignoring ASCII case.
    pub fn table_by_name(&self, name: &str) -> Option<&DbTable> {
        self.tables
            .values()
            .find(|t| t.name.eq_ignore_ascii_case(name))
    }

    /// Look up a column.
    pub fn column(&self, id: ColumnId) -> Option<&DbColumn> {
        self.columns.get(&id)
    }

    /// Look up an index.
    pub fn index(&self, id: IndexId) -> Option<&DbIndex> {
        self.indexes.get(&id)
    }

    /// Columns of a table, in physical order.
    pub fn table_columns<'a>(&'a self, table: &'a DbTable) -> impl Iterator<Item = &'a DbColumn> + 'a {
        table.columns.iter().filter_map(|id| self.columns.get(id))
    }

    /// Full name of a class, or a placeholder naming the id.
    pub fn class_name(&self, id: ClassId) -> String {
        match self.classes.get(&id) {
            Some(class) => class.full_name.clone(),
            None => format!("<unknown class {}>", id),
        }
    }

    /// `table.column` label of a column.
    pub fn column_label(&self, id: ColumnId) -> String {
        match self.columns.get(&id) {
            Some(column) => match self.tables.get(&column.table) {
                Some(table) => format!("{}.{}", table.name, column.name),
                None => column.name.clone(),
            },
            None => format!("<unknown column {}>", id),
        }
    }

    /// Properties declared directly on a class, by id.
    pub fn own_properties(&self, class: ClassId) -> impl Iterator<Item = &PropertyDef> {
        self.properties.values().filter(move |p| p.class == class)
    }

    /// Properties of a class including inherited ones.
    ///
    /// Inherited properties come first; a property redeclared by a subclass
    /// replaces the inherited one of the same name.
    pub fn all_properties(&self, class: ClassId) -> Vec<&PropertyDef> {
        let mut visited = BTreeSet::new();
        let mut properties = Vec::new();
        self.collect_properties(class, &mut visited, &mut properties);
        properties
    }

    fn collect_properties<'a>(
        &'a self,
        class: ClassId,
        visited: &mut BTreeSet<ClassId>,
        out: &mut Vec<&'a PropertyDef>,
    ) {
        if !visited.insert(class) {
            return;
        }
        if let Some(def) = self.classes.get(&class) {
            for base in &def.base_classes {
                self.collect_properties(*base, visited, out);
            }
        }
        for property in self.own_properties(class) {
            match out
                .iter()
                .position(|p| p.name.eq_ignore_ascii_case(&property.name))
            {
                Some(pos) => out[pos] = property,
                None => out.push(property),
            }
        }
    }

    /// Whether `class` is `base` or derives from it.
    pub fn is_subclass_of(&self, class: ClassId, base: ClassId) -> bool {
        let mut visited = BTreeSet::new();
        let mut pending = vec![class];
        while let Some(current) = pending.pop() {
            if current == base {
                return true;
            }
            if !visited.insert(current) {
                continue;
            }
            if let Some(def) = self.classes.get(&current) {
                pending.extend(def.base_classes.iter().copied());
            }
        }
        false
    }

    /// `class` and every class deriving from it.
    pub fn subclasses(&self, class: ClassId) -> Vec<ClassId> {
        self.classes
            .keys()
            .copied()
            .filter(|id| self.is_subclass_of(*id, class))
            .collect()
    }

    /// Navigation properties using the given relationship.
    pub fn navigation_properties_of(
        &self,
        relationship: ClassId,
    ) -> impl Iterator<Item = &PropertyDef> {
        self.properties.values().filter(move |p| {
            p.kind == PropertyKind::Navigation
                && p.navigation.map(|n| n.relationship) == Some(relationship)
        })
    }

    /// The root table of a class map: the first table that is neither joined
    /// nor overflow.
    pub fn primary_table(&self, class_map: &ClassMap) -> Option<&DbTable> {
        class_map
            .tables
            .iter()
            .filter_map(|id| self.tables.get(id))
            .find(|t| !matches!(t.table_type, TableType::Joined | TableType::Overflow))
    }

    /// Non-virtual root tables holding instances of a relationship end.
    ///
    /// Polymorphic ends include every mapped subclass of the constraint
    /// classes.
    pub fn constraint_tables(&self, relationship: ClassId, end: RelationshipEnd) -> BTreeSet<TableId> {
        let mut tables = BTreeSet::new();
        let Some(rel) = self.relationships.get(&relationship) else {
            return tables;
        };
        let constraint = rel.end(end);
        for class in &constraint.classes {
            let candidates = if constraint.polymorphic {
                self.subclasses(*class)
            } else {
                vec![*class]
            };
            for candidate in candidates {
                let Some(map) = self.class_maps.get(&candidate) else {
                    continue;
                };
                if !map.is_mapped() {
                    continue;
                }
                if let Some(table) = self.primary_table(map) {
                    if !table.is_virtual() {
                        tables.insert(table.id);
                    }
                }
            }
        }
        tables
    }

    /// Whether the class map uses table-per-hierarchy and no base class does.
    pub fn is_hierarchy_root(&self, class_map: &ClassMap) -> bool {
        if class_map.strategy != MapStrategy::TablePerHierarchy {
            return false;
        }
        let Some(class) = self.classes.get(&class_map.class) else {
            return false;
        };
        !class.base_classes.iter().any(|base| {
            self.class_maps
                .get(base)
                .is_some_and(|m| m.strategy == MapStrategy::TablePerHierarchy)
        })
    }

    /// Resolve every reference of the classes of a schema.
    ///
    /// Fails with the first reference that does not resolve.
    pub fn resolve_schema(&self, name: &str) -> Result<(), Error> {
        let schema = self
            .schemas
            .values()
            .find(|s| s.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| Error::NotFound(format!("schema '{}'", name)))?;

        for class in self.classes.values().filter(|c| c.schema == schema.id) {
            for base in &class.base_classes {
                if !self.classes.contains_key(base) {
                    return Err(Error::InvalidCatalog(format!(
                        "class '{}' derives from unknown class id {}",
                        class.full_name, base
                    )));
                }
            }

            for property in self.own_properties(class.id) {
                self.resolve_property(class, property)?;
            }

            if class.is_relationship() {
                let rel = self.relationships.get(&class.id).ok_or_else(|| {
                    Error::InvalidCatalog(format!(
                        "relationship '{}' has no constraints",
                        class.full_name
                    ))
                })?;
                for constraint in [&rel.source, &rel.target] {
                    if constraint.classes.is_empty() {
                        return Err(Error::InvalidCatalog(format!(
                            "relationship '{}' has no {:?} constraint classes",
                            class.full_name, constraint.end
                        )));
                    }
                    for constraint_class in &constraint.classes {
                        if !self.classes.contains_key(constraint_class) {
                            return Err(Error::InvalidCatalog(format!(
                                "relationship '{}' constraint references unknown class id {}",
                                class.full_name, constraint_class
                            )));
                        }
                    }
                }
            }

            if let Some(map) = self.class_maps.get(&class.id) {
                if map.is_mapped() && map.tables.is_empty() {
                    return Err(Error::InvalidCatalog(format!(
                        "class '{}' is mapped but uses no table",
                        class.full_name
                    )));
                }
                for column in map.property_maps.iter().flat_map(|m| m.columns()) {
                    if !self.columns.contains_key(&column) {
                        return Err(Error::InvalidCatalog(format!(
                            "class '{}' maps a property to unknown column id {}",
                            class.full_name, column
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    fn resolve_property(&self, class: &ClassDef, property: &PropertyDef) -> Result<(), Error> {
        match property.kind {
            PropertyKind::Struct | PropertyKind::StructArray => {
                let resolved = property
                    .struct_class
                    .and_then(|id| self.classes.get(&id))
                    .is_some();
                if !resolved {
                    return Err(Error::InvalidCatalog(format!(
                        "property '{}.{}' references an unknown struct class",
                        class.full_name, property.name
                    )));
                }
            }
            PropertyKind::Navigation => {
                let resolved = property
                    .navigation
                    .and_then(|nav| self.classes.get(&nav.relationship))
                    .is_some_and(|rel| rel.is_relationship());
                if !resolved {
                    return Err(Error::InvalidCatalog(format!(
                        "navigation property '{}.{}' references an unknown relationship class",
                        class.full_name, property.name
                    )));
                }
            }
            PropertyKind::Primitive | PropertyKind::PrimitiveArray => {
                if property.primitive_type.is_none() {
                    return Err(Error::InvalidCatalog(format!(
                        "property '{}.{}' has no primitive type",
                        class.full_name, property.name
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::class::RelationshipConstraint;
    use crate::catalog::types::{ClassModifier, ClassType, PrimitiveType};

    fn class(id: i64, name: &str, bases: &[i64]) -> ClassDef {
        ClassDef {
            id: ClassId(id),
            schema: SchemaId(1),
            name: name.into(),
            full_name: format!("ts:{}", name),
            class_type: ClassType::Entity,
            modifier: ClassModifier::None,
            base_classes: bases.iter().map(|b| ClassId(*b)).collect(),
            is_mixin: false,
        }
    }

    fn primitive(id: i64, class: i64, name: &str) -> PropertyDef {
        PropertyDef {
            id: PropertyId(id),
            class: ClassId(class),
            name: name.into(),
            kind: PropertyKind::Primitive,
            primitive_type: Some(PrimitiveType::String),
            struct_class: None,
            navigation: None,
        }
    }

    fn catalog() -> Catalog {
        let mut catalog = Catalog::default();
        catalog.schemas.insert(
            SchemaId(1),
            SchemaDef {
                id: SchemaId(1),
                name: "TestSchema".into(),
                alias: "ts".into(),
            },
        );
        for def in [
            class(1, "Base", &[]),
            class(2, "Middle", &[1]),
            class(3, "Leaf", &[2]),
            class(4, "Other", &[]),
        ] {
            catalog.classes.insert(def.id, def);
        }
        for def in [
            primitive(10, 1, "Label"),
            primitive(11, 2, "Code"),
            primitive(12, 3, "label"),
            primitive(13, 4, "Unrelated"),
        ] {
            catalog.properties.insert(def.id, def);
        }
        catalog
    }

    #[test]
    fn test_inherited_properties_with_override() {
        let catalog = catalog();
        let names: Vec<_> = catalog
            .all_properties(ClassId(3))
            .iter()
            .map(|p| (p.id, p.name.as_str()))
            .collect();
        assert_eq!(names, vec![(PropertyId(12), "label"), (PropertyId(11), "Code")]);
        assert_eq!(catalog.all_properties(ClassId(4)).len(), 1);
    }

    #[test]
    fn test_subclass_queries() {
        let catalog = catalog();
        assert!(catalog.is_subclass_of(ClassId(3), ClassId(1)));
        assert!(catalog.is_subclass_of(ClassId(1), ClassId(1)));
        assert!(!catalog.is_subclass_of(ClassId(1), ClassId(3)));
        assert_eq!(
            catalog.subclasses(ClassId(2)),
            vec![ClassId(2), ClassId(3)]
        );
    }

    #[test]
    fn test_resolve_schema() {
        let mut catalog = catalog();
        assert!(catalog.resolve_schema("testschema").is_ok());
        assert!(matches!(
            catalog.resolve_schema("Missing"),
            Err(Error::NotFound(_))
        ));

        catalog
            .classes
            .get_mut(&ClassId(4))
            .unwrap()
            .base_classes
            .push(ClassId(99));
        let err = catalog.resolve_schema("TestSchema").unwrap_err();
        assert!(err.to_string().contains("unknown class id 99"));
    }

    #[test]
    fn test_relationship_without_constraint_classes_does_not_resolve() {
        let mut catalog = catalog();
        let mut rel = class(5, "Rel", &[]);
        rel.class_type = ClassType::Relationship;
        catalog.classes.insert(rel.id, rel);
        let mut def = RelationshipDef::new(ClassId(5));
        def.source = RelationshipConstraint {
            end: RelationshipEnd::Source,
            lower: 0,
            upper: Some(1),
            polymorphic: true,
            classes: vec![ClassId(1)],
        };
        catalog.relationships.insert(ClassId(5), def);

        let err = catalog.resolve_schema("TestSchema").unwrap_err();
        assert!(err.to_string().contains("no Target constraint classes"));
    }
}

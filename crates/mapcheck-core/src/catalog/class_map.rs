//! Class maps.

use serde::Serialize;

use super::property_map::{DataPropertyMap, PropertyMap, SystemPropertyKind, SystemPropertyMap};
use super::types::{ClassId, MapStrategy, PropertyId, TableId};

/// How a class map stores its instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ClassMapType {
    /// Nothing is stored.
    NotMapped,
    /// Entity or struct class with its own rows.
    Class,
    /// Relationship folded into an end's table as a foreign key.
    RelationshipEndTable,
    /// Relationship stored in a dedicated link table.
    RelationshipLinkTable,
}

impl ClassMapType {
    /// Derive the map type from the strategy and the class kind.
    pub fn derive(strategy: MapStrategy, is_relationship: bool) -> Self {
        match strategy {
            MapStrategy::NotMapped => ClassMapType::NotMapped,
            MapStrategy::ForeignKeyRelationshipInSourceTable
            | MapStrategy::ForeignKeyRelationshipInTargetTable => ClassMapType::RelationshipEndTable,
            MapStrategy::OwnTable | MapStrategy::TablePerHierarchy | MapStrategy::ExistingTable => {
                if is_relationship {
                    ClassMapType::RelationshipLinkTable
                } else {
                    ClassMapType::Class
                }
            }
        }
    }
}

impl std::fmt::Display for ClassMapType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClassMapType::NotMapped => write!(f, "NotMapped"),
            ClassMapType::Class => write!(f, "Class"),
            ClassMapType::RelationshipEndTable => write!(f, "RelationshipEndTable"),
            ClassMapType::RelationshipLinkTable => write!(f, "RelationshipLinkTable"),
        }
    }
}

/// Mapping of one class onto tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassMap {
    /// Mapped class.
    pub class: ClassId,
    /// Stored strategy.
    pub strategy: MapStrategy,
    /// Derived type.
    pub map_type: ClassMapType,
    /// Tables used by the class.
    pub tables: Vec<TableId>,
    /// Property maps: system maps first, then data maps by property id.
    pub property_maps: Vec<PropertyMap>,
}

impl ClassMap {
    /// Create an empty class map.
    pub fn new(class: ClassId, strategy: MapStrategy, is_relationship: bool) -> Self {
        Self {
            class,
            strategy,
            map_type: ClassMapType::derive(strategy, is_relationship),
            tables: Vec::new(),
            property_maps: Vec::new(),
        }
    }

    /// System property maps.
    pub fn system_maps(&self) -> impl Iterator<Item = &SystemPropertyMap> {
        self.property_maps.iter().filter_map(|m| match m {
            PropertyMap::System(map) => Some(map),
            PropertyMap::Data(_) => None,
        })
    }

    /// Data property maps.
    pub fn data_maps(&self) -> impl Iterator<Item = &DataPropertyMap> {
        self.property_maps.iter().filter_map(|m| match m {
            PropertyMap::Data(map) => Some(map),
            PropertyMap::System(_) => None,
        })
    }

    /// The map of a system property.
    pub fn system_map(&self, kind: SystemPropertyKind) -> Option<&SystemPropertyMap> {
        self.system_maps().find(|m| m.kind == kind)
    }

    /// The map of a business property.
    pub fn data_map(&self, property: PropertyId) -> Option<&DataPropertyMap> {
        self.data_maps().find(|m| m.property == property)
    }

    /// Whether instances are stored at all.
    pub fn is_mapped(&self) -> bool {
        self.strategy != MapStrategy::NotMapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::property_map::DataMapKind;
    use crate::catalog::types::ColumnId;

    #[test]
    fn test_map_type_derivation() {
        assert_eq!(
            ClassMapType::derive(MapStrategy::OwnTable, false),
            ClassMapType::Class
        );
        assert_eq!(
            ClassMapType::derive(MapStrategy::OwnTable, true),
            ClassMapType::RelationshipLinkTable
        );
        assert_eq!(
            ClassMapType::derive(MapStrategy::ForeignKeyRelationshipInTargetTable, true),
            ClassMapType::RelationshipEndTable
        );
        assert_eq!(
            ClassMapType::derive(MapStrategy::NotMapped, true),
            ClassMapType::NotMapped
        );
    }

    #[test]
    fn test_map_lookup() {
        let mut map = ClassMap::new(ClassId(10), MapStrategy::OwnTable, false);
        map.property_maps.push(PropertyMap::System(SystemPropertyMap {
            kind: SystemPropertyKind::InstanceId,
            columns: vec![ColumnId(1)],
        }));
        map.property_maps.push(PropertyMap::Data(DataPropertyMap {
            property: PropertyId(100),
            access_string: "Name".into(),
            kind: DataMapKind::Primitive {
                column: ColumnId(3),
            },
        }));

        assert_eq!(map.system_maps().count(), 1);
        assert_eq!(map.data_maps().count(), 1);
        assert!(map.system_map(SystemPropertyKind::InstanceId).is_some());
        assert!(map.system_map(SystemPropertyKind::ClassId).is_none());
        assert!(map.data_map(PropertyId(100)).is_some());
        assert!(map.is_mapped());
    }
}

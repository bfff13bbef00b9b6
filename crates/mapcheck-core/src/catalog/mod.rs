//! Catalog model of a schema mapping.
//!
//! The catalog is the in-memory view of classes, class maps and property
//! maps together with the tables, columns and indexes they are mapped onto.
//! It is loaded from the persisted `ec_*` tables and is read-only afterwards.

mod catalog;
mod class;
mod class_map;
mod loader;
mod property_map;
mod table;
mod types;

pub use catalog::Catalog;
pub use class::{
    ClassDef, NavigationDef, PropertyDef, RelationshipConstraint, RelationshipDef, SchemaDef,
};
pub use class_map::{ClassMap, ClassMapType};
pub use property_map::{
    DataMapKind, DataPropertyMap, NavigationMap, PropertyMap, SystemPropertyKind,
    SystemPropertyMap,
};
pub use table::{DbColumn, DbConstraint, DbIndex, DbTable, DbTrigger, NOT_MAPPED_TABLE};
pub use types::{
    ClassId, ClassModifier, ClassType, Collation, ColumnId, ColumnKind, ColumnType,
    CustomAttributeContainer, IndexId, MapStrategy, NavigationDirection, PrimitiveType, PropertyId,
    PropertyKind, RelationshipEnd, SchemaId, TableId, TableType,
};

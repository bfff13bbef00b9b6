//! Tables, columns, indexes and constraints of the mapped storage.

use serde::Serialize;

use super::types::{ClassId, Collation, ColumnId, ColumnKind, ColumnType, IndexId, TableId, TableType};

/// Name of the virtual table that classes without storage map onto.
///
/// It is the only table allowed to have no columns.
pub const NOT_MAPPED_TABLE: &str = "ec_NotMapped";

/// A column of a mapped table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DbColumn {
    /// Catalog id.
    pub id: ColumnId,
    /// Owning table.
    pub table: TableId,
    /// Column name.
    pub name: String,
    /// Logical type.
    pub column_type: ColumnType,
    /// Role of the column.
    pub kind: ColumnKind,
    /// Whether the column has no physical storage.
    pub is_virtual: bool,
    /// Position in the table.
    pub ordinal: i64,
    /// NOT NULL constraint.
    pub not_null: bool,
    /// UNIQUE constraint.
    pub unique: bool,
    /// Declared collation.
    pub collation: Collation,
}

impl DbColumn {
    /// Whether the column is a generic column shared between properties.
    pub fn is_shared(&self) -> bool {
        self.kind == ColumnKind::SharedData
    }
}

/// A table constraint read from the physical DDL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum DbConstraint {
    /// The primary key.
    PrimaryKey {
        /// Key columns in order.
        columns: Vec<String>,
    },
    /// A foreign key.
    ForeignKey {
        /// Local columns in order.
        columns: Vec<String>,
        /// Referenced table.
        referenced_table: String,
        /// Referenced columns in order.
        referenced_columns: Vec<String>,
    },
}

/// A trigger attached to a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DbTrigger {
    /// Trigger name.
    pub name: String,
    /// Stored DDL.
    pub sql: String,
}

/// A mapped table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DbTable {
    /// Catalog id.
    pub id: TableId,
    /// Table name.
    pub name: String,
    /// Storage role.
    pub table_type: TableType,
    /// Parent table for joined and overflow tables.
    pub parent: Option<TableId>,
    /// Tables whose parent is this table.
    pub children: Vec<TableId>,
    /// Columns in physical order.
    pub columns: Vec<ColumnId>,
    /// Indexes declared on this table.
    pub indexes: Vec<IndexId>,
    /// Physical constraints. At most one primary key.
    pub constraints: Vec<DbConstraint>,
    /// Physical triggers. Loaded for callers inspecting the catalog; no
    /// validation rule reads them.
    pub triggers: Vec<DbTrigger>,
    /// The class that exclusively owns this table, if any.
    pub exclusive_root_class: Option<ClassId>,
}

impl DbTable {
    /// Create a table with no columns.
    pub fn new(id: TableId, name: impl Into<String>, table_type: TableType) -> Self {
        Self {
            id,
            name: name.into(),
            table_type,
            parent: None,
            children: Vec::new(),
            columns: Vec::new(),
            indexes: Vec::new(),
            constraints: Vec::new(),
            triggers: Vec::new(),
            exclusive_root_class: None,
        }
    }

    /// Whether the table has no physical storage.
    pub fn is_virtual(&self) -> bool {
        self.table_type == TableType::Virtual
    }

    /// Primary key columns, if the table declares one.
    ///
    /// Part of the catalog accessor surface. The validator only consults the
    /// foreign keys.
    pub fn primary_key(&self) -> Option<&[String]> {
        self.constraints.iter().find_map(|c| match c {
            DbConstraint::PrimaryKey { columns } => Some(columns.as_slice()),
            DbConstraint::ForeignKey { .. } => None,
        })
    }

    /// Whether a foreign key has exactly the given column as its only local column.
    pub fn has_single_column_foreign_key(&self, column: &str) -> bool {
        self.constraints.iter().any(|c| match c {
            DbConstraint::ForeignKey { columns, .. } => {
                columns.len() == 1 && columns[0].eq_ignore_ascii_case(column)
            }
            DbConstraint::PrimaryKey { .. } => false,
        })
    }
}

/// An index of a mapped table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DbIndex {
    /// Catalog id.
    pub id: IndexId,
    /// Index name.
    pub name: String,
    /// Declared table.
    pub table: TableId,
    /// Indexed columns in order.
    pub columns: Vec<ColumnId>,
    /// UNIQUE index.
    pub is_unique: bool,
    /// Created by the mapping rather than authored by a user.
    pub is_auto_generated: bool,
    /// Class the index was declared on.
    pub class: Option<ClassId>,
}

//! Introspection of the physical schema (`sqlite_master` and table pragmas).

use serde::Serialize;

use super::Store;
use crate::error::Error;

/// Kind of a schema object in `sqlite_master`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum PhysicalObjectKind {
    /// A table.
    Table,
    /// A column of a table.
    Column,
    /// An index.
    Index,
    /// A trigger.
    Trigger,
}

impl PhysicalObjectKind {
    /// The `type` value used by `sqlite_master`, if the kind is stored there.
    pub fn master_type(&self) -> Option<&'static str> {
        match self {
            PhysicalObjectKind::Table => Some("table"),
            PhysicalObjectKind::Index => Some("index"),
            PhysicalObjectKind::Trigger => Some("trigger"),
            PhysicalObjectKind::Column => None,
        }
    }
}

impl std::fmt::Display for PhysicalObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PhysicalObjectKind::Table => write!(f, "table"),
            PhysicalObjectKind::Column => write!(f, "column"),
            PhysicalObjectKind::Index => write!(f, "index"),
            PhysicalObjectKind::Trigger => write!(f, "trigger"),
        }
    }
}

/// A foreign key as declared in the physical DDL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhysicalForeignKey {
    /// Local columns, in key order.
    pub columns: Vec<String>,
    /// Referenced table.
    pub referenced_table: String,
    /// Referenced columns. Empty when the key targets the primary key implicitly.
    pub referenced_columns: Vec<String>,
}

impl Store {
    /// Whether a table with the given name exists physically.
    pub fn table_exists(&self, name: &str) -> Result<bool, Error> {
        self.object_exists(PhysicalObjectKind::Table, name)
    }

    /// Whether an index with the given name exists physically.
    pub fn index_exists(&self, name: &str) -> Result<bool, Error> {
        self.object_exists(PhysicalObjectKind::Index, name)
    }

    /// Whether an object of the given kind exists in `sqlite_master`.
    pub fn object_exists(&self, kind: PhysicalObjectKind, name: &str) -> Result<bool, Error> {
        let Some(master_type) = kind.master_type() else {
            return Ok(false);
        };
        let count = self.query_count(
            "SELECT COUNT(*) FROM sqlite_master WHERE type=?1 AND name=?2 COLLATE NOCASE",
            [master_type, name],
        )?;
        Ok(count > 0)
    }

    /// The stored DDL of an object, or `None` if it does not exist.
    pub fn object_sql(&self, kind: PhysicalObjectKind, name: &str) -> Result<Option<String>, Error> {
        let Some(master_type) = kind.master_type() else {
            return Ok(None);
        };
        self.query_optional_text(
            "SELECT sql FROM sqlite_master WHERE type=?1 AND name=?2 COLLATE NOCASE",
            [master_type, name],
        )
    }

    /// Physical column names of a table in declaration order.
    ///
    /// Returns an empty list if the table does not exist.
    pub fn physical_columns(&self, table: &str) -> Result<Vec<String>, Error> {
        let mut columns = Vec::new();
        self.for_each_row(
            "SELECT name FROM pragma_table_info(?1) ORDER BY cid",
            [table],
            |row| {
                columns.push(row.get(0)?);
                Ok(true)
            },
        )?;
        Ok(columns)
    }

    /// Primary key column names of a table, in key order.
    pub fn primary_key_columns(&self, table: &str) -> Result<Vec<String>, Error> {
        let mut columns = Vec::new();
        self.for_each_row(
            "SELECT name FROM pragma_table_info(?1) WHERE pk>0 ORDER BY pk",
            [table],
            |row| {
                columns.push(row.get(0)?);
                Ok(true)
            },
        )?;
        Ok(columns)
    }

    /// Foreign keys declared on a table.
    pub fn foreign_keys(&self, table: &str) -> Result<Vec<PhysicalForeignKey>, Error> {
        let mut keys: Vec<(i64, PhysicalForeignKey)> = Vec::new();
        self.for_each_row(
            r#"SELECT id, "table", "from", "to" FROM pragma_foreign_key_list(?1) ORDER BY id, seq"#,
            [table],
            |row| {
                let id: i64 = row.get(0)?;
                let referenced_table: String = row.get(1)?;
                let from: String = row.get(2)?;
                let to: Option<String> = row.get(3)?;

                if keys.last().map(|(last, _)| *last) != Some(id) {
                    keys.push((
                        id,
                        PhysicalForeignKey {
                            columns: Vec::new(),
                            referenced_table,
                            referenced_columns: Vec::new(),
                        },
                    ));
                }
                if let Some((_, key)) = keys.last_mut() {
                    key.columns.push(from);
                    if let Some(to) = to {
                        key.referenced_columns.push(to);
                    }
                }
                Ok(true)
            },
        )?;
        Ok(keys.into_iter().map(|(_, key)| key).collect())
    }

    /// Triggers attached to a table as `(name, sql)` pairs.
    pub fn triggers(&self, table: &str) -> Result<Vec<(String, String)>, Error> {
        let mut triggers = Vec::new();
        self.for_each_row(
            "SELECT name, sql FROM sqlite_master WHERE type='trigger' AND tbl_name=?1 COLLATE NOCASE ORDER BY name",
            [table],
            |row| {
                let sql: Option<String> = row.get(1)?;
                triggers.push((row.get(0)?, sql.unwrap_or_default()));
                Ok(true)
            },
        )?;
        Ok(triggers)
    }
}
